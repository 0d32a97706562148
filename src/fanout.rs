//! Fanout references and the fanout dispatcher.
//!
//! A statically elaborated net has one fanout reference known when the
//! netlist is built. A dynamically elaborated net has a primary and a
//! secondary reference that elaboration may still be filling in; until it
//! does, they are `Unresolved` and dispatch skips them.

use crate::id::ConsumerId;
use crate::propagate::Reason;
use crate::value::Logic;

// ── Fanout Ref ────────────────────────────────────────────────────────

/// One link from a signal to a dependent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FanoutRef {
    /// Not elaborated yet. Nothing to notify.
    #[default]
    Unresolved,
    Resolved(ConsumerId),
}

impl FanoutRef {
    #[inline]
    pub fn is_resolved(self) -> bool {
        matches!(self, FanoutRef::Resolved(_))
    }

    #[inline]
    pub fn consumer(self) -> Option<ConsumerId> {
        match self {
            FanoutRef::Resolved(c) => Some(c),
            FanoutRef::Unresolved => None,
        }
    }
}

impl From<ConsumerId> for FanoutRef {
    fn from(c: ConsumerId) -> Self {
        FanoutRef::Resolved(c)
    }
}

/// Which reference of a net elaboration is updating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanoutSlot {
    Primary,
    Secondary,
}

impl FanoutSlot {
    pub fn name(self) -> &'static str {
        match self {
            FanoutSlot::Primary => "primary",
            FanoutSlot::Secondary => "secondary",
        }
    }
}

// ── Sinks ─────────────────────────────────────────────────────────────

/// Receiver of fanout notifications.
///
/// Notifications are synchronous: every resolved consumer of a change has
/// been notified before the propagation call returns.
pub trait FanoutSink {
    fn notify(&mut self, consumer: ConsumerId, value: Logic, reason: Reason);
}

/// A sink backed by a closure.
impl<F> FanoutSink for F
where
    F: FnMut(ConsumerId, Logic, Reason),
{
    fn notify(&mut self, consumer: ConsumerId, value: Logic, reason: Reason) {
        (self)(consumer, value, reason);
    }
}

/// One delivered notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    pub consumer: ConsumerId,
    pub value: Logic,
    pub reason: Reason,
}

/// A sink that keeps every notification in arrival order.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub notifications: Vec<Notification>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }

    pub fn clear(&mut self) {
        self.notifications.clear();
    }
}

impl FanoutSink for RecordingSink {
    fn notify(&mut self, consumer: ConsumerId, value: Logic, reason: Reason) {
        self.notifications.push(Notification {
            consumer,
            value,
            reason,
        });
    }
}

/// A sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl FanoutSink for NullSink {
    fn notify(&mut self, _consumer: ConsumerId, _value: Logic, _reason: Reason) {}
}

// ── Dispatcher ────────────────────────────────────────────────────────

/// Result of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Nothing was resolved, or dispatch did not run.
    Skipped,
    /// This many consumers were notified.
    Dispatched(usize),
}

impl DispatchOutcome {
    pub fn notified(self) -> usize {
        match self {
            DispatchOutcome::Skipped => 0,
            DispatchOutcome::Dispatched(n) => n,
        }
    }
}

/// Notify every resolved reference in `refs`, in order. Unresolved
/// references are skipped, not errors.
pub fn dispatch(
    refs: &[FanoutRef],
    value: Logic,
    reason: Reason,
    sink: &mut dyn FanoutSink,
) -> DispatchOutcome {
    let mut notified = 0;
    for consumer in refs.iter().filter_map(|r| r.consumer()) {
        sink.notify(consumer, value, reason);
        notified += 1;
    }
    if notified == 0 {
        log::trace!("fanout: no resolved consumer for {}", value);
        DispatchOutcome::Skipped
    } else {
        DispatchOutcome::Dispatched(notified)
    }
}

// ── Fanout shapes ─────────────────────────────────────────────────────

/// The fanout half of a driver's capability set.
pub trait FanoutShape {
    /// Dispatch a changed value to this net's dependents.
    fn dispatch(&self, value: Logic, reason: Reason, sink: &mut dyn FanoutSink) -> DispatchOutcome;

    /// Whether a registered override callback can be reached from this
    /// net at all.
    fn callback_reachable(&self) -> bool;

    /// Mutable access to one reference, for elaboration. `None` if the
    /// shape has no such slot.
    fn slot_mut(&mut self, slot: FanoutSlot) -> Option<&mut FanoutRef>;

    fn slot(&self, slot: FanoutSlot) -> Option<FanoutRef>;
}

/// Statically elaborated: one direct reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StaticFanout {
    pub target: FanoutRef,
}

impl StaticFanout {
    pub fn new(target: FanoutRef) -> Self {
        StaticFanout { target }
    }
}

impl FanoutShape for StaticFanout {
    fn dispatch(&self, value: Logic, reason: Reason, sink: &mut dyn FanoutSink) -> DispatchOutcome {
        dispatch(std::slice::from_ref(&self.target), value, reason, sink)
    }

    fn callback_reachable(&self) -> bool {
        true
    }

    fn slot_mut(&mut self, slot: FanoutSlot) -> Option<&mut FanoutRef> {
        match slot {
            FanoutSlot::Primary => Some(&mut self.target),
            FanoutSlot::Secondary => None,
        }
    }

    fn slot(&self, slot: FanoutSlot) -> Option<FanoutRef> {
        match slot {
            FanoutSlot::Primary => Some(self.target),
            FanoutSlot::Secondary => None,
        }
    }
}

/// Dynamically elaborated: a primary and a secondary reference, either of
/// which may still be unresolved. Override callbacks hang off the
/// secondary reference and are unreachable until it resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DynamicFanout {
    pub primary: FanoutRef,
    pub secondary: FanoutRef,
}

impl DynamicFanout {
    pub fn new(primary: FanoutRef, secondary: FanoutRef) -> Self {
        DynamicFanout { primary, secondary }
    }

    pub fn unresolved() -> Self {
        Self::default()
    }
}

impl FanoutShape for DynamicFanout {
    fn dispatch(&self, value: Logic, reason: Reason, sink: &mut dyn FanoutSink) -> DispatchOutcome {
        if !self.primary.is_resolved() && !self.secondary.is_resolved() {
            return DispatchOutcome::Skipped;
        }
        dispatch(&[self.primary, self.secondary], value, reason, sink)
    }

    fn callback_reachable(&self) -> bool {
        self.secondary.is_resolved()
    }

    fn slot_mut(&mut self, slot: FanoutSlot) -> Option<&mut FanoutRef> {
        match slot {
            FanoutSlot::Primary => Some(&mut self.primary),
            FanoutSlot::Secondary => Some(&mut self.secondary),
        }
    }

    fn slot(&self, slot: FanoutSlot) -> Option<FanoutRef> {
        match slot {
            FanoutSlot::Primary => Some(self.primary),
            FanoutSlot::Secondary => Some(self.secondary),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(id: u32) -> FanoutRef {
        FanoutRef::Resolved(ConsumerId::new(id))
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let mut sink = RecordingSink::new();
        let out = dispatch(&[c(4), FanoutRef::Unresolved, c(2)], Logic::One, Reason::Normal, &mut sink);
        assert_eq!(out, DispatchOutcome::Dispatched(2));
        let consumers: Vec<u32> = sink.notifications.iter().map(|n| n.consumer.raw()).collect();
        assert_eq!(consumers, vec![4, 2]);
    }

    #[test]
    fn test_static_unresolved_is_skipped() {
        let mut sink = RecordingSink::new();
        let fanout = StaticFanout::default();
        assert_eq!(fanout.dispatch(Logic::Zero, Reason::Normal, &mut sink), DispatchOutcome::Skipped);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_dynamic_both_unresolved_is_skipped() {
        let mut calls = 0usize;
        let mut sink = |_c: ConsumerId, _v: Logic, _r: Reason| calls += 1;
        let fanout = DynamicFanout::unresolved();
        assert_eq!(fanout.dispatch(Logic::X, Reason::Force, &mut sink), DispatchOutcome::Skipped);
        assert_eq!(calls, 0);
        assert!(!fanout.callback_reachable());
    }

    #[test]
    fn test_dynamic_partial_resolution() {
        let mut sink = RecordingSink::new();
        let fanout = DynamicFanout::new(FanoutRef::Unresolved, c(9));
        let out = fanout.dispatch(Logic::Z, Reason::Release, &mut sink);
        assert_eq!(out.notified(), 1);
        assert_eq!(
            sink.notifications[0],
            Notification {
                consumer: ConsumerId::new(9),
                value: Logic::Z,
                reason: Reason::Release,
            }
        );
        assert!(fanout.callback_reachable());
    }

    #[test]
    fn test_slots() {
        let mut s = StaticFanout::default();
        assert!(s.slot_mut(FanoutSlot::Secondary).is_none());
        *s.slot_mut(FanoutSlot::Primary).unwrap() = c(1);
        assert_eq!(s.slot(FanoutSlot::Primary), Some(c(1)));

        let mut d = DynamicFanout::unresolved();
        *d.slot_mut(FanoutSlot::Secondary).unwrap() = c(3);
        assert_eq!(d.secondary, c(3));
        assert_eq!(d.slot(FanoutSlot::Primary), Some(FanoutRef::Unresolved));
    }
}
