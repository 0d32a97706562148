//! Signal propagator.
//!
//! One generic core routine decides whether a new value is a real change,
//! applies it, reports force/release transitions to the callback layer,
//! dispatches to fanout and stages the value into the NBA gate. Driver
//! families differ only in their [`FanoutShape`]; the four entry points
//! (write, force, release, write-no-override) sit on top of the core.

use crate::callback::{CallbackOutcome, CallbackReason, CallbackRegistry, RESERVED_ARGS};
use crate::error::KernelResult;
use crate::fanout::{DispatchOutcome, DynamicFanout, FanoutRef, FanoutShape, FanoutSink, FanoutSlot, StaticFanout};
use crate::id::SignalId;
use crate::nba::{self, NbaGate};
use crate::value::{self, Logic};
use crate::wheel::FutureQueue;

/// Why a propagation call is happening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Reason {
    #[default]
    Normal,
    Force,
    Release,
}

impl Reason {
    /// Callback reason code for override transitions.
    pub fn callback_reason(self) -> Option<CallbackReason> {
        match self {
            Reason::Normal => None,
            Reason::Force => Some(CallbackReason::Forced),
            Reason::Release => Some(CallbackReason::Released),
        }
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reason::Normal => write!(f, "normal"),
            Reason::Force => write!(f, "force"),
            Reason::Release => write!(f, "release"),
        }
    }
}

/// Everything a propagation call touches outside the driver record.
pub struct PropagationContext<'a> {
    pub signal: SignalId,
    pub queue: &'a mut FutureQueue,
    pub callbacks: &'a mut CallbackRegistry,
    pub sink: &'a mut dyn FanoutSink,
    pub nba_delay: u64,
}

/// What one entry-point call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropagationOutcome {
    /// A write hit a forced signal and was only recorded as the driven value.
    pub suppressed: bool,
    /// The committed value changed.
    pub changed: bool,
    pub dispatch: DispatchOutcome,
    pub callback: CallbackOutcome,
}

impl PropagationOutcome {
    fn suppressed() -> Self {
        PropagationOutcome {
            suppressed: true,
            changed: false,
            dispatch: DispatchOutcome::Skipped,
            callback: CallbackOutcome::NotApplicable,
        }
    }
}

/// Per-signal persistent driver state.
///
/// `committed` is the only input to change detection; it always equals
/// the last value handed to fanout dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverState<F> {
    driven: Logic,
    force_latched: bool,
    committed: Logic,
    fanout: F,
    gate: NbaGate,
}

/// Driver of a statically elaborated net.
pub type StaticDriver = DriverState<StaticFanout>;
/// Driver of a dynamically elaborated net.
pub type DynamicDriver = DriverState<DynamicFanout>;

impl<F: FanoutShape> DriverState<F> {
    pub fn new(init: Logic, fanout: F, gate: NbaGate) -> Self {
        DriverState {
            driven: init,
            force_latched: false,
            committed: init,
            fanout,
            gate,
        }
    }

    pub fn fanout(&self) -> &F {
        &self.fanout
    }

    fn deliver_override_callback(&self, ctx: &mut PropagationContext<'_>, reason: Reason) -> CallbackOutcome {
        let Some(code) = reason.callback_reason() else {
            return CallbackOutcome::NotApplicable;
        };
        if !ctx.callbacks.is_enabled() {
            return CallbackOutcome::Disabled;
        }
        if !self.fanout.callback_reachable() {
            return CallbackOutcome::NotRegistered;
        }
        match ctx.callbacks.get_callback(ctx.signal) {
            Some(callback) => {
                log::debug!("propagate: {} {}", ctx.signal, code);
                callback.notify(code, RESERVED_ARGS);
                CallbackOutcome::Delivered(code)
            }
            None => CallbackOutcome::NotRegistered,
        }
    }

    fn store_driven_and_propagate(
        &mut self,
        ctx: &mut PropagationContext<'_>,
        value: Logic,
    ) -> KernelResult<PropagationOutcome> {
        self.driven = value;
        if self.force_latched {
            log::trace!("propagate: {} is forced, write of {} held back", ctx.signal, value);
            return Ok(PropagationOutcome::suppressed());
        }
        self.propagate(ctx, value, Reason::Normal)
    }
}

/// Object-safe view of a driver, whatever its fanout shape.
pub trait SignalDriver {
    /// The core routine.
    fn propagate(
        &mut self,
        ctx: &mut PropagationContext<'_>,
        value: Logic,
        reason: Reason,
    ) -> KernelResult<PropagationOutcome>;

    /// Ordinary driver write. A forced signal records the value and stops.
    fn write(&mut self, ctx: &mut PropagationContext<'_>, value: Logic) -> KernelResult<PropagationOutcome>;

    /// Latch a force and propagate the forced value.
    fn force(&mut self, ctx: &mut PropagationContext<'_>, value: Logic) -> KernelResult<PropagationOutcome>;

    /// Drop the force and re-propagate the last driven value.
    fn release(&mut self, ctx: &mut PropagationContext<'_>) -> KernelResult<PropagationOutcome>;

    /// Write that must not fight an active force.
    fn write_no_override(
        &mut self,
        ctx: &mut PropagationContext<'_>,
        value: Logic,
    ) -> KernelResult<PropagationOutcome>;

    fn driven_value(&self) -> Logic;
    fn committed_value(&self) -> Logic;
    fn is_forced(&self) -> bool;
    fn gate(&self) -> &NbaGate;
    fn gate_mut(&mut self) -> &mut NbaGate;
    fn fanout_slot(&self, slot: FanoutSlot) -> Option<FanoutRef>;
    fn fanout_slot_mut(&mut self, slot: FanoutSlot) -> Option<&mut FanoutRef>;
}

impl<F: FanoutShape> SignalDriver for DriverState<F> {
    fn propagate(
        &mut self,
        ctx: &mut PropagationContext<'_>,
        value: Logic,
        reason: Reason,
    ) -> KernelResult<PropagationOutcome> {
        match reason {
            Reason::Force => self.force_latched = true,
            Reason::Release => self.force_latched = false,
            Reason::Normal => {}
        }

        if value::equal(self.committed, value) {
            // The override state may have changed even though the value
            // did not, so the callback step still runs.
            let callback = self.deliver_override_callback(ctx, reason);
            return Ok(PropagationOutcome {
                suppressed: false,
                changed: false,
                dispatch: DispatchOutcome::Skipped,
                callback,
            });
        }

        self.committed = value;
        let callback = self.deliver_override_callback(ctx, reason);
        let dispatch = self.fanout.dispatch(value, reason, &mut *ctx.sink);
        nba::stage(&mut self.gate, value, ctx.signal, ctx.queue, ctx.nba_delay)?;

        Ok(PropagationOutcome {
            suppressed: false,
            changed: true,
            dispatch,
            callback,
        })
    }

    fn write(&mut self, ctx: &mut PropagationContext<'_>, value: Logic) -> KernelResult<PropagationOutcome> {
        self.store_driven_and_propagate(ctx, value)
    }

    fn force(&mut self, ctx: &mut PropagationContext<'_>, value: Logic) -> KernelResult<PropagationOutcome> {
        log::debug!("propagate: forcing {} to {}", ctx.signal, value);
        self.force_latched = true;
        self.propagate(ctx, value, Reason::Force)
    }

    fn release(&mut self, ctx: &mut PropagationContext<'_>) -> KernelResult<PropagationOutcome> {
        // Read the driven value before the latch drops, then propagate it
        // as a release.
        let value = self.driven;
        self.force_latched = false;
        log::debug!("propagate: releasing {} back to {}", ctx.signal, value);
        self.propagate(ctx, value, Reason::Release)
    }

    fn write_no_override(
        &mut self,
        ctx: &mut PropagationContext<'_>,
        value: Logic,
    ) -> KernelResult<PropagationOutcome> {
        self.store_driven_and_propagate(ctx, value)
    }

    fn driven_value(&self) -> Logic {
        self.driven
    }

    fn committed_value(&self) -> Logic {
        self.committed
    }

    fn is_forced(&self) -> bool {
        self.force_latched
    }

    fn gate(&self) -> &NbaGate {
        &self.gate
    }

    fn gate_mut(&mut self) -> &mut NbaGate {
        &mut self.gate
    }

    fn fanout_slot(&self, slot: FanoutSlot) -> Option<FanoutRef> {
        self.fanout.slot(slot)
    }

    fn fanout_slot_mut(&mut self, slot: FanoutSlot) -> Option<&mut FanoutRef> {
        self.fanout.slot_mut(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::fanout::RecordingSink;
    use crate::id::ConsumerId;

    struct Harness {
        queue: FutureQueue,
        callbacks: CallbackRegistry,
        sink: RecordingSink,
    }

    impl Harness {
        fn new(callbacks_enabled: bool) -> Self {
            Harness {
                queue: FutureQueue::new(&KernelConfig::default()).unwrap(),
                callbacks: CallbackRegistry::new(callbacks_enabled),
                sink: RecordingSink::new(),
            }
        }

        fn ctx(&mut self) -> PropagationContext<'_> {
            PropagationContext {
                signal: SignalId::new(0),
                queue: &mut self.queue,
                callbacks: &mut self.callbacks,
                sink: &mut self.sink,
                nba_delay: 1,
            }
        }
    }

    fn static_driver() -> StaticDriver {
        DriverState::new(
            Logic::X,
            StaticFanout::new(FanoutRef::Resolved(ConsumerId::new(1))),
            NbaGate::separate(Logic::X),
        )
    }

    #[test]
    fn test_change_dispatches_and_stages() {
        let mut h = Harness::new(false);
        let mut d = static_driver();
        let out = d.write(&mut h.ctx(), Logic::One).unwrap();
        assert!(out.changed);
        assert_eq!(out.dispatch, DispatchOutcome::Dispatched(1));
        assert_eq!(out.callback, CallbackOutcome::NotApplicable);
        assert_eq!(d.committed_value(), Logic::One);
        assert_eq!(d.gate().staged(), Logic::One);
        assert_eq!(h.queue.len(), 1);
    }

    #[test]
    fn test_same_value_is_noop() {
        let mut h = Harness::new(false);
        let mut d = static_driver();
        d.write(&mut h.ctx(), Logic::Zero).unwrap();
        let out = d.write(&mut h.ctx(), Logic::Zero).unwrap();
        assert!(!out.changed);
        assert_eq!(h.sink.len(), 1);
        assert_eq!(h.queue.len(), 1);
    }

    #[test]
    fn test_forced_write_is_held_back() {
        let mut h = Harness::new(false);
        let mut d = static_driver();
        d.force(&mut h.ctx(), Logic::One).unwrap();
        let out = d.write(&mut h.ctx(), Logic::Zero).unwrap();
        assert!(out.suppressed);
        assert_eq!(d.driven_value(), Logic::Zero);
        assert_eq!(d.committed_value(), Logic::One);
        assert!(d.is_forced());
    }

    #[test]
    fn test_release_repropagates_driven() {
        let mut h = Harness::new(false);
        let mut d = static_driver();
        d.force(&mut h.ctx(), Logic::One).unwrap();
        d.write_no_override(&mut h.ctx(), Logic::Zero).unwrap();
        let out = d.release(&mut h.ctx()).unwrap();
        assert!(out.changed);
        assert!(!d.is_forced());
        assert_eq!(d.committed_value(), Logic::Zero);
        assert_eq!(h.sink.notifications.last().unwrap().reason, Reason::Release);
    }

    #[test]
    fn test_core_reason_sets_latch() {
        let mut h = Harness::new(false);
        let mut d = static_driver();
        d.propagate(&mut h.ctx(), Logic::One, Reason::Force).unwrap();
        assert!(d.is_forced());
        d.propagate(&mut h.ctx(), Logic::One, Reason::Release).unwrap();
        assert!(!d.is_forced());
    }

    #[test]
    fn test_callback_disabled_globally() {
        let mut h = Harness::new(false);
        h.callbacks.register(SignalId::new(0), Box::new(|_r: CallbackReason, _a: [i32; 3]| {}));
        let mut d = static_driver();
        let out = d.force(&mut h.ctx(), Logic::One).unwrap();
        assert_eq!(out.callback, CallbackOutcome::Disabled);
    }
}
