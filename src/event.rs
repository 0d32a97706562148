/// Event blocks: the unit of scheduled work.
///
/// An event block carries its target time, the action to perform when it
/// fires, and the chaining links used by whichever queue structure owns
/// it. Blocks are owned by exactly one bucket (or list, or the overflow
/// scheduler) while pending and are never shared between two of them.

use crate::id::SignalId;
use crate::time::SimTime;

// ── Event Key ─────────────────────────────────────────────────────────

/// Handle of an event block inside the queue's arena.
///
/// Keys are only meaningful to the [`FutureQueue`](crate::FutureQueue)
/// that issued them; freed slots are reused by later blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventKey(usize);

impl EventKey {
    #[inline]
    pub(crate) fn new(raw: usize) -> Self {
        EventKey(raw)
    }

    #[inline]
    pub(crate) fn slot(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for EventKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "E#{}", self.0)
    }
}

// ── Event Action ──────────────────────────────────────────────────────

/// What to do when an event block fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventAction {
    /// Materialize the staged value of a signal's NBA gate.
    CommitNba(SignalId),

    /// An opaque marker for the outer loop's own bookkeeping
    /// (testbench stimulus, watchdogs, sampling points).
    Marker(u64),
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventAction::CommitNba(signal) => write!(f, "CommitNba({})", signal),
            EventAction::Marker(tag) => write!(f, "Marker({})", tag),
        }
    }
}

// ── Chain Link ────────────────────────────────────────────────────────

/// The backward half of a block's chaining state.
///
/// `Detached` is the sentinel: the block is not at any valid queue
/// position. Every scheduling branch overwrites it when it physically
/// links the block, so seeing anything else on entry means the block is
/// being linked twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChainLink {
    #[default]
    Detached,
    /// First block of its chain.
    Head,
    /// Appended after the given block.
    After(EventKey),
}

// ── Event Block ───────────────────────────────────────────────────────

/// One pending future action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBlock {
    pub(crate) target_time: SimTime,
    pub(crate) action: EventAction,
    pub(crate) next: Option<EventKey>,
    pub(crate) prev: ChainLink,
}

impl EventBlock {
    /// A fresh, detached block. Its target time is filled in by the
    /// queue when it is scheduled.
    pub fn new(action: EventAction) -> Self {
        EventBlock {
            target_time: SimTime::ZERO,
            action,
            next: None,
            prev: ChainLink::Detached,
        }
    }

    /// Absolute time at which this block fires.
    #[inline]
    pub fn target_time(&self) -> SimTime {
        self.target_time
    }

    #[inline]
    pub fn action(&self) -> &EventAction {
        &self.action
    }

    /// `true` while the block sits in a chain.
    #[inline]
    pub fn is_linked(&self) -> bool {
        self.prev != ChainLink::Detached || self.next.is_some()
    }

    /// Reset both links to the detached state. Done by the queue when a
    /// block leaves it.
    #[inline]
    pub(crate) fn detach(&mut self) {
        self.next = None;
        self.prev = ChainLink::Detached;
    }
}

impl std::fmt::Display for EventBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.target_time, self.action)
    }
}
