//! Structured error types for the kernel.
//!
//! Only contract violations are errors. Benign absence (an unresolved
//! fanout reference, a signal with no override callback, an empty bucket)
//! is an expected transient state and is reported through outcome values
//! instead, so callers can always tell the two apart.

use crate::id::SignalId;
use crate::time::SimTime;

/// The top-level error type for the simulation kernel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KernelError {
    // ── Configuration errors ──────────────────────────────

    /// The time wheel must have between 2^1 and 2^20 buckets.
    #[error("time wheel of 2^{bits} buckets is out of range (1..=20 bits)")]
    InvalidWheelSize { bits: u32 },

    /// The in-window time word must be 8..=32 bits and wider than the wheel.
    #[error("time word of {bits} bits is invalid for a 2^{wheel_bits} bucket wheel")]
    InvalidTimeWordBits { bits: u32, wheel_bits: u32 },

    // ── Scheduling errors ─────────────────────────────────

    /// A negative delay reached the signed scheduling entry point.
    #[error("cannot schedule with negative delay {0}")]
    NegativeDelay(i64),

    /// `now + delay` does not fit in the 64-bit clock.
    #[error("delay {delay} from {now} overflows the simulation clock")]
    TimeOverflow { now: SimTime, delay: u64 },

    /// An event block that is still chained into a queue was scheduled again.
    #[error("event block for {target} is already linked into a queue")]
    EventAlreadyLinked { target: SimTime },

    /// The clock was asked to move backward.
    #[error("cannot move time back to {requested} when current time is {current}")]
    TimeWentBackward { requested: SimTime, current: SimTime },

    /// The clock was asked to jump past events that are still pending.
    #[error("cannot advance to {requested}: an event is pending at {pending}")]
    PendingEventsSkipped { requested: SimTime, pending: SimTime },

    // ── Signal / elaboration errors ───────────────────────

    /// A signal id was referenced but no net is registered under it.
    #[error("signal {0} is not registered")]
    UnknownSignal(SignalId),

    /// Every `u32` signal id is already taken.
    #[error("signal id space exhausted: every u32 id is registered")]
    SignalSpaceExhausted,

    /// The net family has no fanout slot of the requested kind.
    #[error("signal {signal} has no {slot} fanout slot")]
    MissingFanoutSlot { signal: SignalId, slot: &'static str },

    /// A packed NBA gate reference had its two value bits set.
    #[error("packed NBA reference {0:#x} overlaps the 2-bit value field")]
    PackedReferenceMisaligned(u64),

    /// A character that is not one of `0 1 x X z Z`.
    #[error("invalid logic character {0:?}")]
    InvalidLogicChar(char),
}

/// Convenience alias for `Result<T, KernelError>`.
pub type KernelResult<T> = Result<T, KernelError>;
