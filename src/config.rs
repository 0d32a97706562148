//! Kernel configuration.
//!
//! Fixed for the lifetime of a [`Kernel`](crate::Kernel): the wheel is
//! sized once at construction and never rehashed.

use crate::error::{KernelError, KernelResult};

/// Largest accepted `wheel_bits` (one million buckets).
pub const MAX_WHEEL_BITS: u32 = 20;
/// Narrowest accepted in-window time word.
pub const MIN_TIME_WORD_BITS: u32 = 8;
/// Widest accepted in-window time word.
pub const MAX_TIME_WORD_BITS: u32 = 32;

/// Configuration for the scheduling and propagation kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct KernelConfig {
    /// The wheel has `1 << wheel_bits` buckets.
    pub wheel_bits: u32,

    /// Width of the in-window time word used for wrap detection.
    pub time_word_bits: u32,

    /// Delay at which a staged NBA value is materialized.
    pub nba_delay: u64,

    /// Global enable for force/release callback delivery.
    pub override_callbacks: bool,

    /// Record every fanout notification in the kernel trace.
    pub trace: bool,
}

impl KernelConfig {
    pub fn new() -> Self {
        KernelConfig {
            wheel_bits: 10,
            time_word_bits: 32,
            nba_delay: 1,
            override_callbacks: false,
            trace: false,
        }
    }

    pub fn with_wheel_bits(mut self, bits: u32) -> Self {
        self.wheel_bits = bits;
        self
    }

    pub fn with_time_word_bits(mut self, bits: u32) -> Self {
        self.time_word_bits = bits;
        self
    }

    pub fn with_nba_delay(mut self, delay: u64) -> Self {
        self.nba_delay = delay;
        self
    }

    pub fn with_override_callbacks(mut self, enabled: bool) -> Self {
        self.override_callbacks = enabled;
        self
    }

    pub fn with_trace(mut self, enabled: bool) -> Self {
        self.trace = enabled;
        self
    }

    /// Number of wheel buckets.
    #[inline]
    pub fn window_size(&self) -> u64 {
        1u64 << self.wheel_bits
    }

    /// Reject sizes the wheel cannot be built with.
    pub fn validate(&self) -> KernelResult<()> {
        if self.wheel_bits == 0 || self.wheel_bits > MAX_WHEEL_BITS {
            return Err(KernelError::InvalidWheelSize {
                bits: self.wheel_bits,
            });
        }
        if self.time_word_bits < MIN_TIME_WORD_BITS
            || self.time_word_bits > MAX_TIME_WORD_BITS
            || self.time_word_bits <= self.wheel_bits
        {
            return Err(KernelError::InvalidTimeWordBits {
                bits: self.time_word_bits,
                wheel_bits: self.wheel_bits,
            });
        }
        Ok(())
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::new()
    }
}
