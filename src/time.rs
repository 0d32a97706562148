/// Simulation time for the logic kernel.
///
/// A single 64-bit tick counter. Scheduling views it as two halves: a
/// window index (high bits) and an in-window word (low bits) whose width
/// is configured by `time_word_bits`. Wrap of the in-window word is how
/// the time wheel detects targets that belong to the next window.

/// A point in simulation time, in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SimTime(u64);

impl SimTime {
    /// The zero-point of simulation time.
    pub const ZERO: SimTime = SimTime(0);

    #[inline]
    pub fn new(ticks: u64) -> Self {
        SimTime(ticks)
    }

    #[inline]
    pub fn ticks(self) -> u64 {
        self.0
    }

    /// Compute the time `delay` ticks after `self`.
    /// Returns `None` if the 64-bit clock would overflow.
    #[inline]
    pub fn plus(self, delay: u64) -> Option<SimTime> {
        self.0.checked_add(delay).map(SimTime)
    }

    /// Returns `true` if `self` is strictly before `other`.
    #[inline]
    pub fn is_before(self, other: SimTime) -> bool {
        self.0 < other.0
    }

    /// Ticks between two points in time, `None` if `earlier` is after `self`.
    #[inline]
    pub fn duration_since(self, earlier: SimTime) -> Option<u64> {
        self.0.checked_sub(earlier.0)
    }

    /// The low `word_bits` bits of the clock.
    #[inline]
    pub fn word(self, word_bits: u32) -> u64 {
        self.0 & word_mask(word_bits)
    }

    /// Which window of `2^word_bits` ticks this time falls in.
    #[inline]
    pub fn window_index(self, word_bits: u32) -> u64 {
        if word_bits >= 64 {
            0
        } else {
            self.0 >> word_bits
        }
    }
}

/// All-ones mask for a `word_bits`-wide in-window word.
#[inline]
pub fn word_mask(word_bits: u32) -> u64 {
    if word_bits >= 64 {
        u64::MAX
    } else {
        (1u64 << word_bits) - 1
    }
}

impl std::fmt::Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T={}", self.0)
    }
}
