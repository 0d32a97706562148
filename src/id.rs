//! Lightweight, ordered, copyable identifiers for signals and fanout consumers.

/// Identifies one signal driver record inside a [`Kernel`](crate::Kernel).
///
/// Ids are handed out densely in registration order by the kernel's
/// elaboration API and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SignalId(u32);

impl SignalId {
    /// Create a signal ID from a raw integer.
    #[inline]
    pub fn new(id: u32) -> Self {
        SignalId(id)
    }

    /// Return the underlying integer.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for SignalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "S{}", self.0)
    }
}

/// A fanout target: whatever the netlist wires a signal into (a gate
/// input, a process sensitivity entry, a port). Opaque to the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ConsumerId(u32);

impl ConsumerId {
    #[inline]
    pub fn new(id: u32) -> Self {
        ConsumerId(id)
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "C{}", self.0)
    }
}
