//! Force/release callback boundary.
//!
//! A debugger or PLI-style layer registers callbacks per signal and owns a
//! global enable flag. The propagator reports override transitions to it
//! with a numeric reason code and three reserved arguments whose meaning
//! belongs to the consumer.

use std::collections::BTreeMap;

use crate::id::SignalId;

/// Arguments passed through untouched to every callback.
pub const RESERVED_ARGS: [i32; 3] = [-1, -1, -1];

/// Why an override callback fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum CallbackReason {
    Forced = 29,
    Released = 30,
}

impl CallbackReason {
    /// Numeric reason code delivered to callback consumers.
    #[inline]
    pub fn code(self) -> u32 {
        self as u32
    }
}

impl std::fmt::Display for CallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallbackReason::Forced => write!(f, "forced({})", self.code()),
            CallbackReason::Released => write!(f, "released({})", self.code()),
        }
    }
}

/// A registered override callback.
pub trait OverrideCallback {
    fn notify(&mut self, reason: CallbackReason, reserved: [i32; 3]);
}

impl<F> OverrideCallback for F
where
    F: FnMut(CallbackReason, [i32; 3]),
{
    fn notify(&mut self, reason: CallbackReason, reserved: [i32; 3]) {
        (self)(reason, reserved);
    }
}

/// What the callback step did for one propagation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Ordinary write; nothing to report.
    NotApplicable,
    /// Delivery is globally disabled.
    Disabled,
    /// No callback is registered, or the net cannot reach it yet.
    NotRegistered,
    Delivered(CallbackReason),
}

/// Per-signal callback table plus the global enable flag.
#[derive(Default)]
pub struct CallbackRegistry {
    enabled: bool,
    callbacks: BTreeMap<SignalId, Box<dyn OverrideCallback>>,
}

impl CallbackRegistry {
    pub fn new(enabled: bool) -> Self {
        CallbackRegistry {
            enabled,
            callbacks: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Register (or replace) the callback for `signal`.
    pub fn register(&mut self, signal: SignalId, callback: Box<dyn OverrideCallback>) {
        log::debug!("callbacks: registered override callback on {}", signal);
        self.callbacks.insert(signal, callback);
    }

    pub fn unregister(&mut self, signal: SignalId) -> bool {
        self.callbacks.remove(&signal).is_some()
    }

    /// Registration lookup. `None` is the benign "nothing registered" case.
    pub fn get_callback(&mut self, signal: SignalId) -> Option<&mut (dyn OverrideCallback + 'static)> {
        self.callbacks.get_mut(&signal).map(|cb| cb.as_mut())
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("enabled", &self.enabled)
            .field("signals", &self.callbacks.keys().collect::<Vec<_>>())
            .finish()
    }
}
