//! Trace records of every fanout notification the kernel delivers.

use crate::fanout::FanoutSink;
use crate::id::{ConsumerId, SignalId};
use crate::propagate::Reason;
use crate::time::SimTime;
use crate::value::Logic;

/// A record of a single fanout notification.
///
/// Appended by the kernel when tracing is enabled; useful for test
/// assertions and post-mortem debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct TraceEntry {
    /// Simulation time of the propagation call.
    pub time: SimTime,
    /// The signal whose change was dispatched.
    pub signal: SignalId,
    /// The consumer that was notified.
    pub consumer: ConsumerId,
    pub value: Logic,
    pub reason: Reason,
}

impl std::fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[T={} {} -> {}] {} ({})",
            self.time.ticks(),
            self.signal,
            self.consumer,
            self.value,
            self.reason,
        )
    }
}

/// Forwards to an inner sink and appends a [`TraceEntry`] per notification.
pub(crate) struct TracingSink<'a> {
    pub(crate) inner: &'a mut dyn FanoutSink,
    pub(crate) entries: &'a mut Vec<TraceEntry>,
    pub(crate) time: SimTime,
    pub(crate) signal: SignalId,
}

impl FanoutSink for TracingSink<'_> {
    fn notify(&mut self, consumer: ConsumerId, value: Logic, reason: Reason) {
        self.entries.push(TraceEntry {
            time: self.time,
            signal: self.signal,
            consumer,
            value,
            reason,
        });
        self.inner.notify(consumer, value, reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fanout::RecordingSink;

    #[test]
    fn test_tracing_sink_records_and_forwards() {
        let mut inner = RecordingSink::new();
        let mut entries = Vec::new();
        {
            let mut sink = TracingSink {
                inner: &mut inner,
                entries: &mut entries,
                time: SimTime::new(7),
                signal: SignalId::new(2),
            };
            sink.notify(ConsumerId::new(5), Logic::One, Reason::Force);
        }
        assert_eq!(inner.len(), 1);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].to_string(), "[T=7 S2 -> C5] 1 (force)");
    }
}
