//! Overflow ("millennium") scheduling for events beyond the time wheel.
//!
//! The wheel only holds events whose target lies inside its span of the
//! current window. Everything else is handed to a [`FarFutureScheduler`]
//! together with the window index it belongs to and its true 64-bit
//! target. [`MillenniumQueue`] is the default implementation.

use std::collections::{BTreeMap, VecDeque};

use crate::event::EventBlock;
use crate::time::SimTime;

/// Boundary to the secondary scheduler for far-future events.
///
/// Implementations take exclusive ownership of every block they receive
/// and must yield blocks for one target time in the order they arrived.
pub trait FarFutureScheduler {
    /// Take ownership of `event`, which fires at `true_target` inside
    /// window `window_index`.
    fn schedule_far_future(&mut self, event: EventBlock, window_index: u64, true_target: SimTime);

    /// Earliest pending target time, if any.
    fn next_time(&self) -> Option<SimTime>;

    /// Remove the oldest block due exactly at `time`.
    fn pop_due(&mut self, time: SimTime) -> Option<EventBlock>;

    /// Number of blocks held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ordered map of per-time FIFO lists.
#[derive(Debug, Default)]
pub struct MillenniumQueue {
    slots: BTreeMap<SimTime, VecDeque<EventBlock>>,
    len: usize,
    /// Highest window index a block has been filed under.
    max_window: u64,
}

impl MillenniumQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest window index any block was filed under so far.
    pub fn max_window(&self) -> u64 {
        self.max_window
    }
}

impl FarFutureScheduler for MillenniumQueue {
    fn schedule_far_future(&mut self, event: EventBlock, window_index: u64, true_target: SimTime) {
        debug_assert_eq!(event.target_time(), true_target);
        log::trace!(
            "millennium: filing {} under window {}",
            event,
            window_index
        );
        self.max_window = self.max_window.max(window_index);
        self.slots.entry(true_target).or_default().push_back(event);
        self.len += 1;
    }

    fn next_time(&self) -> Option<SimTime> {
        self.slots.keys().next().copied()
    }

    fn pop_due(&mut self, time: SimTime) -> Option<EventBlock> {
        let list = self.slots.get_mut(&time)?;
        let event = list.pop_front();
        if list.is_empty() {
            self.slots.remove(&time);
        }
        if event.is_some() {
            self.len -= 1;
        }
        event
    }

    fn len(&self) -> usize {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventAction;

    fn block_at(ticks: u64, tag: u64) -> EventBlock {
        let mut block = EventBlock::new(EventAction::Marker(tag));
        block.target_time = SimTime::new(ticks);
        block
    }

    #[test]
    fn test_fifo_per_time() {
        let mut q = MillenniumQueue::new();
        q.schedule_far_future(block_at(500, 1), 0, SimTime::new(500));
        q.schedule_far_future(block_at(500, 2), 0, SimTime::new(500));
        q.schedule_far_future(block_at(90, 3), 1, SimTime::new(90));

        assert_eq!(q.len(), 3);
        assert_eq!(q.next_time(), Some(SimTime::new(90)));
        assert_eq!(q.max_window(), 1);

        assert_eq!(q.pop_due(SimTime::new(90)).unwrap().action(), &EventAction::Marker(3));
        assert_eq!(q.pop_due(SimTime::new(500)).unwrap().action(), &EventAction::Marker(1));
        assert_eq!(q.pop_due(SimTime::new(500)).unwrap().action(), &EventAction::Marker(2));
        assert!(q.is_empty());
        assert_eq!(q.next_time(), None);
    }

    #[test]
    fn test_pop_due_wrong_time() {
        let mut q = MillenniumQueue::new();
        q.schedule_far_future(block_at(10, 1), 0, SimTime::new(10));
        assert!(q.pop_due(SimTime::new(11)).is_none());
        assert_eq!(q.len(), 1);
    }
}
