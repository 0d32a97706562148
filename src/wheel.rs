/// Future event queue.
///
/// A fixed-size hash table of time buckets keyed by `target & (window - 1)`,
/// a unit-delay list for the dominant one-tick delay, and an overflow path
/// for targets the wheel cannot hold. Event blocks live in a slab arena so
/// that chaining is done with keys and freed slots are pooled.
///
/// Every bucket holds events for exactly one target time: the wheel only
/// accepts targets in `[now, now + window)`, and two distinct times in that
/// range never hash to the same bucket.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use slab::Slab;

use crate::config::KernelConfig;
use crate::error::{KernelError, KernelResult};
use crate::event::{ChainLink, EventBlock, EventKey};
use crate::millennium::{FarFutureScheduler, MillenniumQueue};
use crate::time::{word_mask, SimTime};

/// A non-empty forward chain with an explicit tail for O(1) append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Chain {
    time: SimTime,
    head: EventKey,
    tail: EventKey,
}

/// Where the next event to pop lives. Declaration order is the tie-break
/// order at equal times, which is also scheduling order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Far,
    Bucket(usize),
    Unit,
}

/// Counters for each scheduling branch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Appended to the unit-delay list without hashing.
    pub unit_appends: u64,
    /// Started the unit-delay list.
    pub unit_installs: u64,
    /// Appended after the tail of an occupied bucket.
    pub bucket_appends: u64,
    /// Installed as the first event of an empty bucket.
    pub bucket_installs: u64,
    /// Wrapped past the window; handed off under the next window index.
    pub overflows: u64,
    /// Inside the window but beyond the wheel span.
    pub far_future: u64,
}

/// The time wheel.
pub struct FutureQueue {
    now: SimTime,
    wheel_bits: u32,
    time_word_bits: u32,
    arena: Slab<EventBlock>,
    buckets: Vec<Option<Chain>>,
    /// Target times of occupied buckets.
    occupied: BinaryHeap<Reverse<SimTime>>,
    unit: Option<Chain>,
    far: Box<dyn FarFutureScheduler>,
    stats: QueueStats,
}

impl FutureQueue {
    /// Build a wheel sized by `config` with a [`MillenniumQueue`] as the
    /// overflow scheduler.
    pub fn new(config: &KernelConfig) -> KernelResult<Self> {
        Self::with_far_scheduler(config, Box::new(MillenniumQueue::new()))
    }

    /// Build a wheel that forwards far-future events to `far`.
    pub fn with_far_scheduler(
        config: &KernelConfig,
        far: Box<dyn FarFutureScheduler>,
    ) -> KernelResult<Self> {
        config.validate()?;
        let size = config.window_size() as usize;
        Ok(FutureQueue {
            now: SimTime::ZERO,
            wheel_bits: config.wheel_bits,
            time_word_bits: config.time_word_bits,
            arena: Slab::new(),
            buckets: vec![None; size],
            occupied: BinaryHeap::new(),
            unit: None,
            far,
            stats: QueueStats::default(),
        })
    }

    /// Current simulation time.
    #[inline]
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Number of buckets.
    #[inline]
    pub fn window_size(&self) -> u64 {
        1u64 << self.wheel_bits
    }

    #[inline]
    pub fn stats(&self) -> QueueStats {
        self.stats
    }

    /// Pending events, wheel and overflow scheduler combined.
    pub fn len(&self) -> usize {
        self.arena.len() + self.far.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Events currently held by the overflow scheduler.
    pub fn far_len(&self) -> usize {
        self.far.len()
    }

    #[inline]
    fn bucket_index(&self, time: SimTime) -> usize {
        (time.ticks() & (self.window_size() - 1)) as usize
    }

    /// Schedule `event` to fire `delay` ticks from now.
    pub fn schedule(&mut self, mut event: EventBlock, delay: u64) -> KernelResult<()> {
        if event.is_linked() {
            return Err(KernelError::EventAlreadyLinked {
                target: event.target_time,
            });
        }
        let target = self.now.plus(delay).ok_or(KernelError::TimeOverflow {
            now: self.now,
            delay,
        })?;
        event.target_time = target;
        event.prev = ChainLink::Detached;

        let mask = word_mask(self.time_word_bits);
        let now_word = self.now.word(self.time_word_bits);
        let target_word = now_word.wrapping_add(delay) & mask;
        if delay > mask || target_word < now_word {
            let window = self.now.window_index(self.time_word_bits) + 1;
            log::debug!(
                "schedule: {} wraps the window at {}, handing off to window {}",
                target,
                self.now,
                window
            );
            self.stats.overflows += 1;
            self.far.schedule_far_future(event, window, target);
            return Ok(());
        }

        // The unit list owns its time until it drains, whatever the delay:
        // a zero delay issued while it still holds `now` must queue behind it.
        if let Some(unit) = self.unit.as_mut().filter(|u| u.time == target) {
            Self::append(&mut self.arena, unit, event);
            self.stats.unit_appends += 1;
            log::trace!("schedule: unit-delay append for {}", target);
            return Ok(());
        }

        if delay >= self.window_size() {
            let window = self.now.window_index(self.time_word_bits);
            log::trace!("schedule: {} is beyond the wheel span", target);
            self.stats.far_future += 1;
            self.far.schedule_far_future(event, window, target);
            return Ok(());
        }

        let bucket = self.bucket_index(target);
        if let Some(chain) = self.buckets[bucket].as_mut() {
            debug_assert_eq!(chain.time, target, "bucket {} holds two times", bucket);
            Self::append(&mut self.arena, chain, event);
            self.stats.bucket_appends += 1;
            log::trace!("schedule: bucket {} append for {}", bucket, target);
        } else {
            self.install(event, target, bucket);
        }
        Ok(())
    }

    /// Schedule at an absolute time, which must not be in the past.
    pub fn schedule_at(&mut self, event: EventBlock, at: SimTime) -> KernelResult<()> {
        let delay = at
            .duration_since(self.now)
            .ok_or(KernelError::TimeWentBackward {
                requested: at,
                current: self.now,
            })?;
        self.schedule(event, delay)
    }

    /// Schedule with a signed delay; negative delays are rejected.
    pub fn schedule_signed(&mut self, event: EventBlock, delay: i64) -> KernelResult<()> {
        let delay = u64::try_from(delay).map_err(|_| KernelError::NegativeDelay(delay))?;
        self.schedule(event, delay)
    }

    /// First event for an empty bucket. A first event for `now + 1` starts
    /// the unit-delay list instead, so later one-tick delays skip hashing.
    fn install(&mut self, event: EventBlock, target: SimTime, bucket: usize) {
        if self.unit.is_none() && self.now.plus(1) == Some(target) {
            self.unit = Some(Self::start_chain(&mut self.arena, target, event));
            self.stats.unit_installs += 1;
            log::trace!("schedule: unit-delay list started for {}", target);
        } else {
            debug_assert!(
                self.unit.map_or(true, |u| u.time != target),
                "unit list and bucket {} both hold {}",
                bucket,
                target
            );
            self.buckets[bucket] = Some(Self::start_chain(&mut self.arena, target, event));
            self.occupied.push(Reverse(target));
            self.stats.bucket_installs += 1;
            log::trace!("schedule: bucket {} installed for {}", bucket, target);
        }
    }

    fn start_chain(arena: &mut Slab<EventBlock>, time: SimTime, mut event: EventBlock) -> Chain {
        event.prev = ChainLink::Head;
        let key = EventKey::new(arena.insert(event));
        Chain {
            time,
            head: key,
            tail: key,
        }
    }

    fn append(arena: &mut Slab<EventBlock>, chain: &mut Chain, mut event: EventBlock) {
        event.prev = ChainLink::After(chain.tail);
        let key = EventKey::new(arena.insert(event));
        arena[chain.tail.slot()].next = Some(key);
        chain.tail = key;
    }

    fn pop_front(arena: &mut Slab<EventBlock>, chain: &mut Option<Chain>) -> Option<EventBlock> {
        let current = chain.as_mut()?;
        let event = arena.remove(current.head.slot());
        match event.next {
            Some(next) => {
                arena[next.slot()].prev = ChainLink::Head;
                current.head = next;
            }
            None => *chain = None,
        }
        Some(event)
    }

    fn next_source(&self) -> Option<(SimTime, Source)> {
        let candidates = [
            self.far.next_time().map(|t| (t, Source::Far)),
            self.occupied
                .peek()
                .map(|Reverse(t)| (*t, Source::Bucket(self.bucket_index(*t)))),
            self.unit.map(|c| (c.time, Source::Unit)),
        ];
        let mut best: Option<(SimTime, Source)> = None;
        for (time, source) in candidates.into_iter().flatten() {
            if best.map_or(true, |(t, _)| time < t) {
                best = Some((time, source));
            }
        }
        best
    }

    /// Time of the next event without removing it.
    pub fn peek_time(&self) -> Option<SimTime> {
        self.next_source().map(|(t, _)| t)
    }

    /// Pop the earliest event, FIFO within one target time, and move the
    /// clock to its time. Returns `None` when nothing is pending.
    pub fn pop_next(&mut self) -> Option<EventBlock> {
        let (time, source) = self.next_source()?;
        debug_assert!(time >= self.now, "pending event at {} behind {}", time, self.now);
        let mut event = match source {
            Source::Far => self.far.pop_due(time)?,
            Source::Bucket(idx) => {
                let event = Self::pop_front(&mut self.arena, &mut self.buckets[idx]);
                if self.buckets[idx].is_none() {
                    self.occupied.pop();
                }
                event?
            }
            Source::Unit => Self::pop_front(&mut self.arena, &mut self.unit)?,
        };
        self.now = time;
        event.detach();
        Some(event)
    }

    /// Move the clock forward without popping. Refuses to move backward
    /// or to jump over a pending event.
    pub fn advance_to(&mut self, time: SimTime) -> KernelResult<()> {
        if time < self.now {
            return Err(KernelError::TimeWentBackward {
                requested: time,
                current: self.now,
            });
        }
        if let Some(pending) = self.peek_time() {
            if pending < time {
                return Err(KernelError::PendingEventsSkipped {
                    requested: time,
                    pending,
                });
            }
        }
        self.now = time;
        Ok(())
    }

    /// Pop everything in order. Useful for tests and snapshots.
    pub fn drain_ordered(&mut self) -> Vec<EventBlock> {
        let mut events = Vec::with_capacity(self.len());
        while let Some(e) = self.pop_next() {
            events.push(e);
        }
        events
    }
}

impl std::fmt::Debug for FutureQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FutureQueue")
            .field("now", &self.now)
            .field("window_size", &self.window_size())
            .field("pending", &self.arena.len())
            .field("far_pending", &self.far.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
