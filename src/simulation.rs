/// Outer event loop.
///
/// Pops events from the kernel's future queue in time order, commits NBA
/// gates when their commit event fires, and hands every event to a
/// user-supplied handler. Purely synchronous and single-threaded: a
/// staged value takes effect only when this loop reaches its commit event.

use crate::error::KernelResult;
use crate::event::{EventAction, EventBlock};
use crate::fanout::FanoutSink;
use crate::id::SignalId;
use crate::kernel::Kernel;
use crate::propagate::PropagationOutcome;
use crate::time::SimTime;
use crate::value::Logic;

// ── Handler trait ─────────────────────────────────────────────────────

/// User-defined event handler.
///
/// Called for every dispatched event, after the kernel has applied any
/// NBA commit the event carries.
pub trait EventHandler {
    fn handle(&mut self, ctx: &mut SimulationContext<'_>, event: &EventBlock) -> KernelResult<()>;
}

/// A handler backed by a closure, handy in tests and testbenches.
impl<F> EventHandler for F
where
    F: FnMut(&mut SimulationContext<'_>, &EventBlock) -> KernelResult<()>,
{
    fn handle(&mut self, ctx: &mut SimulationContext<'_>, event: &EventBlock) -> KernelResult<()> {
        (self)(ctx, event)
    }
}

// ── Simulation Context ───────────────────────────────────────────────

/// Mutable context passed to the handler on every event dispatch.
pub struct SimulationContext<'a> {
    pub(crate) kernel: &'a mut Kernel,
}

impl<'a> SimulationContext<'a> {
    /// Current simulation time.
    #[inline]
    pub fn now(&self) -> SimTime {
        self.kernel.now()
    }

    pub fn kernel(&self) -> &Kernel {
        self.kernel
    }

    pub fn kernel_mut(&mut self) -> &mut Kernel {
        self.kernel
    }

    /// Schedule a follow-up action `delay` ticks from now.
    pub fn schedule_after(&mut self, delay: u64, action: EventAction) -> KernelResult<()> {
        self.kernel.schedule(action, delay)
    }

    pub fn write(
        &mut self,
        signal: SignalId,
        value: Logic,
        sink: &mut dyn FanoutSink,
    ) -> KernelResult<PropagationOutcome> {
        self.kernel.write(signal, value, sink)
    }

    pub fn force(
        &mut self,
        signal: SignalId,
        value: Logic,
        sink: &mut dyn FanoutSink,
    ) -> KernelResult<PropagationOutcome> {
        self.kernel.force(signal, value, sink)
    }

    pub fn release(
        &mut self,
        signal: SignalId,
        sink: &mut dyn FanoutSink,
    ) -> KernelResult<PropagationOutcome> {
        self.kernel.release(signal, sink)
    }

    pub fn write_no_override(
        &mut self,
        signal: SignalId,
        value: Logic,
        sink: &mut dyn FanoutSink,
    ) -> KernelResult<PropagationOutcome> {
        self.kernel.write_no_override(signal, value, sink)
    }
}

// ── Simulation ────────────────────────────────────────────────────────

/// Top-level simulation driver.
///
/// Owns the kernel. Call `run` to execute until the queue is drained,
/// `run_until` to stop at a time, or `step` to advance by one event.
#[derive(Debug)]
pub struct Simulation {
    kernel: Kernel,
    events_processed: u64,
    nba_commits: u64,
}

impl Simulation {
    pub fn new(kernel: Kernel) -> Self {
        Simulation {
            kernel,
            events_processed: 0,
            nba_commits: 0,
        }
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    pub fn kernel_mut(&mut self) -> &mut Kernel {
        &mut self.kernel
    }

    pub fn into_kernel(self) -> Kernel {
        self.kernel
    }

    /// Current simulation time.
    pub fn current_time(&self) -> SimTime {
        self.kernel.now()
    }

    /// Total events processed so far.
    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    /// NBA commit events applied so far.
    pub fn nba_commits(&self) -> u64 {
        self.nba_commits
    }

    /// Schedule an action at an absolute time.
    pub fn schedule(&mut self, at: SimTime, action: EventAction) -> KernelResult<()> {
        self.kernel.queue_mut().schedule_at(EventBlock::new(action), at)
    }

    /// Execute a single step: pop one event, advance time, commit, dispatch.
    ///
    /// Returns `Some(event)` if an event was processed, `None` if the
    /// queue is empty.
    pub fn step(&mut self, handler: &mut dyn EventHandler) -> KernelResult<Option<EventBlock>> {
        let Some(event) = self.kernel.queue_mut().pop_next() else {
            return Ok(None);
        };
        self.events_processed += 1;

        if let EventAction::CommitNba(signal) = event.action() {
            self.kernel.commit_nba(*signal)?;
            self.nba_commits += 1;
        }

        let mut ctx = SimulationContext {
            kernel: &mut self.kernel,
        };
        handler.handle(&mut ctx, &event)?;

        Ok(Some(event))
    }

    /// Run until the event queue is empty.
    ///
    /// Returns the number of events processed during this run.
    pub fn run(&mut self, handler: &mut dyn EventHandler) -> KernelResult<u64> {
        let start = self.events_processed;
        while self.step(handler)?.is_some() {}
        Ok(self.events_processed - start)
    }

    /// Run until the queue is empty **or** `max_steps` events have been
    /// dispatched, whichever comes first.
    pub fn run_for(&mut self, max_steps: u64, handler: &mut dyn EventHandler) -> KernelResult<u64> {
        let start = self.events_processed;
        let mut steps = 0u64;
        while steps < max_steps {
            if self.step(handler)?.is_none() {
                break;
            }
            steps += 1;
        }
        Ok(self.events_processed - start)
    }

    /// Process every event due at or before `time`, then move the clock
    /// to `time`.
    pub fn run_until(&mut self, time: SimTime, handler: &mut dyn EventHandler) -> KernelResult<u64> {
        let start = self.events_processed;
        while self
            .kernel
            .queue()
            .peek_time()
            .is_some_and(|next| next <= time)
        {
            self.step(handler)?;
        }
        self.kernel.queue_mut().advance_to(time)?;
        Ok(self.events_processed - start)
    }

    /// Returns `true` if there are no more events to process.
    pub fn is_finished(&self) -> bool {
        self.kernel.queue().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::fanout::{FanoutRef, RecordingSink};
    use crate::id::ConsumerId;
    use crate::nba::NbaGate;

    fn kernel() -> Kernel {
        Kernel::new(KernelConfig::default()).unwrap()
    }

    fn noop(_ctx: &mut SimulationContext<'_>, _event: &EventBlock) -> KernelResult<()> {
        Ok(())
    }

    #[test]
    fn test_basic_execution_loop() {
        let mut sim = Simulation::new(kernel());
        sim.schedule(SimTime::new(10), EventAction::Marker(1)).unwrap();
        sim.schedule(SimTime::new(20), EventAction::Marker(2)).unwrap();
        sim.schedule(SimTime::new(30), EventAction::Marker(3)).unwrap();

        let mut log: Vec<u64> = Vec::new();
        let processed = sim
            .run(&mut |_ctx: &mut SimulationContext<'_>, event: &EventBlock| -> KernelResult<()> {
                if let EventAction::Marker(tag) = event.action() {
                    log.push(*tag);
                }
                Ok(())
            })
            .unwrap();

        assert_eq!(processed, 3);
        assert_eq!(log, vec![1, 2, 3]);
        assert_eq!(sim.current_time(), SimTime::new(30));
    }

    #[test]
    fn test_handler_schedules_followup() {
        let mut sim = Simulation::new(kernel());
        sim.schedule(SimTime::ZERO, EventAction::Marker(0)).unwrap();

        let mut times: Vec<u64> = Vec::new();
        sim.run(&mut |ctx: &mut SimulationContext<'_>, _event: &EventBlock| -> KernelResult<()> {
            times.push(ctx.now().ticks());
            if ctx.now().ticks() < 30 {
                ctx.schedule_after(10, EventAction::Marker(1))?;
            }
            Ok(())
        })
        .unwrap();

        assert_eq!(times, vec![0, 10, 20, 30]);
    }

    #[test]
    fn test_step_by_step() {
        let mut sim = Simulation::new(kernel());
        sim.schedule(SimTime::new(5), EventAction::Marker(0)).unwrap();
        sim.schedule(SimTime::new(15), EventAction::Marker(1)).unwrap();

        let first = sim.step(&mut noop).unwrap().unwrap();
        assert_eq!(first.target_time(), SimTime::new(5));
        assert_eq!(sim.current_time(), SimTime::new(5));

        let second = sim.step(&mut noop).unwrap().unwrap();
        assert_eq!(second.target_time(), SimTime::new(15));

        assert!(sim.step(&mut noop).unwrap().is_none());
        assert!(sim.is_finished());
    }

    #[test]
    fn test_run_for_limits_steps() {
        let mut sim = Simulation::new(kernel());
        for i in 0..100 {
            sim.schedule(SimTime::new(i), EventAction::Marker(i)).unwrap();
        }
        let processed = sim.run_for(10, &mut noop).unwrap();
        assert_eq!(processed, 10);
        assert_eq!(sim.events_processed(), 10);
        assert!(!sim.is_finished());
    }

    #[test]
    fn test_run_until_stops_and_advances() {
        let mut sim = Simulation::new(kernel());
        sim.schedule(SimTime::new(4), EventAction::Marker(0)).unwrap();
        sim.schedule(SimTime::new(9), EventAction::Marker(1)).unwrap();

        assert_eq!(sim.run_until(SimTime::new(7), &mut noop).unwrap(), 1);
        assert_eq!(sim.current_time(), SimTime::new(7));
        assert_eq!(sim.run_until(SimTime::new(9), &mut noop).unwrap(), 1);
        assert!(sim.is_finished());
    }

    #[test]
    fn test_nba_commit_applied_before_handler() {
        let mut k = kernel();
        let s = k.add_static_net(
            Logic::Zero,
            FanoutRef::Resolved(ConsumerId::new(0)),
            NbaGate::separate(Logic::Zero),
        ).unwrap();
        let mut sink = RecordingSink::new();
        k.write(s, Logic::One, &mut sink).unwrap();

        let mut sim = Simulation::new(k);
        let mut seen = Vec::new();
        sim.run(&mut |ctx: &mut SimulationContext<'_>, event: &EventBlock| -> KernelResult<()> {
            if let EventAction::CommitNba(sig) = event.action() {
                seen.push((ctx.now().ticks(), ctx.kernel().nba_value(*sig)?));
            }
            Ok(())
        })
        .unwrap();

        assert_eq!(seen, vec![(1, Logic::One)]);
        assert_eq!(sim.nba_commits(), 1);
    }

    #[test]
    fn test_time_monotonicity() {
        let mut sim = Simulation::new(kernel());
        for t in [100u64, 50, 75, 10, 5_000, 1] {
            sim.schedule(SimTime::new(t), EventAction::Marker(t)).unwrap();
        }
        let mut times: Vec<u64> = Vec::new();
        sim.run(&mut |ctx: &mut SimulationContext<'_>, _event: &EventBlock| -> KernelResult<()> {
            times.push(ctx.now().ticks());
            Ok(())
        })
        .unwrap();
        assert_eq!(times, vec![1, 10, 50, 75, 100, 5_000]);
    }
}
