//! The kernel: owns every driver record, the future event queue and the
//! callback registry, and exposes the propagation entry points by signal id.

use crate::callback::{CallbackRegistry, OverrideCallback};
use crate::config::KernelConfig;
use crate::error::{KernelError, KernelResult};
use crate::event::{EventAction, EventBlock};
use crate::fanout::{DynamicFanout, FanoutRef, FanoutSink, FanoutSlot, StaticFanout};
use crate::id::{ConsumerId, SignalId};
use crate::millennium::FarFutureScheduler;
use crate::nba::{GateStorage, NbaGate};
use crate::propagate::{
    DriverState, DynamicDriver, PropagationContext, PropagationOutcome, Reason, SignalDriver,
    StaticDriver,
};
use crate::time::SimTime;
use crate::trace::{TraceEntry, TracingSink};
use crate::value::Logic;
use crate::wheel::FutureQueue;

/// Which elaboration family a net belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetFamily {
    Static,
    Dynamic,
}

/// One registered driver record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Net {
    Static(StaticDriver),
    Dynamic(DynamicDriver),
}

impl Net {
    pub fn family(&self) -> NetFamily {
        match self {
            Net::Static(_) => NetFamily::Static,
            Net::Dynamic(_) => NetFamily::Dynamic,
        }
    }

    pub fn driver(&self) -> &dyn SignalDriver {
        match self {
            Net::Static(d) => d,
            Net::Dynamic(d) => d,
        }
    }

    pub fn driver_mut(&mut self) -> &mut dyn SignalDriver {
        match self {
            Net::Static(d) => d,
            Net::Dynamic(d) => d,
        }
    }
}

/// The scheduling and propagation kernel.
#[derive(Debug)]
pub struct Kernel {
    config: KernelConfig,
    queue: FutureQueue,
    callbacks: CallbackRegistry,
    nets: Vec<Net>,
    trace: Vec<TraceEntry>,
}

impl Kernel {
    /// Create a kernel with the default overflow scheduler.
    pub fn new(config: KernelConfig) -> KernelResult<Self> {
        let queue = FutureQueue::new(&config)?;
        Ok(Self::assemble(config, queue))
    }

    /// Create a kernel that hands far-future events to `far`.
    pub fn with_far_scheduler(
        config: KernelConfig,
        far: Box<dyn FarFutureScheduler>,
    ) -> KernelResult<Self> {
        let queue = FutureQueue::with_far_scheduler(&config, far)?;
        Ok(Self::assemble(config, queue))
    }

    fn assemble(config: KernelConfig, queue: FutureQueue) -> Self {
        log::info!(
            "kernel: {} wheel buckets, {}-bit time word, override callbacks {}",
            config.window_size(),
            config.time_word_bits,
            if config.override_callbacks { "on" } else { "off" }
        );
        Kernel {
            callbacks: CallbackRegistry::new(config.override_callbacks),
            config,
            queue,
            nets: Vec::new(),
            trace: Vec::new(),
        }
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Current simulation time.
    #[inline]
    pub fn now(&self) -> SimTime {
        self.queue.now()
    }

    pub fn queue(&self) -> &FutureQueue {
        &self.queue
    }

    /// Direct queue access for the outer event loop.
    pub fn queue_mut(&mut self) -> &mut FutureQueue {
        &mut self.queue
    }

    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }

    pub fn callbacks_mut(&mut self) -> &mut CallbackRegistry {
        &mut self.callbacks
    }

    /// Schedule an arbitrary action `delay` ticks from now.
    pub fn schedule(&mut self, action: EventAction, delay: u64) -> KernelResult<()> {
        self.queue.schedule(EventBlock::new(action), delay)
    }

    // ── Elaboration ───────────────────────────────────────────

    /// Register a statically elaborated net.
    pub fn add_static_net(
        &mut self,
        init: Logic,
        target: FanoutRef,
        gate: NbaGate,
    ) -> KernelResult<SignalId> {
        self.push_net(Net::Static(DriverState::new(init, StaticFanout::new(target), gate)))
    }

    /// Register a dynamically elaborated net. Either reference may start
    /// unresolved and be filled in later with [`Kernel::resolve_fanout`].
    pub fn add_dynamic_net(
        &mut self,
        init: Logic,
        primary: FanoutRef,
        secondary: FanoutRef,
        gate: NbaGate,
    ) -> KernelResult<SignalId> {
        self.push_net(Net::Dynamic(DriverState::new(
            init,
            DynamicFanout::new(primary, secondary),
            gate,
        )))
    }

    /// Ids are dense `u32`s; registration fails once they run out.
    fn push_net(&mut self, net: Net) -> KernelResult<SignalId> {
        let raw = u32::try_from(self.nets.len())
            .map_err(|_| KernelError::SignalSpaceExhausted)?;
        let id = SignalId::new(raw);
        log::trace!("kernel: registered {:?} net {}", net.family(), id);
        self.nets.push(net);
        Ok(id)
    }

    pub fn net_count(&self) -> usize {
        self.nets.len()
    }

    pub fn net(&self, signal: SignalId) -> KernelResult<&Net> {
        self.nets
            .get(signal.index())
            .ok_or(KernelError::UnknownSignal(signal))
    }

    fn net_mut(&mut self, signal: SignalId) -> KernelResult<&mut Net> {
        self.nets
            .get_mut(signal.index())
            .ok_or(KernelError::UnknownSignal(signal))
    }

    /// Link one fanout reference to `consumer`.
    pub fn resolve_fanout(
        &mut self,
        signal: SignalId,
        slot: FanoutSlot,
        consumer: ConsumerId,
    ) -> KernelResult<()> {
        self.set_fanout(signal, slot, FanoutRef::Resolved(consumer))?;
        log::debug!("kernel: {} {} fanout resolved to {}", signal, slot.name(), consumer);
        Ok(())
    }

    /// Mark one fanout reference unresolved again (re-elaboration).
    pub fn unresolve_fanout(&mut self, signal: SignalId, slot: FanoutSlot) -> KernelResult<()> {
        self.set_fanout(signal, slot, FanoutRef::Unresolved)?;
        log::debug!("kernel: {} {} fanout unresolved", signal, slot.name());
        Ok(())
    }

    fn set_fanout(&mut self, signal: SignalId, slot: FanoutSlot, value: FanoutRef) -> KernelResult<()> {
        let target = self
            .net_mut(signal)?
            .driver_mut()
            .fanout_slot_mut(slot)
            .ok_or(KernelError::MissingFanoutSlot {
                signal,
                slot: slot.name(),
            })?;
        *target = value;
        Ok(())
    }

    pub fn fanout_slot(&self, signal: SignalId, slot: FanoutSlot) -> KernelResult<Option<FanoutRef>> {
        Ok(self.net(signal)?.driver().fanout_slot(slot))
    }

    /// Register the override callback for `signal`.
    pub fn register_callback(
        &mut self,
        signal: SignalId,
        callback: Box<dyn OverrideCallback>,
    ) -> KernelResult<()> {
        self.net(signal)?;
        self.callbacks.register(signal, callback);
        Ok(())
    }

    // ── Propagation ───────────────────────────────────────────

    fn drive<R>(
        &mut self,
        signal: SignalId,
        sink: &mut dyn FanoutSink,
        op: impl FnOnce(&mut dyn SignalDriver, &mut PropagationContext<'_>) -> KernelResult<R>,
    ) -> KernelResult<R> {
        let net = self
            .nets
            .get_mut(signal.index())
            .ok_or(KernelError::UnknownSignal(signal))?;
        let time = self.queue.now();
        let mut tracing;
        let sink: &mut dyn FanoutSink = if self.config.trace {
            tracing = TracingSink {
                inner: sink,
                entries: &mut self.trace,
                time,
                signal,
            };
            &mut tracing
        } else {
            sink
        };
        let mut ctx = PropagationContext {
            signal,
            queue: &mut self.queue,
            callbacks: &mut self.callbacks,
            sink,
            nba_delay: self.config.nba_delay,
        };
        op(net.driver_mut(), &mut ctx)
    }

    /// Core propagation with an explicit reason.
    pub fn propagate(
        &mut self,
        signal: SignalId,
        value: Logic,
        reason: Reason,
        sink: &mut dyn FanoutSink,
    ) -> KernelResult<PropagationOutcome> {
        self.drive(signal, sink, |d, ctx| d.propagate(ctx, value, reason))
    }

    /// Ordinary driver write.
    pub fn write(
        &mut self,
        signal: SignalId,
        value: Logic,
        sink: &mut dyn FanoutSink,
    ) -> KernelResult<PropagationOutcome> {
        self.drive(signal, sink, |d, ctx| d.write(ctx, value))
    }

    /// Force `signal` to `value` until released.
    pub fn force(
        &mut self,
        signal: SignalId,
        value: Logic,
        sink: &mut dyn FanoutSink,
    ) -> KernelResult<PropagationOutcome> {
        self.drive(signal, sink, |d, ctx| d.force(ctx, value))
    }

    /// Release a force; the last driven value propagates again.
    pub fn release(
        &mut self,
        signal: SignalId,
        sink: &mut dyn FanoutSink,
    ) -> KernelResult<PropagationOutcome> {
        self.drive(signal, sink, |d, ctx| d.release(ctx))
    }

    /// Write that yields to an active force.
    pub fn write_no_override(
        &mut self,
        signal: SignalId,
        value: Logic,
        sink: &mut dyn FanoutSink,
    ) -> KernelResult<PropagationOutcome> {
        self.drive(signal, sink, |d, ctx| d.write_no_override(ctx, value))
    }

    /// Materialize the staged NBA value of `signal`. Only the outer loop
    /// calls this, right after popping the gate's [`EventAction::CommitNba`]
    /// event, so a gate never has more than one commit in flight.
    pub(crate) fn commit_nba(&mut self, signal: SignalId) -> KernelResult<Logic> {
        let now = self.queue.now();
        let value = self.net_mut(signal)?.driver_mut().gate_mut().materialize();
        log::trace!("kernel: {} committed {} at {}", signal, value, now);
        Ok(value)
    }

    // ── Inspection ────────────────────────────────────────────

    pub fn driven_value(&self, signal: SignalId) -> KernelResult<Logic> {
        Ok(self.net(signal)?.driver().driven_value())
    }

    pub fn committed_value(&self, signal: SignalId) -> KernelResult<Logic> {
        Ok(self.net(signal)?.driver().committed_value())
    }

    pub fn is_forced(&self, signal: SignalId) -> KernelResult<bool> {
        Ok(self.net(signal)?.driver().is_forced())
    }

    /// The NBA value last made visible by a commit.
    pub fn nba_value(&self, signal: SignalId) -> KernelResult<Logic> {
        Ok(self.net(signal)?.driver().gate().visible())
    }

    pub fn gate(&self, signal: SignalId) -> KernelResult<&NbaGate> {
        Ok(self.net(signal)?.driver().gate())
    }

    /// Raw staging word of a packed gate: reference bits plus the staged
    /// value in the low two bits. `None` for a separate-value gate.
    pub fn staged_word(&self, signal: SignalId) -> KernelResult<Option<u64>> {
        Ok(match self.gate(signal)?.storage() {
            GateStorage::Packed(word) => Some(word),
            GateStorage::Separate(_) => None,
        })
    }

    /// Fanout notifications recorded while tracing was enabled.
    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    pub fn take_trace(&mut self) -> Vec<TraceEntry> {
        std::mem::take(&mut self.trace)
    }
}
