use logicsim_kernel::{
    CallbackReason, ConsumerId, EventAction, EventBlock, FanoutRef, FanoutSlot, Kernel,
    KernelConfig, KernelResult, Logic, NbaGate, NullSink, RecordingSink, SimTime, Simulation,
    SimulationContext,
};

fn main() {
    env_logger::init();

    println!("═══════════════════════════════════════════════════════");
    println!("  logicsim-kernel: force/release and NBA commit demo");
    println!("═══════════════════════════════════════════════════════");
    println!();

    if let Err(e) = run() {
        eprintln!("  ✗ demo failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> KernelResult<()> {
    let config = KernelConfig::new()
        .with_override_callbacks(true)
        .with_trace(true);
    let mut kernel = Kernel::new(config)?;

    // q drives a flop output into two consumers; the second is wired later.
    let q = kernel.add_dynamic_net(
        Logic::X,
        FanoutRef::Resolved(ConsumerId::new(0)),
        FanoutRef::Unresolved,
        NbaGate::separate(Logic::X),
    )?;
    kernel.resolve_fanout(q, FanoutSlot::Secondary, ConsumerId::new(1))?;
    kernel.register_callback(
        q,
        Box::new(|reason: CallbackReason, reserved: [i32; 3]| {
            println!("    callback: {} args {:?}", reason, reserved);
        }),
    )?;

    let mut sink = RecordingSink::new();
    kernel.write(q, Logic::Zero, &mut sink)?;

    let mut sim = Simulation::new(kernel);
    sim.schedule(SimTime::new(10), EventAction::Marker(1))?;
    sim.schedule(SimTime::new(20), EventAction::Marker(2))?;
    sim.schedule(SimTime::new(30), EventAction::Marker(3))?;

    let processed = sim.run(&mut |ctx: &mut SimulationContext<'_>, event: &EventBlock| -> KernelResult<()> {
        match event.action() {
            EventAction::CommitNba(sig) => {
                println!("  T={:<3} commit {} = {}", ctx.now().ticks(), sig, ctx.kernel().nba_value(*sig)?);
            }
            EventAction::Marker(1) => {
                println!("  T={:<3} force {} to 1", ctx.now().ticks(), q);
                ctx.force(q, Logic::One, &mut NullSink)?;
            }
            EventAction::Marker(2) => {
                println!("  T={:<3} write {} = Z (held by force)", ctx.now().ticks(), q);
                ctx.write(q, Logic::Z, &mut NullSink)?;
            }
            EventAction::Marker(_) => {
                println!("  T={:<3} release {}", ctx.now().ticks(), q);
                ctx.release(q, &mut NullSink)?;
            }
        }
        Ok(())
    })?;

    println!();
    println!("  {} events, {} NBA commits, final time {}", processed, sim.nba_commits(), sim.current_time());
    println!("  Fanout trace:");
    for entry in sim.kernel().trace() {
        println!("    {}", entry);
    }
    println!();
    println!("  ✓ Demo complete.");
    Ok(())
}
