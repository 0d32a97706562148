//! # logicsim-kernel: event scheduling and signal propagation
//!
//! The inner kernel of a compiled four-state logic simulator. A time wheel
//! orders future events, a propagator decides whether a new signal value
//! is a real change and fans it out, force/release overrides are reported
//! to a debugger-style callback layer, and non-blocking assignments are
//! staged until their commit event fires. Single-threaded and synchronous.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │               Simulation                  │ ← outer loop, NBA commits
//! │  ┌────────────────────────────────────┐  │
//! │  │              Kernel                 │  │ ← driver records by SignalId
//! │  │  ┌──────────────┐ ┌─────────────┐  │  │
//! │  │  │  Propagator  │→│   Fanout    │  │  │ ← change detect + dispatch
//! │  │  └──────┬───────┘ └─────────────┘  │  │
//! │  │         │  ┌─────────────────────┐ │  │
//! │  │         ├─→│ Callback registry   │ │  │ ← forced(29) / released(30)
//! │  │         ↓  └─────────────────────┘ │  │
//! │  │  ┌──────────────┐                  │  │
//! │  │  │   NBA gate   │                  │  │ ← staged until commit
//! │  │  └──────┬───────┘                  │  │
//! │  │         ↓                          │  │
//! │  │  ┌──────────────┐ ┌─────────────┐  │  │
//! │  │  │ FutureQueue  │→│ Millennium  │  │  │ ← wheel + far-future store
//! │  │  └──────────────┘ └─────────────┘  │  │
//! │  └────────────────────────────────────┘  │
//! └──────────────────────────────────────────┘
//! ```

pub mod callback;
pub mod config;
pub mod error;
pub mod event;
pub mod fanout;
pub mod id;
pub mod kernel;
pub mod millennium;
pub mod nba;
pub mod propagate;
pub mod simulation;
pub mod time;
pub mod trace;
pub mod value;
pub mod wheel;


// Re-exports for convenience.
pub use callback::{CallbackOutcome, CallbackReason, CallbackRegistry, OverrideCallback, RESERVED_ARGS};
pub use config::KernelConfig;
pub use error::{KernelError, KernelResult};
pub use event::{EventAction, EventBlock, EventKey};
pub use fanout::{
    DispatchOutcome, DynamicFanout, FanoutRef, FanoutShape, FanoutSink, FanoutSlot, NullSink,
    RecordingSink, StaticFanout,
};
pub use id::{ConsumerId, SignalId};
pub use kernel::{Kernel, Net, NetFamily};
pub use millennium::{FarFutureScheduler, MillenniumQueue};
pub use nba::{GateStorage, NbaGate};
pub use propagate::{PropagationOutcome, Reason, SignalDriver};
pub use simulation::{EventHandler, Simulation, SimulationContext};
pub use time::SimTime;
pub use trace::TraceEntry;
pub use value::Logic;
pub use wheel::{FutureQueue, QueueStats};
