//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Register cleanup actions → Seed data (best effort) → Bind listener
//!     → Spawn shutdown sequencer → Wait for completion
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain (shutdown timeout)
//!     → Run cleanup actions (cleanup timeout) → Completion
//!
//! Signals (signals.rs):
//!     SIGINT/SIGTERM/SIGHUP or a synthetic trigger → one shutdown sequence
//! ```
//!
//! # Design Decisions
//! - Signal sources are armed before the listener starts serving
//! - Phases are strictly ordered: Running → ShuttingDown → CleaningUp → Done
//! - Drain and cleanup each get their own deadline

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{
    Completion, DrainTimeoutPolicy, Phase, ShutdownBudgets, ShutdownError, ShutdownReport,
    ShutdownSequencer,
};
pub use signals::{manual, ManualSignals, OsSignals, ShutdownSignal, ShutdownTrigger, SignalSource};
pub use startup::{Bootstrap, BootstrapError, DataSeeder};
