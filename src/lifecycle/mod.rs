//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load bootstrap pair → store → agent → listener → coordinator
//!
//! Shutdown (shutdown.rs):
//!     stop request → fire agent stop → drain listener (bounded)
//!                  → wait agent done (bounded) → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → ShutdownCoordinator::shutdown (duplicates dropped)
//!
//! Triggers (trigger.rs):
//!     one-shot stop / done / complete signals
//! ```
//!
//! # Design Decisions
//! - Ordered startup: certificate first, listeners last
//! - Ordered shutdown: stop accepting before waiting on the agent
//! - Every shutdown wait has a deadline

pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod trigger;

pub use shutdown::{
    GracefulListener, ShutdownCoordinator, ShutdownOutcome, ShutdownReport, ShutdownTimeouts,
    StageOutcome,
};
pub use trigger::{Trigger, TriggerListener};
