//! Certificate reload agent.
//!
//! # Data Flow
//! ```text
//! notify watcher (cert + key directories)
//!     → watch.rs (event feed, error feed)
//!     → runner.rs select loop ◀── periodic expiry tick
//!         → debounce.rs (drop bursts after a success)   ◀── stop signal
//!         → CertificatePair::load
//!         → state.rs (previous ← current ← new)
//!         → CertificateStore::publish
//! ```
//!
//! # Design Decisions
//! - One task owns the watcher, timer and state; nothing here needs a lock
//! - Reload failures are logged and the previous pair stays in service
//! - Fallback tick only reloads when the current leaf is close to expiry
//! - `tokio::select!` polls branches in random order, so no source starves

pub mod debounce;
pub mod runner;
pub mod state;
pub mod watch;

pub use runner::{AgentExit, AgentOutcome, AgentSettings, ReloadAgent};
pub use state::{AgentState, ReloadStats};
pub use watch::{WatchEvents, WatchTargets};
