//! State owned by the reload agent task.

use std::sync::Arc;
use tokio::time::Instant;

use crate::tls::CertificatePair;

/// Counters describing what the agent did over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReloadStats {
    /// Reloads attempted from any trigger.
    pub attempts: u64,
    /// Attempts that published a new pair.
    pub successes: u64,
    /// Attempts that kept the previous pair.
    pub failures: u64,
    /// File events dropped by the debounce window.
    pub debounced: u64,
    /// Attempts started by the periodic expiry check.
    pub fallback_attempts: u64,
}

/// Agent-local view of the certificate. Not shared across tasks.
#[derive(Debug)]
pub struct AgentState {
    pub current: Arc<CertificatePair>,
    /// Pair replaced by the last successful reload, kept for inspection only.
    pub previous: Option<Arc<CertificatePair>>,
    /// When the loop last finished handling an event.
    pub last_run: Option<Instant>,
    pub stats: ReloadStats,
}

impl AgentState {
    pub fn new(bootstrap: Arc<CertificatePair>) -> Self {
        Self {
            current: bootstrap,
            previous: None,
            last_run: None,
            stats: ReloadStats::default(),
        }
    }

    /// Make `next` current, remembering the pair it replaces.
    pub fn advance(&mut self, next: Arc<CertificatePair>) {
        let replaced = std::mem::replace(&mut self.current, next);
        self.previous = Some(replaced);
    }
}
