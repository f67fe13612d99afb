//! Minimum spacing between successful file-triggered reloads.

use std::time::Duration;
use tokio::time::Instant;

/// Gate that drops file events arriving too soon after a successful reload.
///
/// Only successes move the gate; a failed reload leaves it open so the next
/// event of the same edit (e.g. the key write following the cert write)
/// retries immediately.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last_success: Option<Instant>,
}

impl Debouncer {
    /// A zero window admits every event.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_success: None,
        }
    }

    pub fn admits(&self, now: Instant) -> bool {
        match self.last_success {
            Some(last) => now.saturating_duration_since(last) >= self.window,
            None => true,
        }
    }

    pub fn record_success(&mut self, at: Instant) {
        self.last_success = Some(at);
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}
