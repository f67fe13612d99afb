//! Shutdown coordination for the listener and the reload agent.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time;

use crate::config::Timings;
use crate::lifecycle::trigger::{Trigger, TriggerListener};
use crate::observability::metrics;

/// A network listener that can stop accepting and drain in-flight requests.
pub trait GracefulListener: Send + Sync {
    /// Stop accepting, give in-flight requests up to `grace`, then resolve.
    fn shutdown(&self, grace: Duration) -> impl Future<Output = std::io::Result<()>> + Send;
}

/// Deadlines for the two shutdown stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownTimeouts {
    pub listener: Duration,
    pub agent: Duration,
}

impl From<&Timings> for ShutdownTimeouts {
    fn from(timings: &Timings) -> Self {
        Self {
            listener: timings.shutdown_timeout(),
            agent: timings.agent_shutdown_timeout(),
        }
    }
}

/// How a single shutdown stage ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Completed,
    TimedOut,
    Failed,
}

impl StageOutcome {
    fn as_str(self) -> &'static str {
        match self {
            StageOutcome::Completed => "completed",
            StageOutcome::TimedOut => "timed_out",
            StageOutcome::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    pub listener: StageOutcome,
    pub agent: StageOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// This call ran the sequence.
    Completed(ShutdownReport),
    /// Another call already started it; nothing was done.
    AlreadyInProgress,
}

/// Drain time handed to the listener: a tenth of the deadline is kept back
/// so a drain that uses its whole grace still finishes before the deadline.
pub fn listener_grace(deadline: Duration) -> Duration {
    deadline.saturating_sub(deadline / 10)
}

/// Runs the two-stage shutdown exactly once.
///
/// 1. fire the agent stop signal
/// 2. drain the listener, bounded by `timeouts.listener`
/// 3. wait for the agent done signal, bounded by `timeouts.agent`
///
/// Every wait has a ceiling; a stage that overruns is logged and skipped past.
pub struct ShutdownCoordinator<L> {
    listener: L,
    agent_stop: Trigger,
    agent_done: TriggerListener,
    timeouts: ShutdownTimeouts,
    started: AtomicBool,
    complete: Trigger,
}

impl<L: GracefulListener> ShutdownCoordinator<L> {
    pub fn new(
        listener: L,
        agent_stop: Trigger,
        agent_done: TriggerListener,
        timeouts: ShutdownTimeouts,
    ) -> Self {
        Self {
            listener,
            agent_stop,
            agent_done,
            timeouts,
            started: AtomicBool::new(false),
            complete: Trigger::new(),
        }
    }

    /// Run the shutdown sequence. Repeated or racing calls are no-ops.
    pub async fn shutdown(&self) -> ShutdownOutcome {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Shutdown already in progress, ignoring request");
            return ShutdownOutcome::AlreadyInProgress;
        }

        tracing::info!("Initiating graceful shutdown");
        self.agent_stop.fire();

        let listener = self.stop_listener().await;
        metrics::record_shutdown_stage("listener", listener.as_str());

        let agent = self.await_agent().await;
        metrics::record_shutdown_stage("agent", agent.as_str());

        let report = ShutdownReport { listener, agent };
        tracing::info!(listener = ?listener, agent = ?agent, "Shutdown sequence finished");
        self.complete.fire();
        ShutdownOutcome::Completed(report)
    }

    async fn stop_listener(&self) -> StageOutcome {
        let deadline = self.timeouts.listener;
        match time::timeout(deadline, self.listener.shutdown(listener_grace(deadline))).await {
            Ok(Ok(())) => {
                tracing::info!("Server shutdown complete");
                StageOutcome::Completed
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Server shutdown error");
                StageOutcome::Failed
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = deadline.as_millis() as u64,
                    "Server shutdown timed out, continuing"
                );
                StageOutcome::TimedOut
            }
        }
    }

    async fn await_agent(&self) -> StageOutcome {
        let mut done = self.agent_done.clone();
        if done.is_fired() {
            return StageOutcome::Completed;
        }

        tracing::info!("Waiting for certificate watcher agent to stop");
        match time::timeout(self.timeouts.agent, done.fired()).await {
            Ok(()) => {
                tracing::info!("Agent stopped gracefully");
                StageOutcome::Completed
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.timeouts.agent.as_millis() as u64,
                    "Agent stop timed out, continuing anyway"
                );
                StageOutcome::TimedOut
            }
        }
    }

    /// True once any caller has started the sequence.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Resolves when the sequence has finished.
    pub fn completion(&self) -> TriggerListener {
        self.complete.listener()
    }
}
