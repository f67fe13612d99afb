//! OS signal handling.
//!
//! # Responsibilities
//! - Register SIGINT and SIGTERM handlers (Ctrl+C elsewhere)
//! - Turn every delivery into a shutdown request
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Repeated signals are forwarded too; the coordinator drops duplicates

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::lifecycle::shutdown::{GracefulListener, ShutdownCoordinator, ShutdownOutcome};

/// Something that delivers named stop requests.
pub trait StopSource: Send + 'static {
    /// Next request, or `None` once no more can arrive.
    fn recv(&mut self) -> impl Future<Output = Option<&'static str>> + Send;
}

/// Registered process stop signals.
pub struct StopSignals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl StopSignals {
    /// Register the handlers. Must be called inside a Tokio runtime.
    #[cfg(unix)]
    pub fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(not(unix))]
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {})
    }
}

impl StopSource for StopSignals {
    #[cfg(unix)]
    async fn recv(&mut self) -> Option<&'static str> {
        tokio::select! {
            received = self.interrupt.recv() => received.map(|_| "SIGINT"),
            received = self.terminate.recv() => received.map(|_| "SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    async fn recv(&mut self) -> Option<&'static str> {
        tokio::signal::ctrl_c().await.ok().map(|_| "ctrl-c")
    }
}

impl StopSource for mpsc::UnboundedReceiver<&'static str> {
    async fn recv(&mut self) -> Option<&'static str> {
        mpsc::UnboundedReceiver::recv(self).await
    }
}

/// Forward every stop request to `coordinator` until the source is exhausted.
pub fn spawn_signal_handler<S, L>(
    mut source: S,
    coordinator: Arc<ShutdownCoordinator<L>>,
) -> JoinHandle<()>
where
    S: StopSource,
    L: GracefulListener + 'static,
{
    tokio::spawn(async move {
        while let Some(name) = source.recv().await {
            tracing::info!(signal = name, "Received signal");
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move {
                if coordinator.shutdown().await == ShutdownOutcome::AlreadyInProgress {
                    tracing::info!("Shutdown already in progress");
                }
            });
        }
    })
}
