//! Startup orchestration.
//!
//! # Responsibilities
//! - Load the bootstrap certificate
//! - Initialize subsystems in dependency order
//! - Start the reload agent, then the listener
//! - Park until the shutdown sequence has finished
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal, including a listener that
//!   cannot bind
//! - Listener starts last (traffic only when the store is ready)
//! - A listener that dies on its own still triggers the shutdown sequence,
//!   so the agent is stopped before the error is returned

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinHandle;

use crate::agent::{AgentSettings, ReloadAgent};
use crate::config::Config;
use crate::http::{ServerError, ServerHandle, TlsServer};
use crate::lifecycle::shutdown::{ShutdownCoordinator, ShutdownTimeouts};
use crate::lifecycle::signals::{spawn_signal_handler, StopSignals};
use crate::lifecycle::trigger::{Trigger, TriggerListener};
use crate::observability::metrics;
use crate::tls::pair::unix_seconds;
use crate::tls::{CertificateError, CertificatePair, CertificateStore};

/// Errors that prevent the agent from starting or keep it from serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to load bootstrap certificate: {0}")]
    Certificate(#[from] CertificateError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to install signal handlers: {0}")]
    Signals(#[source] std::io::Error),

    #[error("listener stopped without a shutdown request: {0}")]
    Listener(String),
}

/// A started agent: store, listener, reload agent and coordinator.
pub struct Running {
    store: Arc<CertificateStore>,
    server: ServerHandle,
    coordinator: Arc<ShutdownCoordinator<ServerHandle>>,
    agent_done: TriggerListener,
    signal_handler: Option<JoinHandle<()>>,
}

/// Bring every subsystem up in order and return without waiting.
pub async fn start(config: &Config) -> Result<Running, StartupError> {
    let bootstrap =
        CertificatePair::load(&config.tls.cert_path, &config.tls.key_path).await?;
    let not_after = unix_seconds(bootstrap.validity().not_after);
    tracing::info!(
        cert = %config.tls.cert_path,
        not_after,
        "Bootstrap certificate loaded"
    );

    if config.features.metrics_collection {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }
    metrics::record_certificate_expiry(not_after);

    let store = Arc::new(CertificateStore::new(Arc::new(bootstrap)));

    let agent_stop = Trigger::new();
    let agent_done = Trigger::new();
    if config.features.certificate_watcher {
        ReloadAgent::new(AgentSettings::from_config(config), Arc::clone(&store))
            .spawn(agent_stop.listener(), agent_done.clone());
    } else {
        agent_done.fire();
        tracing::info!("Certificate watcher agent disabled");
    }

    let server = TlsServer::from_config(config, Arc::clone(&store))?.start();

    let coordinator = Arc::new(ShutdownCoordinator::new(
        server.clone(),
        agent_stop,
        agent_done.listener(),
        ShutdownTimeouts::from(&config.timings),
    ));

    let signal_handler = if config.features.graceful_shutdown {
        let signals = StopSignals::install().map_err(StartupError::Signals)?;
        tracing::info!("Press Ctrl+C to gracefully shutdown");
        Some(spawn_signal_handler(signals, Arc::clone(&coordinator)))
    } else {
        tracing::info!("Graceful shutdown feature disabled");
        None
    };

    Ok(Running {
        store,
        server,
        coordinator,
        agent_done: agent_done.listener(),
        signal_handler,
    })
}

impl Running {
    pub fn store(&self) -> &Arc<CertificateStore> {
        &self.store
    }

    /// Address the listener bound, `None` if binding failed.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.server.local_addr().await
    }

    pub fn coordinator(&self) -> &Arc<ShutdownCoordinator<ServerHandle>> {
        &self.coordinator
    }

    /// Fires once the reload agent has ended (immediately when disabled).
    pub fn agent_done(&self) -> TriggerListener {
        self.agent_done.clone()
    }

    /// True when stop signals are forwarded to the coordinator.
    pub fn handles_signals(&self) -> bool {
        self.signal_handler.is_some()
    }

    /// Park until shutdown has finished.
    ///
    /// A listener that exits without a shutdown request still runs the
    /// shutdown sequence, then reports [`StartupError::Listener`].
    pub async fn wait(self) -> Result<(), StartupError> {
        let mut complete = self.coordinator.completion();
        let mut exited = self.server.exited();

        let unrequested = tokio::select! {
            _ = complete.fired() => false,
            _ = exited.fired() => {
                let unrequested = !self.coordinator.is_started();
                if unrequested {
                    tracing::warn!("Listener stopped without a shutdown request, shutting down");
                }
                self.coordinator.shutdown().await;
                complete.fired().await;
                unrequested
            }
        };

        if let Some(handler) = self.signal_handler {
            handler.abort();
        }

        if unrequested {
            let reason = self
                .server
                .failure()
                .unwrap_or_else(|| "accept loop ended".to_string());
            return Err(StartupError::Listener(reason));
        }

        tracing::info!("TLS Agent shutdown complete");
        Ok(())
    }
}

/// Run the TLS agent until it has shut down.
pub async fn run(config: Config) -> Result<(), StartupError> {
    start(&config).await?.wait().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::shutdown::{ShutdownOutcome, ShutdownReport, StageOutcome};
    use crate::testdata;
    use std::path::Path;
    use std::time::Duration;

    fn config_for(cert: &Path, key: &Path, bind: &str) -> Config {
        let mut config = Config::default();
        config.listener.bind_address = bind.to_string();
        config.tls.cert_path = cert.display().to_string();
        config.tls.key_path = key.display().to_string();
        config.features.graceful_shutdown = false;
        config.timings.shutdown_timeout_secs = 2;
        config.timings.agent_shutdown_timeout_secs = 2;
        config
    }

    fn clean_report() -> ShutdownOutcome {
        ShutdownOutcome::Completed(ShutdownReport {
            listener: StageOutcome::Completed,
            agent: StageOutcome::Completed,
        })
    }

    #[tokio::test]
    async fn watcher_disabled_keeps_bootstrap() {
        let dir = tempfile::tempdir().unwrap();
        let (cert, key) = testdata::write_pair(dir.path(), &testdata::generate());
        let mut config = config_for(&cert, &key, "127.0.0.1:0");
        config.features.certificate_watcher = false;

        let running = start(&config).await.unwrap();
        assert!(running.agent_done().is_fired());
        assert!(!running.handles_signals());
        assert!(running.local_addr().await.is_some());

        let bootstrap = running.store().lookup();
        testdata::write_pair(dir.path(), &testdata::generate());
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(Arc::ptr_eq(&running.store().lookup(), &bootstrap));

        assert_eq!(running.coordinator().shutdown().await, clean_report());
        running.wait().await.unwrap();
    }

    #[tokio::test]
    async fn watcher_enabled_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let (cert, key) = testdata::write_pair(dir.path(), &testdata::generate());
        let config = config_for(&cert, &key, "127.0.0.1:0");

        let running = start(&config).await.unwrap();
        assert!(running.local_addr().await.is_some());
        assert!(!running.agent_done().is_fired());

        assert_eq!(running.coordinator().shutdown().await, clean_report());
        assert!(running.agent_done().is_fired());
        running.wait().await.unwrap();
    }

    #[tokio::test]
    async fn graceful_shutdown_installs_handler() {
        let dir = tempfile::tempdir().unwrap();
        let (cert, key) = testdata::write_pair(dir.path(), &testdata::generate());
        let mut config = config_for(&cert, &key, "127.0.0.1:0");
        config.features.graceful_shutdown = true;
        config.features.certificate_watcher = false;

        let running = start(&config).await.unwrap();
        assert!(running.handles_signals());

        running.coordinator().shutdown().await;
        running.wait().await.unwrap();
    }

    #[tokio::test]
    async fn occupied_port_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let (cert, key) = testdata::write_pair(dir.path(), &testdata::generate());
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = taken.local_addr().unwrap().to_string();
        let config = config_for(&cert, &key, &addr);

        let result = tokio::time::timeout(Duration::from_secs(10), run(config))
            .await
            .unwrap();
        assert!(matches!(result, Err(StartupError::Listener(_))));
        drop(taken);
    }

    #[tokio::test]
    async fn missing_bootstrap_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(
            &dir.path().join("absent.crt"),
            &dir.path().join("absent.key"),
            "127.0.0.1:0",
        );
        assert!(matches!(
            start(&config).await,
            Err(StartupError::Certificate(_))
        ));
    }
}
