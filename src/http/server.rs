//! HTTPS server setup.
//!
//! # Responsibilities
//! - Create the Axum router (banner, optional health endpoint)
//! - Serve it over rustls with the certificate store as resolver
//! - Expose a handle for graceful drain during shutdown

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::{routing::get, Router};
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use thiserror::Error;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::http::health;
use crate::lifecycle::shutdown::GracefulListener;
use crate::lifecycle::trigger::{FireOnDrop, Trigger, TriggerListener};
use crate::tls::{server_config, CertificateStore};

/// Errors building the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("failed to build TLS configuration: {0}")]
    Tls(#[from] rustls::Error),
}

/// HTTPS server whose certificate comes from a [`CertificateStore`].
pub struct TlsServer {
    addr: SocketAddr,
    router: Router,
    tls: RustlsConfig,
}

impl TlsServer {
    pub fn new(
        addr: SocketAddr,
        store: Arc<CertificateStore>,
        health_check: bool,
    ) -> Result<Self, ServerError> {
        let tls = RustlsConfig::from_config(Arc::new(server_config(Arc::clone(&store))?));
        Ok(Self {
            addr,
            router: Self::build_router(store, health_check),
            tls,
        })
    }

    pub fn from_config(config: &Config, store: Arc<CertificateStore>) -> Result<Self, ServerError> {
        let addr = config
            .listener
            .bind_address
            .parse()
            .map_err(|_| ServerError::BindAddress(config.listener.bind_address.clone()))?;
        Self::new(addr, store, config.features.health_check)
    }

    fn build_router(store: Arc<CertificateStore>, health_check: bool) -> Router {
        let mut router = Router::new().route("/", get(index));
        if health_check {
            router = router.route("/healthz", get(health::healthz));
        }
        router.with_state(store).layer(TraceLayer::new_for_http())
    }

    /// Spawn the accept loop and return its handle.
    pub fn start(self) -> ServerHandle {
        let handle = Handle::new();
        let exited = Trigger::new();
        let failure = Arc::new(OnceLock::new());

        let server_handle = ServerHandle {
            handle: handle.clone(),
            exited: exited.clone(),
            failure: Arc::clone(&failure),
        };

        tokio::spawn(async move {
            let _exited = FireOnDrop(exited);
            tracing::info!(address = %self.addr, "HTTPS server starting");

            let result = axum_server::bind_rustls(self.addr, self.tls)
                .handle(handle)
                .serve(self.router.into_make_service())
                .await;

            match result {
                Ok(()) => tracing::info!("HTTPS server stopped"),
                Err(e) => {
                    tracing::error!(error = %e, "HTTPS server error");
                    let _ = failure.set(e.to_string());
                }
            }
        });

        server_handle
    }
}

async fn index() -> &'static str {
    "TLS Agent\n"
}

/// Control handle for a running [`TlsServer`].
#[derive(Clone)]
pub struct ServerHandle {
    handle: Handle,
    exited: Trigger,
    failure: Arc<OnceLock<String>>,
}

impl ServerHandle {
    /// Address actually bound, once listening. `None` if binding failed.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.handle.listening().await
    }

    /// Resolves when the accept loop has ended, for any reason.
    pub fn exited(&self) -> TriggerListener {
        self.exited.listener()
    }

    /// Connections currently open.
    pub fn connection_count(&self) -> usize {
        self.handle.connection_count()
    }

    /// Why the accept loop ended, if it ended with an error.
    pub fn failure(&self) -> Option<String> {
        self.failure.get().cloned()
    }
}

impl GracefulListener for ServerHandle {
    async fn shutdown(&self, grace: Duration) -> std::io::Result<()> {
        tracing::info!(
            connections = self.connection_count(),
            grace_ms = grace.as_millis() as u64,
            "Draining HTTPS connections"
        );
        self.handle.graceful_shutdown(Some(grace));
        self.exited().fired().await;

        match self.failure.get() {
            Some(message) => Err(std::io::Error::other(message.clone())),
            None => Ok(()),
        }
    }
}
