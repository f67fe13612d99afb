//! TLS certificate hot-reload agent.
//!
//! Serves HTTPS with a certificate that can be replaced on disk without a
//! restart, and shuts down in bounded, ordered stages.

pub mod agent;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod tls;

#[cfg(test)]
pub(crate) mod testdata;

pub use agent::ReloadAgent;
pub use config::Config;
pub use lifecycle::{ShutdownCoordinator, Trigger};
pub use tls::{CertificatePair, CertificateStore};
