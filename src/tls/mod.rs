//! TLS certificate subsystem.
//!
//! # Data Flow
//! ```text
//! cert.pem + key.pem on disk
//!     → pair.rs (read, parse PEM, check key matches leaf)
//!     → CertificatePair (immutable, shared via Arc)
//!     → store.rs (atomic swap of Arc<CertificatePair>)
//!     → rustls handshake calls CertificateStore::resolve
//! ```
//!
//! # Design Decisions
//! - A pair is never mutated; a reload builds a new one and swaps the Arc
//! - The handshake path only does an `ArcSwap::load`, no locks and no I/O
//! - One certificate for every handshake (no SNI selection)

pub mod pair;
pub mod server_config;
pub mod store;

use std::sync::Arc;

use rustls::crypto::CryptoProvider;

pub use pair::{CertificateError, CertificatePair, Validity};
pub use server_config::server_config;
pub use store::CertificateStore;

/// The process-wide crypto provider, falling back to aws-lc-rs when none is installed.
pub fn crypto_provider() -> Arc<CryptoProvider> {
    CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
}
