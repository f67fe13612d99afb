//! HTTPS listener subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → axum-server rustls acceptor
//!         → CertificateStore::resolve (per handshake)
//!     → server.rs (Axum router, trace layer)
//!     → health.rs (/healthz, when enabled)
//! ```

pub mod health;
pub mod server;

pub use server::{ServerError, ServerHandle, TlsServer};
