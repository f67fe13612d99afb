//! The shared "current certificate" cell.

use std::sync::Arc;

use arc_swap::ArcSwap;
use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;

use crate::tls::pair::CertificatePair;

/// Holds the certificate pair served to every handshake.
///
/// Readers take a snapshot with a single atomic load; the reload agent
/// replaces the whole `Arc` in one store. There is always exactly one
/// current pair.
#[derive(Debug)]
pub struct CertificateStore {
    current: ArcSwap<CertificatePair>,
}

impl CertificateStore {
    /// Create a store around an already-validated bootstrap pair.
    pub fn new(initial: Arc<CertificatePair>) -> Self {
        Self {
            current: ArcSwap::new(initial),
        }
    }

    /// Snapshot of the current pair. Never blocks on a publisher.
    pub fn lookup(&self) -> Arc<CertificatePair> {
        self.current.load_full()
    }

    /// Replace the current pair. Concurrent publishers: last store wins.
    pub fn publish(&self, next: Arc<CertificatePair>) {
        self.current.store(next);
    }
}

impl ResolvesServerCert for CertificateStore {
    fn resolve(&self, _client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        Some(self.current.load().certified_key())
    }
}
