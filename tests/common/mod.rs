//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tls_agent::{CertificatePair, CertificateStore};

/// PEM and DER forms of a generated self-signed certificate.
pub struct Generated {
    pub cert_pem: String,
    pub key_pem: String,
    pub cert_der: Vec<u8>,
}

/// Self-signed `localhost` certificate.
pub fn generate() -> Generated {
    let rcgen::CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    Generated {
        cert_pem: cert.pem(),
        key_pem: key_pair.serialize_pem(),
        cert_der: cert.der().to_vec(),
    }
}

/// Self-signed certificate that expired in 2000.
pub fn generate_expired() -> Generated {
    let mut params = rcgen::CertificateParams::new(vec!["localhost".to_string()]).unwrap();
    params.not_before = rcgen::date_time_ymd(1999, 1, 1);
    params.not_after = rcgen::date_time_ymd(2000, 1, 1);
    let key_pair = rcgen::KeyPair::generate().unwrap();
    let cert = params.self_signed(&key_pair).unwrap();
    Generated {
        cert_pem: cert.pem(),
        key_pem: key_pair.serialize_pem(),
        cert_der: cert.der().to_vec(),
    }
}

/// Write the pair as `server.crt` / `server.key` in `dir`.
pub fn write_pair(dir: &Path, pair: &Generated) -> (PathBuf, PathBuf) {
    let cert = dir.join("server.crt");
    let key = dir.join("server.key");
    std::fs::write(&cert, &pair.cert_pem).unwrap();
    std::fs::write(&key, &pair.key_pem).unwrap();
    (cert, key)
}

/// Load the files in `dir` into a fresh store.
pub async fn store_from(cert: &Path, key: &Path) -> Arc<CertificateStore> {
    let pair = CertificatePair::load(cert, key).await.unwrap();
    Arc::new(CertificateStore::new(Arc::new(pair)))
}

/// DER of the leaf currently in the store.
pub fn current_leaf(store: &CertificateStore) -> Vec<u8> {
    store.lookup().chain()[0].as_ref().to_vec()
}

/// Poll `check` every 20ms until it holds or `timeout` passes.
pub async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
