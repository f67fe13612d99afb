//! Certificate chain + private key loading.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::sign::CertifiedKey;
use rustls::InconsistentKeys;
use thiserror::Error;

/// Errors produced while loading a certificate pair.
///
/// All of these are recoverable from the reload agent's point of view.
#[derive(Debug, Error)]
pub enum CertificateError {
    /// File missing or unreadable.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// PEM framing could not be decoded.
    #[error("malformed PEM in {}: {source}", path.display())]
    Pem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The certificate file holds no certificates.
    #[error("no certificates found in {}", path.display())]
    NoCertificates { path: PathBuf },

    /// The key file holds no private key.
    #[error("no private key found in {}", path.display())]
    NoPrivateKey { path: PathBuf },

    /// The crypto provider rejected the key.
    #[error("unsupported private key in {}: {source}", path.display())]
    UnsupportedKey {
        path: PathBuf,
        #[source]
        source: rustls::Error,
    },

    /// The private key does not belong to the leaf certificate.
    #[error("private key does not match certificate")]
    KeyMismatch,

    /// The leaf certificate is not valid X.509.
    #[error("invalid leaf certificate: {0}")]
    InvalidLeaf(String),
}

/// Validity window of the leaf certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validity {
    pub not_before: SystemTime,
    pub not_after: SystemTime,
}

impl Validity {
    fn from_leaf(leaf: &CertificateDer<'_>) -> Result<Self, CertificateError> {
        let (_, cert) = x509_parser::parse_x509_certificate(leaf.as_ref())
            .map_err(|e| CertificateError::InvalidLeaf(e.to_string()))?;
        let validity = cert.validity();
        Ok(Self {
            not_before: from_unix(validity.not_before.timestamp()),
            not_after: from_unix(validity.not_after.timestamp()),
        })
    }

    /// Time left until `not_after`, or `None` once expired.
    pub fn remaining(&self, now: SystemTime) -> Option<Duration> {
        self.not_after.duration_since(now).ok()
    }

    /// True when less than `window` of validity is left (expired counts).
    pub fn expires_within(&self, window: Duration, now: SystemTime) -> bool {
        match self.remaining(now) {
            Some(left) => left < window,
            None => true,
        }
    }

    pub fn is_expired(&self, now: SystemTime) -> bool {
        self.remaining(now).is_none()
    }
}

/// A loaded certificate chain and its private key.
///
/// Immutable once built. Reloading produces a fresh pair.
#[derive(Debug)]
pub struct CertificatePair {
    certified_key: Arc<CertifiedKey>,
    validity: Validity,
    cert_path: PathBuf,
    key_path: PathBuf,
}

impl CertificatePair {
    /// Read and validate a pair from the two PEM files.
    pub async fn load(
        cert_path: impl AsRef<Path>,
        key_path: impl AsRef<Path>,
    ) -> Result<Self, CertificateError> {
        let cert_path = cert_path.as_ref();
        let key_path = key_path.as_ref();

        let cert_pem = tokio::fs::read(cert_path)
            .await
            .map_err(|source| CertificateError::Io {
                path: cert_path.to_path_buf(),
                source,
            })?;
        let key_pem = tokio::fs::read(key_path)
            .await
            .map_err(|source| CertificateError::Io {
                path: key_path.to_path_buf(),
                source,
            })?;

        Self::from_pem(&cert_pem, &key_pem, cert_path, key_path)
    }

    /// Build a pair from PEM bytes already in memory.
    ///
    /// The paths are only recorded for diagnostics.
    pub fn from_pem(
        cert_pem: &[u8],
        key_pem: &[u8],
        cert_path: &Path,
        key_path: &Path,
    ) -> Result<Self, CertificateError> {
        let chain: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut &cert_pem[..])
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| CertificateError::Pem {
                path: cert_path.to_path_buf(),
                source,
            })?;

        let Some(leaf) = chain.first() else {
            return Err(CertificateError::NoCertificates {
                path: cert_path.to_path_buf(),
            });
        };
        let validity = Validity::from_leaf(leaf)?;

        let key: PrivateKeyDer<'static> = rustls_pemfile::private_key(&mut &key_pem[..])
            .map_err(|source| CertificateError::Pem {
                path: key_path.to_path_buf(),
                source,
            })?
            .ok_or_else(|| CertificateError::NoPrivateKey {
                path: key_path.to_path_buf(),
            })?;

        let signing_key = super::crypto_provider()
            .key_provider
            .load_private_key(key)
            .map_err(|source| CertificateError::UnsupportedKey {
                path: key_path.to_path_buf(),
                source,
            })?;

        let certified_key = CertifiedKey::new(chain, signing_key);
        match certified_key.keys_match() {
            Ok(()) => {}
            // Some key types cannot expose their public half; accept those.
            Err(rustls::Error::InconsistentKeys(InconsistentKeys::Unknown)) => {
                tracing::debug!(
                    key_path = %key_path.display(),
                    "Key/certificate match could not be verified for this key type"
                );
            }
            Err(_) => return Err(CertificateError::KeyMismatch),
        }

        Ok(Self {
            certified_key: Arc::new(certified_key),
            validity,
            cert_path: cert_path.to_path_buf(),
            key_path: key_path.to_path_buf(),
        })
    }

    /// The rustls view handed to handshakes.
    pub fn certified_key(&self) -> Arc<CertifiedKey> {
        Arc::clone(&self.certified_key)
    }

    /// DER certificate chain, leaf first.
    pub fn chain(&self) -> &[CertificateDer<'static>] {
        &self.certified_key.cert
    }

    pub fn validity(&self) -> Validity {
        self.validity
    }

    pub fn cert_path(&self) -> &Path {
        &self.cert_path
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }
}

fn from_unix(secs: i64) -> SystemTime {
    if secs >= 0 {
        UNIX_EPOCH + Duration::from_secs(secs as u64)
    } else {
        UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs())
    }
}

/// Seconds since the unix epoch (negative before 1970).
pub fn unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}
