//! Certificate health endpoint.

use std::sync::Arc;
use std::time::SystemTime;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::tls::pair::unix_seconds;
use crate::tls::CertificateStore;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub certificate: CertificateStatus,
}

#[derive(Debug, Serialize)]
pub struct CertificateStatus {
    pub not_before: i64,
    pub not_after: i64,
    pub expires_in_secs: u64,
    pub expired: bool,
}

/// Report on the certificate currently being served.
pub async fn healthz(State(store): State<Arc<CertificateStore>>) -> Json<HealthStatus> {
    Json(status_of(&store, SystemTime::now()))
}

fn status_of(store: &CertificateStore, now: SystemTime) -> HealthStatus {
    let validity = store.lookup().validity();
    let remaining = validity.remaining(now);

    HealthStatus {
        status: if remaining.is_some() { "ok" } else { "expired" },
        certificate: CertificateStatus {
            not_before: unix_seconds(validity.not_before),
            not_after: unix_seconds(validity.not_after),
            expires_in_secs: remaining.map(|d| d.as_secs()).unwrap_or(0),
            expired: remaining.is_none(),
        },
    }
}
