//! Metrics collection and exposition.
//!
//! # Metrics
//! - `tls_agent_reloads_total` (counter): reload attempts by trigger, result
//! - `tls_agent_reload_debounced_total` (counter): file events dropped by debounce
//! - `tls_agent_certificate_expiry_seconds` (gauge): unix time of current leaf not-after
//! - `tls_agent_shutdown_stage_total` (counter): shutdown stage outcomes
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Never called from the handshake path

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), metrics_exporter_prometheus::BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_reload(trigger: &'static str, success: bool) {
    let result = if success { "success" } else { "failure" };
    metrics::counter!("tls_agent_reloads_total", "trigger" => trigger, "result" => result)
        .increment(1);
}

pub fn record_debounced() {
    metrics::counter!("tls_agent_reload_debounced_total").increment(1);
}

pub fn record_certificate_expiry(not_after_unix: i64) {
    metrics::gauge!("tls_agent_certificate_expiry_seconds").set(not_after_unix as f64);
}

pub fn record_shutdown_stage(stage: &'static str, outcome: &'static str) {
    metrics::counter!("tls_agent_shutdown_stage_total", "stage" => stage, "outcome" => outcome)
        .increment(1);
}
