//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files and
//! default every field, so a partial file is valid.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the TLS agent.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// HTTPS listener settings.
    pub listener: ListenerConfig,

    /// Certificate and key locations.
    pub tls: TlsConfig,

    /// Feature switches.
    pub features: Features,

    /// Timeouts and intervals.
    pub timings: Timings,

    /// Metrics exporter settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8443").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8443".to_string(),
        }
    }
}

/// Certificate file locations.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TlsConfig {
    /// Path to certificate chain (PEM), leaf first.
    pub cert_path: String,

    /// Path to private key (PEM).
    pub key_path: String,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            cert_path: "certs/server.crt".to_string(),
            key_path: "certs/server.key".to_string(),
        }
    }
}

/// Feature switches.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Features {
    /// Handle SIGINT/SIGTERM with the two-stage shutdown.
    pub graceful_shutdown: bool,

    /// Run the file-watching reload agent.
    pub certificate_watcher: bool,

    /// Periodic expiry check as a fallback to file events.
    pub periodic_cert_check: bool,

    /// Drop file events arriving within the debounce interval.
    pub debounce_file_changes: bool,

    /// Info-level logging. Warnings and errors are always logged.
    pub logging: bool,

    /// Prometheus exporter.
    pub metrics_collection: bool,

    /// `/healthz` endpoint.
    pub health_check: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            graceful_shutdown: true,
            certificate_watcher: true,
            periodic_cert_check: true,
            debounce_file_changes: true,
            logging: true,
            metrics_collection: false,
            health_check: false,
        }
    }
}

/// Timeouts and intervals, in the units their names say.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Timings {
    /// Listener drain deadline during shutdown.
    pub shutdown_timeout_secs: u64,

    /// How long shutdown waits for the agent to finish.
    pub agent_shutdown_timeout_secs: u64,

    /// Period of the fallback expiry check.
    pub cert_watch_interval_secs: u64,

    /// Minimum spacing between file-triggered reloads.
    pub debounce_interval_ms: u64,

    /// Fallback reload fires when fewer days than this remain.
    pub cert_expiry_warning_days: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            shutdown_timeout_secs: 10,
            agent_shutdown_timeout_secs: 5,
            cert_watch_interval_secs: 30,
            debounce_interval_ms: 2000,
            cert_expiry_warning_days: 7,
        }
    }
}

impl Timings {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn agent_shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.agent_shutdown_timeout_secs)
    }

    pub fn cert_watch_interval(&self) -> Duration {
        Duration::from_secs(self.cert_watch_interval_secs)
    }

    pub fn debounce_interval(&self) -> Duration {
        Duration::from_millis(self.debounce_interval_ms)
    }

    /// Saturates instead of overflowing for absurd day counts.
    pub fn cert_expiry_warning(&self) -> Duration {
        Duration::from_secs(self.cert_expiry_warning_days.saturating_mul(24 * 60 * 60))
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Prometheus scrape address, used when metrics collection is on.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Named starting points selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Default,
    Minimal,
    All,
}

impl Config {
    /// Only core serving: no watcher, no signal handling.
    pub fn minimal() -> Self {
        Self {
            features: Features {
                graceful_shutdown: false,
                certificate_watcher: false,
                periodic_cert_check: false,
                debounce_file_changes: false,
                logging: true,
                metrics_collection: false,
                health_check: false,
            },
            timings: Timings {
                shutdown_timeout_secs: 5,
                agent_shutdown_timeout_secs: 2,
                cert_watch_interval_secs: 60,
                debounce_interval_ms: 1000,
                cert_expiry_warning_days: 14,
            },
            ..Self::default()
        }
    }

    /// Every feature switched on.
    pub fn all_features() -> Self {
        Self {
            features: Features {
                metrics_collection: true,
                health_check: true,
                ..Features::default()
            },
            ..Self::default()
        }
    }

    pub fn from_preset(preset: Preset) -> Self {
        match preset {
            Preset::Default => Self::default(),
            Preset::Minimal => Self::minimal(),
            Preset::All => Self::all_features(),
        }
    }

    /// Log the effective configuration once at startup.
    pub fn log_summary(&self) {
        let f = &self.features;
        let t = &self.timings;
        tracing::info!(
            bind_address = %self.listener.bind_address,
            cert_path = %self.tls.cert_path,
            key_path = %self.tls.key_path,
            "Configuration loaded"
        );
        tracing::info!(
            graceful_shutdown = f.graceful_shutdown,
            certificate_watcher = f.certificate_watcher,
            periodic_cert_check = f.periodic_cert_check,
            debounce_file_changes = f.debounce_file_changes,
            logging = f.logging,
            metrics_collection = f.metrics_collection,
            health_check = f.health_check,
            "Features"
        );
        tracing::info!(
            shutdown_timeout_secs = t.shutdown_timeout_secs,
            agent_shutdown_timeout_secs = t.agent_shutdown_timeout_secs,
            cert_watch_interval_secs = t.cert_watch_interval_secs,
            debounce_interval_ms = t.debounce_interval_ms,
            cert_expiry_warning_days = t.cert_expiry_warning_days,
            "Timings"
        );
    }
}
