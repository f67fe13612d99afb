//! Environment variable overrides.
//!
//! Every feature flag and timing can be set with
//! `TLS_AGENT_FEATURES_<NAME>`, e.g. `TLS_AGENT_FEATURES_LOGGING=false` or
//! `TLS_AGENT_FEATURES_DEBOUNCE_INTERVAL=500`. Values that do not parse are
//! skipped and the previous value is kept.

use crate::config::schema::Config;

pub const ENV_PREFIX: &str = "TLS_AGENT_FEATURES_";

/// Apply overrides from the process environment.
///
/// Returns the names of variables that were present but unparsable.
pub fn apply_env_overrides(config: &mut Config) -> Vec<String> {
    apply_overrides_from(config, |name| std::env::var(name).ok())
}

/// Apply overrides using `lookup` to resolve full variable names.
pub fn apply_overrides_from<F>(config: &mut Config, lookup: F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut rejected = Vec::new();
    let mut flag = |name: &str, target: &mut bool| {
        let full = format!("{ENV_PREFIX}{name}");
        if let Some(raw) = lookup(&full) {
            match parse_bool(&raw) {
                Some(value) => *target = value,
                None => rejected.push(full),
            }
        }
    };

    let f = &mut config.features;
    flag("GRACEFUL_SHUTDOWN", &mut f.graceful_shutdown);
    flag("CERTIFICATE_WATCHER", &mut f.certificate_watcher);
    flag("PERIODIC_CERT_CHECK", &mut f.periodic_cert_check);
    flag("DEBOUNCE_FILE_CHANGES", &mut f.debounce_file_changes);
    flag("LOGGING", &mut f.logging);
    flag("METRICS_COLLECTION", &mut f.metrics_collection);
    flag("HEALTH_CHECK", &mut f.health_check);

    let mut number = |name: &str, target: &mut u64| {
        let full = format!("{ENV_PREFIX}{name}");
        if let Some(raw) = lookup(&full) {
            match raw.trim().parse() {
                Ok(value) => *target = value,
                Err(_) => rejected.push(full),
            }
        }
    };

    let t = &mut config.timings;
    number("SHUTDOWN_TIMEOUT", &mut t.shutdown_timeout_secs);
    number("AGENT_SHUTDOWN_TIMEOUT", &mut t.agent_shutdown_timeout_secs);
    number("CERT_WATCH_INTERVAL", &mut t.cert_watch_interval_secs);
    number("DEBOUNCE_INTERVAL", &mut t.debounce_interval_ms);
    number("CERT_EXPIRY_WARNING", &mut t.cert_expiry_warning_days);

    rejected
}

/// Accepts the usual spellings: 1/0, t/f, true/false in any case.
fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" => Some(true),
        "0" | "f" | "false" => Some(false),
        _ => None,
    }
}
