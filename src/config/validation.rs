//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0 and bounded, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: Config → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::Config;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("{0} must not be empty")]
    EmptyPath(&'static str),

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("{field} must be at most {max}")]
    TooLarge { field: &'static str, max: u64 },
}

pub const MAX_SHUTDOWN_TIMEOUT_SECS: u64 = 60 * 60;
pub const MAX_CERT_WATCH_INTERVAL_SECS: u64 = 24 * 60 * 60;
pub const MAX_DEBOUNCE_INTERVAL_MS: u64 = 60 * 60 * 1000;
pub const MAX_CERT_EXPIRY_WARNING_DAYS: u64 = 10 * 365;

/// Check the whole config, collecting every error.
pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.features.metrics_collection
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.tls.cert_path.trim().is_empty() {
        errors.push(ValidationError::EmptyPath("tls.cert_path"));
    }
    if config.tls.key_path.trim().is_empty() {
        errors.push(ValidationError::EmptyPath("tls.key_path"));
    }

    let t = &config.timings;
    for (field, value, max) in [
        ("timings.shutdown_timeout_secs", t.shutdown_timeout_secs, MAX_SHUTDOWN_TIMEOUT_SECS),
        (
            "timings.agent_shutdown_timeout_secs",
            t.agent_shutdown_timeout_secs,
            MAX_SHUTDOWN_TIMEOUT_SECS,
        ),
        (
            "timings.cert_watch_interval_secs",
            t.cert_watch_interval_secs,
            MAX_CERT_WATCH_INTERVAL_SECS,
        ),
        ("timings.debounce_interval_ms", t.debounce_interval_ms, MAX_DEBOUNCE_INTERVAL_MS),
        (
            "timings.cert_expiry_warning_days",
            t.cert_expiry_warning_days,
            MAX_CERT_EXPIRY_WARNING_DAYS,
        ),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroDuration(field));
        } else if value > max {
            errors.push(ValidationError::TooLarge { field, max });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert_eq!(validate_config(&Config::default()), Ok(()));
        assert_eq!(validate_config(&Config::minimal()), Ok(()));
        assert_eq!(validate_config(&Config::all_features()), Ok(()));
    }

    #[test]
    fn reports_every_error() {
        let mut config = Config::default();
        config.listener.bind_address = "not-an-address".into();
        config.tls.key_path = " ".into();
        config.timings.shutdown_timeout_secs = 0;
        config.timings.debounce_interval_ms = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::BindAddress("not-an-address".into()),
                ValidationError::EmptyPath("tls.key_path"),
                ValidationError::ZeroDuration("timings.shutdown_timeout_secs"),
                ValidationError::ZeroDuration("timings.debounce_interval_ms"),
            ]
        );
    }

    #[test]
    fn oversized_timings_rejected() {
        let mut config = Config::default();
        config.timings.cert_expiry_warning_days = u64::MAX / 1000;
        config.timings.cert_watch_interval_secs = u64::MAX;

        assert_eq!(
            validate_config(&config),
            Err(vec![
                ValidationError::TooLarge {
                    field: "timings.cert_watch_interval_secs",
                    max: MAX_CERT_WATCH_INTERVAL_SECS,
                },
                ValidationError::TooLarge {
                    field: "timings.cert_expiry_warning_days",
                    max: MAX_CERT_EXPIRY_WARNING_DAYS,
                },
            ])
        );

        config.timings.cert_watch_interval_secs = MAX_CERT_WATCH_INTERVAL_SECS;
        config.timings.cert_expiry_warning_days = MAX_CERT_EXPIRY_WARNING_DAYS;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn metrics_address_checked_only_when_enabled() {
        let mut config = Config::default();
        config.observability.metrics_address = "nope".into();
        assert!(validate_config(&config).is_ok());

        config.features.metrics_collection = true;
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::MetricsAddress("nope".into())])
        );
    }
}
