//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Pick the default level from the `logging` feature switch
//!
//! # Design Decisions
//! - `RUST_LOG` always wins over the built-in default
//! - With `logging` off only warnings and errors are emitted

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is not set.
pub fn default_filter(logging_enabled: bool) -> &'static str {
    if logging_enabled {
        "tls_agent=info,tower_http=info"
    } else {
        "tls_agent=warn"
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(logging_enabled: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter(logging_enabled).into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
