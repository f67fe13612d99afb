//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! preset (default / minimal / all)
//!     → loader.rs (optional TOML or JSON file)
//!     → env.rs (TLS_AGENT_FEATURES_* overrides)
//!     → CLI flags (main.rs)
//!     → validation.rs (semantic checks)
//!     → Config (immutable, consumed at construction time)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Durations are plain integers with the unit in the field name
//! - Validation separates syntactic (serde) from semantic checks

pub mod env;
pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{Config, Features, ListenerConfig, ObservabilityConfig, Preset, Timings, TlsConfig};
pub use validation::{validate_config, ValidationError};
