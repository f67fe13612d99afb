//! TLS Agent
//!
//! An HTTPS listener whose certificate is hot-reloaded from disk.
//!
//! # Architecture Overview
//!
//! ```text
//!   cert.pem / key.pem
//!        │  notify events + periodic expiry check
//!        ▼
//!  ┌──────────────┐  publish   ┌──────────────────┐  resolve   ┌──────────────┐
//!  │ reload agent │──────────▶ │ CertificateStore │ ◀───────── │ HTTPS server │◀── clients
//!  └──────────────┘            └──────────────────┘            └──────────────┘
//!        ▲ stop / done                                                ▲ drain
//!        └──────────────────── ShutdownCoordinator ───────────────────┘
//!                                     ▲
//!                               SIGINT / SIGTERM
//! ```

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use tls_agent::config::{env, load_config, validate_config, Config, ConfigError, Preset};
use tls_agent::lifecycle::startup;
use tls_agent::observability::logging;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PresetArg {
    Default,
    Minimal,
    All,
}

impl From<PresetArg> for Preset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Default => Preset::Default,
            PresetArg::Minimal => Preset::Minimal,
            PresetArg::All => Preset::All,
        }
    }
}

#[derive(Parser)]
#[command(name = "tls-agent")]
#[command(about = "HTTPS server with hot-reloaded TLS certificates", long_about = None)]
struct Cli {
    /// Config file (TOML, or JSON by extension)
    #[arg(short, long, env = "TLS_AGENT_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Starting preset when no config file is given
    #[arg(long, value_enum, default_value = "default")]
    preset: PresetArg,

    /// Listener bind address
    #[arg(long)]
    bind: Option<String>,

    /// Certificate chain (PEM)
    #[arg(long)]
    cert: Option<String>,

    /// Private key (PEM)
    #[arg(long)]
    key: Option<String>,
}

fn build_config(cli: &Cli) -> Result<(Config, Vec<String>), ConfigError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::from_preset(cli.preset.into()),
    };

    let rejected = env::apply_env_overrides(&mut config);

    if let Some(bind) = &cli.bind {
        config.listener.bind_address = bind.clone();
    }
    if let Some(cert) = &cli.cert {
        config.tls.cert_path = cert.clone();
    }
    if let Some(key) = &cli.key {
        config.tls.key_path = key.clone();
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok((config, rejected))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let (config, rejected) = match build_config(&cli) {
        Ok(built) => built,
        Err(e) => {
            logging::init_logging(true);
            tracing::error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    logging::init_logging(config.features.logging);
    tracing::info!("tls-agent v{} starting", env!("CARGO_PKG_VERSION"));
    for name in rejected {
        tracing::warn!(variable = %name, "Ignoring unparsable environment override");
    }
    config.log_summary();

    if let Err(e) = startup::run(config).await {
        tracing::error!(error = %e, "TLS Agent failed");
        return Err(e.into());
    }
    Ok(())
}
