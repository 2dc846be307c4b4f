//! Tracing subscriber setup.

use std::io;

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{ConfigError, LogConfig, LogFormat};

/// Install the global subscriber. Logs go to stderr so stdout stays free for
/// command output. `RUST_LOG` directives override `config.level`.
///
/// Fails if the level is unknown or a subscriber is already installed.
pub fn init_tracing(config: &LogConfig) -> Result<(), TracingInitError> {
    let default_level = parse_log_level(&config.level)?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(io::stderr)
                    .with_current_span(true)
                    .with_target(true),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(io::stderr)
                    .with_target(true),
            )
            .try_init(),
    };
    result.map_err(|e| TracingInitError::AlreadyInstalled(e.to_string()))?;

    tracing::debug!(level = %config.level, format = ?config.format, "logger initialized");
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum TracingInitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("tracing subscriber already installed: {0}")]
    AlreadyInstalled(String),
}

fn parse_log_level(level: &str) -> Result<Level, ConfigError> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(ConfigError::InvalidLogLevel(level.to_string())),
    }
}
