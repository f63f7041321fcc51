//! Process-wide logging setup.
//!
//! The library only emits `tracing` events. Hosts that want them printed
//! call [`init`] once at startup; without it every event goes to the no-op
//! default subscriber.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Logging settings, also the `[logging]` config section.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Install a subscriber at all.
    pub debug: bool,
    /// `EnvFilter` directives, e.g. `scanlens=trace`. Falls back to
    /// `RUST_LOG` plus `info`.
    pub filter: Option<String>,
}

impl LogConfig {
    pub fn debug() -> Self {
        Self {
            debug: true,
            filter: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoggingError {
    #[error("logging already initialised")]
    AlreadyInitialized,
    #[error("invalid log filter: {0}")]
    InvalidFilter(String),
}

/// Installs the global fmt subscriber described by `config`.
///
/// Returns `Ok(false)` without installing anything when `debug` is off.
pub fn init(config: &LogConfig) -> Result<bool, LoggingError> {
    if !config.debug {
        return Ok(false);
    }

    let filter = match &config.filter {
        Some(directives) => EnvFilter::try_new(directives)
            .map_err(|e| LoggingError::InvalidFilter(e.to_string()))?,
        None => EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)?;
    Ok(true)
}
