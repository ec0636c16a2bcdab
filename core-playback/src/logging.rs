//! # Logging bootstrap
//!
//! Structured logging with the `tracing` crate. Hosts embedding the core
//! call [`init_logging`] once at startup; every module then logs through the
//! standard `tracing` macros with env-filter-style module filtering.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Output format for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, human-oriented output for development.
    Pretty,
    /// Single-line output for terminals and CI.
    Compact,
    /// Newline-delimited JSON for log shippers.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Env-filter directive string (e.g., `"info,core_playback=debug"`).
    pub filter: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

/// Failures while installing the global subscriber.
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("invalid filter directive: {0}")]
    InvalidFilter(String),

    #[error("failed to install subscriber: {0}")]
    InitFailed(String),
}

/// Install the global `tracing` subscriber.
///
/// # Errors
///
/// Fails when the filter directive does not parse or when a global
/// subscriber is already installed.
pub fn init_logging(config: LoggingConfig) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|error| LoggingError::InvalidFilter(error.to_string()))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match config.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|error| LoggingError::InitFailed(error.to_string()))
}
