//! Tracing subscriber setup.
//!
//! Two output formats:
//! - Console output (development)
//! - JSON structured logging (production)

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::config::LoggingConfig;

/// Tracing output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable console output (for development).
    Console,
    /// JSON structured logging (for production).
    Json,
}

impl TracingFormat {
    fn parse(format: &str) -> Self {
        match format {
            "json" => TracingFormat::Json,
            _ => TracingFormat::Console,
        }
    }
}

/// Tracing configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Filter directive (e.g., "info", "qexec_service=debug").
    pub log_level: String,
    /// Output format (console or JSON).
    pub format: TracingFormat,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: TracingFormat::Console,
        }
    }
}

impl TracingConfig {
    /// Create config from environment variables.
    ///
    /// Environment variables:
    /// - `RUST_LOG`: Log level (default: "info")
    /// - `QEXEC_LOG_FORMAT`: "console" or "json" (default: "console")
    pub fn from_env() -> Self {
        Self {
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            format: std::env::var("QEXEC_LOG_FORMAT")
                .map_or(TracingFormat::Console, |f| TracingFormat::parse(&f)),
        }
    }
}

impl From<&LoggingConfig> for TracingConfig {
    fn from(config: &LoggingConfig) -> Self {
        Self {
            log_level: config.level.clone(),
            format: TracingFormat::parse(&config.format),
        }
    }
}

/// Install the global tracing subscriber.
///
/// Fails if a subscriber is already installed.
pub fn init_tracing(config: &TracingConfig) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = match config.format {
        TracingFormat::Console => fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .boxed(),
        TracingFormat::Json => fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .json()
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::info!(format = ?config.format, "tracing initialized");
    Ok(())
}

/// Initialize tracing with configuration from the environment.
pub fn init_default_tracing() -> Result<(), TryInitError> {
    init_tracing(&TracingConfig::from_env())
}
