//! Configuration management for the qexec server.
//!
//! Supports loading configuration from:
//! 1. Configuration files (YAML)
//! 2. Environment variables (with QEXEC_ prefix)
//! 3. .env files
//!
//! Configuration precedence (highest to lowest):
//! 1. Environment variables
//! 2. Configuration file
//! 3. Default values

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use qexec_hal::{BackendConfig, PollPolicy};

/// Complete server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Result store configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Worker pool and polling
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Settings handed to backends on creation
    #[serde(default)]
    pub backends: BackendsConfig,

    /// Circuit downloads
    #[serde(default)]
    pub download: DownloadConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080")
    #[serde(default = "default_address")]
    pub address: String,

    /// Comma-separated allowed CORS origins, or `*`
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,

    /// Time allowed for in-flight jobs to finish on shutdown
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_seconds: u64,
}

/// Result store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Store type: "memory" or "sqlite"
    #[serde(default = "default_storage_type")]
    pub backend: String,

    /// Database file for the sqlite store
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
}

/// Worker pool and task polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Number of concurrent pipeline workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Jobs that may wait for a worker before submission is refused
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Pause between task status queries
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Status queries before a task is abandoned
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
}

/// Settings passed to backends through [`BackendConfig::extra`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendsConfig {
    /// Depolarizing probability of the local simulator's noise profile
    #[serde(default = "default_simulator_noise")]
    pub simulator_noise: f64,

    /// S3 bucket for Braket task results (falls back to QEXEC_BRAKET_S3_BUCKET)
    #[serde(default)]
    pub braket_s3_bucket: Option<String>,

    /// S3 key prefix for Braket task results
    #[serde(default)]
    pub braket_s3_prefix: Option<String>,

    /// AWS region for Braket
    #[serde(default)]
    pub braket_region: Option<String>,
}

/// Circuit download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Request timeout in seconds
    #[serde(default = "default_download_timeout")]
    pub timeout_seconds: u64,

    /// Largest accepted response body in bytes
    #[serde(default = "default_download_max_bytes")]
    pub max_bytes: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. "info" or "qexec_service=debug"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "console" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_cors_origins() -> String {
    "*".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_storage_type() -> String {
    "memory".to_string()
}

fn default_sqlite_path() -> String {
    "qexec.db".to_string()
}

fn default_workers() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    256
}

fn default_poll_interval() -> u64 {
    2000
}

fn default_max_poll_attempts() -> u32 {
    1800 // one hour at the default interval
}

fn default_simulator_noise() -> f64 {
    0.1
}

fn default_download_timeout() -> u64 {
    30
}

fn default_download_max_bytes() -> usize {
    crate::download::DEFAULT_MAX_BYTES
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "console".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            cors_origins: default_cors_origins(),
            shutdown_timeout_seconds: default_shutdown_timeout(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_type(),
            sqlite_path: default_sqlite_path(),
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            poll_interval_ms: default_poll_interval(),
            max_poll_attempts: default_max_poll_attempts(),
        }
    }
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            simulator_noise: default_simulator_noise(),
            braket_s3_bucket: None,
            braket_s3_prefix: None,
            braket_region: None,
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_download_timeout(),
            max_bytes: default_download_max_bytes(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl ExecutionConfig {
    /// Polling policy for [`Backend::wait`](qexec_hal::Backend::wait).
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_attempts: self.max_poll_attempts,
        }
    }
}

impl BackendsConfig {
    /// Configuration for creating backend `name` on behalf of a job.
    ///
    /// Every backend receives the same extras and reads the keys it knows.
    pub fn backend_config(&self, name: &str, token: Option<&str>) -> BackendConfig {
        let mut config =
            BackendConfig::new(name).with_extra("noise", serde_json::json!(self.simulator_noise));
        if let Some(token) = token {
            config = config.with_token(token);
        }
        for (key, value) in [
            ("s3_bucket", &self.braket_s3_bucket),
            ("s3_prefix", &self.braket_s3_prefix),
            ("region", &self.braket_region),
        ] {
            if let Some(value) = value {
                config = config.with_extra(key, serde_json::json!(value));
            }
        }
        config
    }
}

impl DownloadConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        serde_yaml_ng::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load configuration with the following precedence:
    /// 1. Load .env file if it exists
    /// 2. Load from file if provided
    /// 3. Apply environment variable overrides
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };

        let config = config.merge_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Merge environment variables into this configuration.
    ///
    /// Only variables present in `lookup` override the file-loaded (or
    /// default) values. A variable that is set but does not parse is an error.
    pub fn merge_env(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        fn parsed<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
            value
                .parse()
                .map_err(|_| ConfigError::ParseError(format!("{key}={value} is not valid")))
        }

        // Server
        if let Some(v) = lookup("QEXEC_ADDRESS") {
            self.server.address = v;
        }
        if let Some(v) = lookup("QEXEC_CORS_ORIGINS") {
            self.server.cors_origins = v;
        }

        // Storage
        if let Some(v) = lookup("QEXEC_STORAGE") {
            self.storage.backend = v;
        }
        if let Some(v) = lookup("QEXEC_SQLITE_PATH") {
            self.storage.sqlite_path = v;
        }

        // Execution
        if let Some(v) = lookup("QEXEC_WORKERS") {
            self.execution.workers = parsed("QEXEC_WORKERS", v)?;
        }
        if let Some(v) = lookup("QEXEC_QUEUE_CAPACITY") {
            self.execution.queue_capacity = parsed("QEXEC_QUEUE_CAPACITY", v)?;
        }
        if let Some(v) = lookup("QEXEC_POLL_INTERVAL_MS") {
            self.execution.poll_interval_ms = parsed("QEXEC_POLL_INTERVAL_MS", v)?;
        }
        if let Some(v) = lookup("QEXEC_MAX_POLL_ATTEMPTS") {
            self.execution.max_poll_attempts = parsed("QEXEC_MAX_POLL_ATTEMPTS", v)?;
        }

        // Backends
        if let Some(v) = lookup("QEXEC_SIMULATOR_NOISE") {
            self.backends.simulator_noise = parsed("QEXEC_SIMULATOR_NOISE", v)?;
        }

        // Download
        if let Some(v) = lookup("QEXEC_DOWNLOAD_TIMEOUT_SECS") {
            self.download.timeout_seconds = parsed("QEXEC_DOWNLOAD_TIMEOUT_SECS", v)?;
        }
        if let Some(v) = lookup("QEXEC_DOWNLOAD_MAX_BYTES") {
            self.download.max_bytes = parsed("QEXEC_DOWNLOAD_MAX_BYTES", v)?;
        }

        // Logging
        if let Some(v) = lookup("RUST_LOG") {
            self.logging.level = v;
        }
        if let Some(v) = lookup("QEXEC_LOG_FORMAT") {
            self.logging.format = v;
        }

        Ok(self)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_address()?;

        match self.storage.backend.as_str() {
            "memory" => {}
            "sqlite" if cfg!(feature = "sqlite") => {}
            "sqlite" => {
                return Err(ConfigError::ValidationError(
                    "sqlite storage requires the `sqlite` feature".to_string(),
                ));
            }
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Unknown storage backend: {other}"
                )));
            }
        }

        match self.logging.format.as_str() {
            "console" | "json" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {other}"
                )));
            }
        }

        for (name, value) in [
            ("workers", self.execution.workers),
            ("queue_capacity", self.execution.queue_capacity),
            ("poll_interval_ms", self.execution.poll_interval_ms as usize),
            ("max_poll_attempts", self.execution.max_poll_attempts as usize),
            ("download timeout_seconds", self.download.timeout_seconds as usize),
            ("download max_bytes", self.download.max_bytes),
        ] {
            if value == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be greater than 0"
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.backends.simulator_noise) {
            return Err(ConfigError::ValidationError(format!(
                "simulator_noise must lie in [0, 1], got {}",
                self.backends.simulator_noise
            )));
        }

        Ok(())
    }

    /// Get the parsed server address.
    pub fn socket_address(&self) -> Result<SocketAddr, ConfigError> {
        self.server.address.parse().map_err(|_| {
            ConfigError::ValidationError(format!("Invalid server address: {}", self.server.address))
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.address, "0.0.0.0:8080");
        assert_eq!(config.storage.backend, "memory");
        assert_eq!(config.execution.workers, 4);
        assert_eq!(config.backends.simulator_noise, 0.1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: Config = serde_yaml_ng::from_str(
            "execution:\n  workers: 2\nbackends:\n  braket_s3_bucket: amazon-braket-results\n",
        )
        .unwrap();
        assert_eq!(config.execution.workers, 2);
        assert_eq!(config.execution.poll_interval_ms, 2000);
        assert_eq!(
            config.backends.braket_s3_bucket.as_deref(),
            Some("amazon-braket-results")
        );
        assert_eq!(config.logging.format, "console");
    }

    #[test]
    fn test_merge_env_overrides() {
        let config = Config::default()
            .merge_env(env(&[
                ("QEXEC_ADDRESS", "127.0.0.1:9000"),
                ("QEXEC_WORKERS", "8"),
                ("QEXEC_MAX_POLL_ATTEMPTS", "5"),
                ("QEXEC_LOG_FORMAT", "json"),
                ("QEXEC_DOWNLOAD_MAX_BYTES", "1048576"),
            ]))
            .unwrap();
        assert_eq!(config.socket_address().unwrap().port(), 9000);
        assert_eq!(config.execution.workers, 8);
        assert_eq!(config.execution.poll_policy().max_attempts, 5);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.download.max_bytes, 1_048_576);
        assert_eq!(config.storage.backend, "memory");
    }

    #[test]
    fn test_merge_env_rejects_garbage() {
        let result = Config::default().merge_env(env(&[("QEXEC_WORKERS", "many")]));
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_validate_invalid_storage() {
        let mut config = Config::default();
        config.storage.backend = "postgres".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_workers() {
        let mut config = Config::default();
        config.execution.workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_invalid_address() {
        let mut config = Config::default();
        config.server.address = "localhost".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backend_config_extras() {
        let backends = BackendsConfig {
            braket_s3_bucket: Some("amazon-braket-results".into()),
            ..BackendsConfig::default()
        };
        let config = backends.backend_config("sv1", Some("secret"));
        assert_eq!(config.name, "sv1");
        assert_eq!(config.token.as_deref(), Some("secret"));
        assert_eq!(config.extra["s3_bucket"], "amazon-braket-results");
        assert_eq!(config.extra["noise"], 0.1);
        assert!(!config.extra.contains_key("region"));
    }
}
