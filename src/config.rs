//! Configuration management for the fraud scoring service

use crate::feature_extractor::InputSchema;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Environment variable prefix for overrides (`SWIPE_SHIELD__MODEL__PATH`)
pub const ENV_PREFIX: &str = "SWIPE_SHIELD";

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub detection: DetectionConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Maximum accepted request body (CSV uploads)
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_upload_bytes: 32 * 1024 * 1024,
        }
    }
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Local artifact path
    pub path: String,
    /// Remote location fetched when `path` is missing
    pub source_url: Option<String>,
    /// Expected SHA-256 of the artifact (hex)
    pub sha256: Option<String>,
    /// Input schema for artifacts that do not declare one (ONNX)
    pub schema: InputSchema,
    /// Timeout for the artifact download
    pub download_timeout_secs: u64,
    /// Number of threads for ONNX inference
    pub onnx_threads: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: "models/fraud_model.json".to_string(),
            source_url: None,
            sha256: None,
            schema: InputSchema::Anonymized,
            download_timeout_secs: 60,
            onnx_threads: 1,
        }
    }
}

/// Detection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Default decision threshold on the fraud probability
    pub threshold: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}

/// Metrics configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Interval between summary log lines; 0 disables the reporter
    pub report_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 60,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (pretty, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file (optional) and environment
    pub fn load() -> Result<Self> {
        let path = std::env::var("SWIPE_SHIELD_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::build(Path::new(&path), false)
    }

    /// Load configuration from a specific path (required) and environment
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::build(path.as_ref(), true)
    }

    fn build(path: &Path, required: bool) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path).required(required))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
