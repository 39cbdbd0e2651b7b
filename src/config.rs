//! Configuration management for the bridge assessment service

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How categorical features are presented to the model
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CategoricalEncoding {
    /// Integer codes in a single float tensor (Concrete=0, Steel=1, ...)
    #[default]
    Encoded,
    /// Category text, one named input per feature; the model encodes it itself
    Raw,
}

impl CategoricalEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoricalEncoding::Encoded => "encoded",
            CategoricalEncoding::Raw => "raw",
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub display: DisplayConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub bind: String,
    /// Listen port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the ONNX model file
    pub path: String,
    /// Categorical encoding the model was trained with
    pub encoding: CategoricalEncoding,
    /// Number of threads for ONNX inference (default: 1)
    pub onnx_threads: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: "model.onnx".to_string(),
            encoding: CategoricalEncoding::Encoded,
            onnx_threads: 1,
        }
    }
}

/// Result page options
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Show the class probability breakdown when the model provides one
    pub show_probabilities: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_probabilities: true,
        }
    }
}

/// Metrics reporting configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Seconds between periodic summaries (0 = disabled)
    pub report_interval_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a specific path layered under `BRIDGE__*` environment variables.
    ///
    /// A missing file is not an error; every field has a default.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix("BRIDGE")
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
