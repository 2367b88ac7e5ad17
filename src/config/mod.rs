// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::image_optimizer::{OutputFormat, ProcessingParameters};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable '{0}' is referenced but not set")]
    MissingEnvVar(String),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub buckets: BucketsConfig,
    pub defaults: DefaultsConfig,
    pub output: OutputConfig,
    pub history: HistoryConfig,
    pub logging: LoggingConfig,
}

/// Blob store backend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    #[default]
    Filesystem,
    S3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Root directory for the filesystem backend
    pub root: PathBuf,
    pub region: String,
    /// Custom S3 endpoint (MinIO, LocalStack)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub force_path_style: bool,
    /// Static credentials; the default AWS provider chain is used when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Filesystem,
            root: PathBuf::from("data"),
            region: "us-east-1".to_string(),
            endpoint: None,
            force_path_style: false,
            access_key: None,
            secret_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketsConfig {
    /// Bucket uploads land in
    pub source: String,
    /// Bucket processed images are written to
    pub processed: String,
}

impl Default for BucketsConfig {
    fn default() -> Self {
        Self {
            source: "imagehub-source-images".to_string(),
            processed: "imagehub-processed-images".to_string(),
        }
    }
}

/// Parameters applied when an upload key cannot be decoded
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub format: OutputFormat,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        let params = ProcessingParameters::default();
        Self {
            width: params.width,
            height: params.height,
            quality: params.quality,
            format: params.format,
        }
    }
}

impl DefaultsConfig {
    pub fn to_parameters(&self) -> ProcessingParameters {
        ProcessingParameters::new(self.width, self.height, self.quality, self.format)
    }
}

fn default_cache_control() -> String {
    "max-age=31536000".to_string()
}

fn default_png_effort() -> u8 {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Cache-Control directive stored with processed images
    #[serde(default = "default_cache_control")]
    pub cache_control: String,
    /// oxipng preset for PNG output (0-6)
    #[serde(default = "default_png_effort")]
    pub png_effort: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            cache_control: default_cache_control(),
            png_effort: default_png_effort(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// JSON-lines file history records are appended to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub retention_days: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: None,
            retention_days: crate::history::DEFAULT_RETENTION_DAYS,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by RUST_LOG
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, ConfigError> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        // Full-line comments may mention ${VAR} samples; they are never substituted
        let yaml = yaml
            .lines()
            .filter(|line| !line.trim_start().starts_with('#'))
            .collect::<Vec<_>>()
            .join("\n");

        // Check that every referenced variable exists before substituting
        for caps in re.captures_iter(&yaml) {
            let var_name = &caps[1];
            if std::env::var(var_name).is_err() {
                return Err(ConfigError::MissingEnvVar(var_name.to_string()));
            }
        }

        let substituted = re.replace_all(&yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        if substituted.trim().is_empty() {
            return Ok(Config::default());
        }

        Ok(serde_yaml::from_str(&substituted)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buckets.source.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "buckets.source cannot be empty".to_string(),
            ));
        }
        if self.buckets.processed.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "buckets.processed cannot be empty".to_string(),
            ));
        }

        self.defaults
            .to_parameters()
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("defaults: {}", e)))?;

        if self.output.png_effort > 6 {
            return Err(ConfigError::Invalid(format!(
                "output.png_effort must be 0-6, got {}",
                self.output.png_effort
            )));
        }

        match self.storage.backend {
            StorageBackend::Filesystem if self.storage.root.as_os_str().is_empty() => {
                return Err(ConfigError::Invalid(
                    "storage.root is required for the filesystem backend".to_string(),
                ));
            }
            StorageBackend::S3 => {
                if self.storage.region.trim().is_empty() {
                    return Err(ConfigError::Invalid(
                        "storage.region is required for the s3 backend".to_string(),
                    ));
                }
                if self.storage.access_key.is_some() != self.storage.secret_key.is_some() {
                    return Err(ConfigError::Invalid(
                        "storage.access_key and storage.secret_key must be set together"
                            .to_string(),
                    ));
                }
            }
            _ => {}
        }

        if self.history.retention_days == 0 {
            return Err(ConfigError::Invalid(
                "history.retention_days must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
