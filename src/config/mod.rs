// Configuration module
//
// The whole service is configured from one YAML file. `${VAR}` references
// are substituted from the environment before parsing, so credentials can
// stay out of the file. The resulting `Config` is built once at startup and
// handed to constructors; nothing reads configuration from global state.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub mod jwt;
pub mod limits;
pub mod server;
pub mod storage;

pub use jwt::JwtConfig;
pub use limits::ImageLimitsConfig;
pub use server::ServerConfig;
pub use storage::StorageConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Environment variable '{0}' is referenced but not set")]
    MissingEnv(String),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by RUST_LOG (default: "info")
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub limits: ImageLimitsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, ConfigError> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        // All referenced variables must exist before substitution starts
        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            if std::env::var(var_name).is_err() {
                return Err(ConfigError::MissingEnv(var_name.to_string()));
            }
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        let config: Config = serde_yaml::from_str(&substituted)?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.address.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "server.address cannot be empty".to_string(),
            ));
        }
        if self.server.request_timeout == 0 {
            return Err(ConfigError::Invalid(
                "server.request_timeout must be > 0 seconds".to_string(),
            ));
        }

        let storage = &self.storage;
        if storage.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "storage.endpoint cannot be empty".to_string(),
            ));
        }
        if storage.endpoint.contains("://") && !storage.is_memory() {
            return Err(ConfigError::Invalid(format!(
                "storage.endpoint '{}' must not include a scheme; use storage.use_ssl",
                storage.endpoint
            )));
        }
        if storage.bucket.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "storage.bucket cannot be empty".to_string(),
            ));
        }
        if !storage.is_memory() {
            if storage.access_key.is_empty() {
                return Err(ConfigError::Invalid(
                    "storage.access_key cannot be empty".to_string(),
                ));
            }
            if storage.secret_key.is_empty() {
                return Err(ConfigError::Invalid(
                    "storage.secret_key cannot be empty".to_string(),
                ));
            }
        }
        if storage.key_prefix.trim().is_empty() || storage.key_prefix.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "storage.key_prefix '{}' must be non-empty and contain no '/'",
                storage.key_prefix
            )));
        }
        if storage.timeout == 0 {
            return Err(ConfigError::Invalid(
                "storage.timeout must be > 0 seconds".to_string(),
            ));
        }

        if self.jwt.secret.is_empty() {
            return Err(ConfigError::Invalid(
                "jwt.secret cannot be empty".to_string(),
            ));
        }
        if self.jwt.algorithm().is_none() {
            return Err(ConfigError::Invalid(format!(
                "jwt.algorithm '{}' is not supported (expected HS256, HS384 or HS512)",
                self.jwt.algorithm
            )));
        }

        let limits = &self.limits;
        if limits.max_upload_bytes == 0 || limits.max_source_bytes == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_upload_bytes and limits.max_source_bytes must be > 0".to_string(),
            ));
        }
        if limits.max_upload_bytes > self.server.max_body_size {
            return Err(ConfigError::Invalid(format!(
                "limits.max_upload_bytes ({}) exceeds server.max_body_size ({})",
                limits.max_upload_bytes, self.server.max_body_size
            )));
        }
        if limits.max_source_pixels == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_source_pixels must be > 0".to_string(),
            ));
        }
        if !(1..=100).contains(&limits.jpeg_quality) {
            return Err(ConfigError::Invalid(format!(
                "limits.jpeg_quality {} must be 1-100",
                limits.jpeg_quality
            )));
        }
        if limits.watermark_font_size.is_nan() || limits.watermark_font_size <= 0.0 {
            return Err(ConfigError::Invalid(
                "limits.watermark_font_size must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}
