//! Configuration loading from disk and the environment.

use crate::schema::ToolkitConfig;
use humantime_serde::re::humantime;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use validator::Validate;

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "RECOVERY_CONFIG";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// YAML parse failure
    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// TOML parse failure
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// Unknown file extension
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// An environment override could not be parsed
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidOverride {
        /// Variable name
        key: String,
        /// Raw value
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// Values parsed but break a rule
    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.yaml` / `.yml`
    Yaml,
    /// `.toml`
    Toml,
}

impl ConfigFormat {
    /// Detect the format from a file extension
    ///
    /// # Errors
    /// Returns `UnsupportedFormat` for anything but YAML or TOML
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "toml" => Ok(Self::Toml),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Parse and validate configuration text.
///
/// # Errors
/// Returns a parse or validation error
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<ToolkitConfig, ConfigError> {
    let config: ToolkitConfig = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
        ConfigFormat::Toml => toml::from_str(content)?,
    };
    config.validate()?;
    Ok(config)
}

/// Load, apply environment overrides to, and validate a config file.
///
/// # Errors
/// Returns an IO, parse, override, or validation error
pub async fn load_config_from_path(path: impl AsRef<Path>) -> Result<ToolkitConfig, ConfigError> {
    load_config_from_path_with(path, env_lookup).await
}

/// Load a config file, applying overrides read through `lookup`.
///
/// # Errors
/// Returns an IO, parse, override, or validation error
pub async fn load_config_from_path_with<L>(
    path: impl AsRef<Path>,
    lookup: L,
) -> Result<ToolkitConfig, ConfigError>
where
    L: Fn(&str) -> Option<String>,
{
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path)?;
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let config = parse_config(&content, format)?;
    let config = apply_overrides_from(config, lookup)?;
    info!(path = %path.display(), "Loaded configuration");
    Ok(config)
}

/// Load configuration from `RECOVERY_CONFIG` if set, otherwise defaults,
/// then apply environment overrides.
///
/// # Errors
/// Returns an IO, parse, override, or validation error
pub async fn load_config() -> Result<ToolkitConfig, ConfigError> {
    load_config_with(env_lookup).await
}

/// [`load_config`] with variables read through `lookup` instead of the
/// process environment.
///
/// # Errors
/// Returns an IO, parse, override, or validation error
pub async fn load_config_with<L>(lookup: L) -> Result<ToolkitConfig, ConfigError>
where
    L: Fn(&str) -> Option<String>,
{
    match lookup(CONFIG_PATH_ENV) {
        Some(path) if !path.is_empty() => load_config_from_path_with(path, lookup).await,
        _ => {
            debug!("No config file set, using defaults");
            apply_overrides_from(ToolkitConfig::default(), lookup)
        }
    }
}

/// Apply `RECOVERY_*` overrides from the process environment.
///
/// # Errors
/// Returns `InvalidOverride` or a validation error
pub fn apply_overrides(config: ToolkitConfig) -> Result<ToolkitConfig, ConfigError> {
    apply_overrides_from(config, env_lookup)
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Apply overrides read through `lookup`, then re-validate.
///
/// # Errors
/// Returns `InvalidOverride` or a validation error
pub fn apply_overrides_from<L>(mut config: ToolkitConfig, lookup: L) -> Result<ToolkitConfig, ConfigError>
where
    L: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("RECOVERY_BREAKER_THRESHOLD") {
        config.circuit_breaker.threshold = parse_number("RECOVERY_BREAKER_THRESHOLD", &value)?;
    }
    if let Some(value) = lookup("RECOVERY_BREAKER_RESET_TIMEOUT") {
        config.circuit_breaker.reset_timeout = parse_duration("RECOVERY_BREAKER_RESET_TIMEOUT", &value)?;
    }
    if let Some(value) = lookup("RECOVERY_RETRY_MAX_RETRIES") {
        config.retry.max_retries = parse_number("RECOVERY_RETRY_MAX_RETRIES", &value)?;
    }
    if let Some(value) = lookup("RECOVERY_RETRY_BASE_DELAY") {
        config.retry.base_delay = parse_duration("RECOVERY_RETRY_BASE_DELAY", &value)?;
    }
    if let Some(value) = lookup("RECOVERY_LOG_LEVEL") {
        config.logging.level = value;
    }

    config.validate()?;
    Ok(config)
}

fn parse_number(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::InvalidOverride {
        key: key.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_duration(key: &str, value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value.trim()).map_err(|e| ConfigError::InvalidOverride {
        key: key.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}
