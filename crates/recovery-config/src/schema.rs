//! Configuration schema definitions.
//!
//! Every field has a default so a minimal (or empty) file is valid.
//! Durations are written in humantime form: `"100ms"`, `"30s"`, `"5m"`.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::{Validate, ValidationError};

/// Root configuration for the toolkit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ToolkitConfig {
    /// Circuit breaker policy
    #[validate(nested)]
    pub circuit_breaker: BreakerSettings,

    /// Generic retry policy
    #[validate(nested)]
    pub retry: RetrySettings,

    /// Retry policy for rate-limited calls
    #[validate(nested)]
    pub rate_limit: RetrySettings,

    /// Fallback cache settings
    #[validate(nested)]
    pub fallback: FallbackSettings,

    /// Logging settings
    pub logging: LoggingSettings,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            circuit_breaker: BreakerSettings::default(),
            retry: RetrySettings::default(),
            rate_limit: RetrySettings {
                max_retries: 3,
                base_delay: Duration::from_secs(1),
                max_delay: None,
            },
            fallback: FallbackSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Circuit breaker policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct BreakerSettings {
    /// Consecutive failures that open the circuit
    #[validate(range(min = 1))]
    pub threshold: u32,

    /// How long the circuit stays open before a probe is allowed
    #[serde(with = "humantime_serde")]
    #[validate(custom(function = "non_zero_duration"))]
    pub reset_timeout: Duration,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            threshold: 5,
            reset_timeout: Duration::from_secs(30),
        }
    }
}

/// Retry policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RetrySettings {
    /// Retries after the first attempt
    #[validate(range(max = 16))]
    pub max_retries: u32,

    /// Wait before the first retry; doubles on each subsequent one
    #[serde(with = "humantime_serde")]
    #[validate(custom(function = "non_zero_duration"))]
    pub base_delay: Duration,

    /// Optional cap on a single wait
    #[serde(with = "humantime_serde")]
    pub max_delay: Option<Duration>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: None,
        }
    }
}

/// Fallback cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct FallbackSettings {
    /// Maximum cached entries
    #[validate(range(min = 1))]
    pub cache_capacity: usize,

    /// How long a cached entry stays usable
    #[serde(with = "humantime_serde")]
    #[validate(custom(function = "non_zero_duration"))]
    pub cache_ttl: Duration,

    /// Refresh the cache with every live value
    pub write_through: bool,
}

impl Default for FallbackSettings {
    fn default() -> Self {
        Self {
            cache_capacity: 1000,
            cache_ttl: Duration::from_secs(300),
            write_through: false,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive, e.g. `info` or `recovery_resilience=debug`
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

fn non_zero_duration(value: &Duration) -> Result<(), ValidationError> {
    if value.is_zero() {
        let mut error = ValidationError::new("non_zero_duration");
        error.message = Some("duration must be greater than zero".into());
        return Err(error);
    }
    Ok(())
}
