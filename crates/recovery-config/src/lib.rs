//! # Recovery Config
//!
//! Typed configuration for the recovery toolkit:
//! - YAML or TOML files, chosen by extension
//! - `RECOVERY_*` environment overrides
//! - Validation of thresholds, delays and capacities

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod loader;
pub mod schema;

pub use loader::{
    apply_overrides, apply_overrides_from, load_config, load_config_from_path,
    load_config_from_path_with, load_config_with, parse_config,
    ConfigError, ConfigFormat, CONFIG_PATH_ENV,
};
pub use schema::{
    BreakerSettings, FallbackSettings, LogFormat, LoggingSettings, RetrySettings, ToolkitConfig,
};
