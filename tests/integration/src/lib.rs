//! Integration tests for the recovery toolkit
//!
//! Exercises the toolkit against real HTTP round trips served by wiremock:
//! - Rate-limit retries
//! - HTTP status and timeout classification
//! - Circuit breaker around retries
//! - Fallback to cache and default values
//! - Metrics observer wiring
//! - Configuration-driven construction

pub mod helpers;

// Re-export commonly used items
pub use helpers::*;
pub use mock_dependency::*;

#[cfg(test)]
mod config_tests;
#[cfg(test)]
mod fallback_tests;
#[cfg(test)]
mod http_source_tests;
#[cfg(test)]
mod pipeline_tests;
