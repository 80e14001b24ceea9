//! # Recovery Telemetry
//!
//! Observability for the recovery toolkit:
//! - Structured logging through `tracing-subscriber`
//! - Prometheus counters fed by resilience events

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod logging;
pub mod metrics;

// Re-export main types
pub use logging::{init_logging, LoggingConfig, LoggingError};
pub use metrics::{MetricsError, ResilienceMetrics};
