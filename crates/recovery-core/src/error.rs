//! Error types for the recovery toolkit.

use std::time::Duration;
use thiserror::Error;

/// Result type for toolkit operations.
pub type RecoveryResult<T> = Result<T, RecoveryError>;

/// Rejection produced by a circuit breaker that is short-circuiting calls.
///
/// This is never produced by the protected operation itself, so callers can
/// always tell a fail-fast rejection apart from a real dependency failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Circuit breaker is open")]
pub struct CircuitOpenError {
    /// Name of the dependency the breaker protects
    pub dependency: String,
}

impl CircuitOpenError {
    /// Create a rejection for the named dependency
    pub fn new(dependency: impl Into<String>) -> Self {
        Self {
            dependency: dependency.into(),
        }
    }
}

/// Classifies a failure as a "too many requests" signal.
///
/// Implemented by error types that can carry an HTTP 429 (or equivalent)
/// response, so a rate-limit-aware caller knows which failures to retry.
pub trait RateLimitSignal {
    /// Whether this failure means the callee is throttling us
    fn is_rate_limited(&self) -> bool;
}

/// Errors surfaced by operations protected with the toolkit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecoveryError {
    /// The protected dependency failed
    #[error("{dependency}: {message}")]
    Upstream {
        /// Dependency that failed
        dependency: String,
        /// Failure description
        message: String,
        /// HTTP status reported by the dependency, if any
        status_code: Option<u16>,
    },

    /// The dependency rejected the call as rate limited
    #[error("Rate limited: {message}")]
    RateLimited {
        /// Failure description
        message: String,
        /// Delay suggested by the dependency, if any
        retry_after: Option<Duration>,
    },

    /// The operation did not finish in time
    #[error("Operation timed out after {duration:?}")]
    Timeout {
        /// Deadline that was exceeded
        duration: Duration,
    },

    /// A circuit breaker rejected the call without invoking the dependency
    #[error(transparent)]
    CircuitOpen(#[from] CircuitOpenError),

    /// Cache lookup or store failed
    #[error("Cache error: {message}")]
    Cache {
        /// Failure description
        message: String,
    },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Configuration {
        /// Failure description
        message: String,
    },
}

impl RecoveryError {
    /// Create an upstream failure
    pub fn upstream(
        dependency: impl Into<String>,
        message: impl Into<String>,
        status_code: Option<u16>,
    ) -> Self {
        Self::Upstream {
            dependency: dependency.into(),
            message: message.into(),
            status_code,
        }
    }

    /// Create a rate-limit failure
    pub fn rate_limited(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self::RateLimited {
            message: message.into(),
            retry_after,
        }
    }

    /// Create a timeout failure
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout { duration }
    }

    /// Create a cache failure
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether the failure is transient and worth retrying.
    ///
    /// Circuit-open rejections are not: the breaker already knows the
    /// dependency is down.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Upstream { status_code, .. } => {
                status_code.map_or(true, |code| code == 429 || code >= 500)
            }
            Self::RateLimited { .. } | Self::Timeout { .. } => true,
            Self::CircuitOpen(_)
            | Self::Cache { .. }
            | Self::Configuration { .. } => false,
        }
    }

    /// Whether this is a circuit breaker rejection
    #[must_use]
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen(_))
    }

    /// HTTP status to report at the service boundary.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Upstream { status_code, .. } => status_code.unwrap_or(502),
            Self::RateLimited { .. } => 429,
            Self::Timeout { .. } => 504,
            Self::CircuitOpen(_) => 503,
            Self::Cache { .. } | Self::Configuration { .. } => 500,
        }
    }
}

impl RateLimitSignal for RecoveryError {
    fn is_rate_limited(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Upstream { status_code, .. } => *status_code == Some(429),
            _ => false,
        }
    }
}
