//! Breaker-around-retry composition.
//!
//! Retries absorb transient blips before the breaker sees an outcome; the
//! breaker only counts a failure once every retry is spent, and fails fast
//! without entering the retry loop while open.

use crate::circuit_breaker::CircuitBreaker;
use crate::retry::RetryExecutor;
use recovery_core::CircuitOpenError;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// A shared circuit breaker wrapped around a retry executor
#[derive(Debug, Clone)]
pub struct ResiliencePipeline {
    breaker: Arc<CircuitBreaker>,
    retry: RetryExecutor,
}

impl ResiliencePipeline {
    /// Compose `breaker` (shared with other call paths to the same
    /// dependency) with `retry`
    #[must_use]
    pub fn new(breaker: Arc<CircuitBreaker>, retry: RetryExecutor) -> Self {
        Self { breaker, retry }
    }

    /// The breaker guarding this pipeline
    #[must_use]
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// The retry executor inside the breaker
    #[must_use]
    pub fn retry(&self) -> &RetryExecutor {
        &self.retry
    }

    /// Execute `operation` with retries, through the breaker.
    ///
    /// # Errors
    /// Returns the breaker's rejection, or the last operation error once
    /// retries are exhausted
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<CircuitOpenError> + fmt::Display,
    {
        self.breaker
            .execute(|| self.retry.execute(operation))
            .await
    }
}
