//! Rate-limit-aware calls.
//!
//! Retries only when the callee answers "too many requests"; every other
//! failure is returned on the spot.

use crate::retry::{RetryExecutor, RetryPolicy};
use recovery_core::{RateLimitSignal, ResilienceObserver};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Retries 429-class failures with the standard exponential backoff
#[derive(Debug, Clone)]
pub struct RateLimitAwareCaller {
    executor: RetryExecutor,
}

impl RateLimitAwareCaller {
    /// Create a caller identified by `name`
    #[must_use]
    pub fn new(name: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            executor: RetryExecutor::new(name, policy),
        }
    }

    /// Report retries to `observer`
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ResilienceObserver>) -> Self {
        self.executor = self.executor.with_observer(observer);
        self
    }

    /// The policy in use
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        self.executor.policy()
    }

    /// Issue `request`, retrying while it reports being rate limited.
    ///
    /// # Errors
    /// Returns the first failure that is not a rate-limit signal, or the last
    /// rate-limit failure once retries are exhausted
    pub async fn call_with_rate_limit_handling<F, Fut, T, E>(&self, request: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RateLimitSignal + fmt::Display,
    {
        self.executor
            .execute_if(request, RateLimitSignal::is_rate_limited)
            .await
    }
}
