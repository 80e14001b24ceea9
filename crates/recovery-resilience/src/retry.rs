//! Retry policy with exponential backoff.
//!
//! Attempt `n` that fails is followed by a wait of `base_delay * 2^(n-1)`
//! before attempt `n + 1`. The final failure is returned unchanged and is
//! never followed by a wait.

use recovery_core::ResilienceObserver;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff multiplier applied per attempt
const BACKOFF_FACTOR: u32 = 2;

/// Retry configuration. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: None,
        }
    }
}

impl RetryPolicy {
    /// Create a policy allowing `max_retries` retries after the first attempt
    #[must_use]
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay: None,
        }
    }

    /// Cap any single wait at `max_delay`
    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// Number of retries after the first attempt
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Wait before the first retry
    #[must_use]
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Upper bound on a single wait, if any
    #[must_use]
    pub fn max_delay(&self) -> Option<Duration> {
        self.max_delay
    }

    /// Total number of times an operation may be invoked
    #[must_use]
    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Wait after failed attempt `attempt` (1-indexed).
    ///
    /// Attempt 1 waits `base_delay`, attempt 2 waits twice that, and so on.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let factor = BACKOFF_FACTOR.checked_pow(attempt - 1).unwrap_or(u32::MAX);
        let delay = self.base_delay.checked_mul(factor).unwrap_or(Duration::MAX);

        match self.max_delay {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }
}

/// Runs operations under a [`RetryPolicy`].
///
/// Holds no per-call state; one executor can serve any number of
/// concurrent callers.
#[derive(Clone)]
pub struct RetryExecutor {
    name: String,
    policy: RetryPolicy,
    observer: Option<Arc<dyn ResilienceObserver>>,
}

impl fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl RetryExecutor {
    /// Create an executor identified by `name` in logs and metrics
    #[must_use]
    pub fn new(name: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            name: name.into(),
            policy,
            observer: None,
        }
    }

    /// Create with the default policy
    #[must_use]
    pub fn with_defaults(name: impl Into<String>) -> Self {
        Self::new(name, RetryPolicy::default())
    }

    /// Report retries to `observer`
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ResilienceObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Executor name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The policy in use
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute an operation, retrying every failure.
    ///
    /// # Errors
    /// Returns the error of the last attempt once all retries are exhausted
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.execute_if(operation, |_| true).await
    }

    /// Execute an operation, retrying only failures accepted by `should_retry`.
    ///
    /// Rejected failures are returned immediately without waiting.
    ///
    /// # Errors
    /// Returns the first non-retryable error, or the last error once all
    /// retries are exhausted
    pub async fn execute_if<F, Fut, T, E, P>(
        &self,
        mut operation: F,
        mut should_retry: P,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
        P: FnMut(&E) -> bool,
    {
        let mut attempt: u32 = 0;

        loop {
            attempt = attempt.saturating_add(1);

            let error = match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        debug!(operation = %self.name, attempt = attempt, "Retry succeeded");
                    }
                    return Ok(result);
                }
                Err(error) => error,
            };

            if !should_retry(&error) {
                debug!(
                    operation = %self.name,
                    attempt = attempt,
                    error = %error,
                    "Error is not retryable"
                );
                return Err(error);
            }

            if attempt > self.policy.max_retries {
                warn!(
                    operation = %self.name,
                    attempts = attempt,
                    error = %error,
                    "Retries exhausted"
                );
                if let Some(observer) = &self.observer {
                    observer.on_retries_exhausted(&self.name, attempt);
                }
                return Err(error);
            }

            let delay = self.policy.delay_for_attempt(attempt);
            warn!(
                operation = %self.name,
                attempt = attempt,
                max_retries = self.policy.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retrying after error"
            );
            if let Some(observer) = &self.observer {
                observer.on_retry(&self.name, attempt, delay);
            }

            tokio::time::sleep(delay).await;
        }
    }
}

/// Run `operation` with up to `max_retries` retries starting at `base_delay`.
///
/// # Errors
/// Returns the error of the last attempt once all retries are exhausted
pub async fn retry_with_backoff<F, Fut, T, E>(
    operation: F,
    max_retries: u32,
    base_delay: Duration,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    RetryExecutor::new("retry", RetryPolicy::new(max_retries, base_delay))
        .execute(operation)
        .await
}
