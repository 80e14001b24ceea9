//! HTTP data source guarded by the full resilience stack.

use crate::client::JsonClient;
use async_trait::async_trait;
use recovery_core::{DataSource, RateLimitSignal, RecoveryError, RecoveryResult};
use recovery_resilience::{CircuitBreaker, RateLimitAwareCaller, RetryExecutor};
use serde_json::Value;
use std::sync::Arc;

/// Fetches JSON through, outermost first: circuit breaker, transient-failure
/// retry, rate-limit retry, request.
///
/// The transient retry skips rate-limit failures, which the inner caller
/// already retried with its own policy.
pub struct HttpSource {
    client: JsonClient,
    breaker: Arc<CircuitBreaker>,
    retry: RetryExecutor,
    rate_limit: RateLimitAwareCaller,
}

impl HttpSource {
    /// Compose `client` with the given breaker and retry policies
    #[must_use]
    pub fn new(
        client: JsonClient,
        breaker: Arc<CircuitBreaker>,
        retry: RetryExecutor,
        rate_limit: RateLimitAwareCaller,
    ) -> Self {
        Self {
            client,
            breaker,
            retry,
            rate_limit,
        }
    }

    /// Whether the transient-failure layer should retry `error`
    fn is_transient(error: &RecoveryError) -> bool {
        error.is_retryable() && !error.is_rate_limited()
    }
}

#[async_trait]
impl DataSource<Value> for HttpSource {
    async fn fetch(&self, key: &str) -> RecoveryResult<Value> {
        let this = self;
        self.breaker
            .execute(move || {
                this.retry.execute_if(
                    move || {
                        this.rate_limit
                            .call_with_rate_limit_handling(move || this.client.get(key))
                    },
                    HttpSource::is_transient,
                )
            })
            .await
    }
}
