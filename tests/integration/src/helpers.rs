//! Test helper utilities for integration tests

use async_trait::async_trait;
use once_cell::sync::Lazy;
use recovery_core::{DataSource, RecoveryResult};
use recovery_http::JsonClient;
use recovery_resilience::CircuitBreaker;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Initialize tracing for tests (only once)
static TRACING: Lazy<()> = Lazy::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
});

/// Initialize tracing for tests
pub fn init_tracing() {
    Lazy::force(&TRACING);
}

/// JSON client for `base_url` with a generous per-request timeout
pub fn json_client(dependency: &str, base_url: impl Into<String>) -> JsonClient {
    JsonClient::new(dependency, base_url, Duration::from_secs(5)).expect("Failed to create client")
}

/// Data source that routes every fetch through a shared circuit breaker
pub struct GuardedSource {
    /// Wrapped client
    pub client: JsonClient,
    /// Breaker shared with other callers of the same dependency
    pub breaker: Arc<CircuitBreaker>,
}

#[async_trait]
impl DataSource<Value> for GuardedSource {
    async fn fetch(&self, key: &str) -> RecoveryResult<Value> {
        let client = &self.client;
        self.breaker.execute(move || client.get(key)).await
    }
}
