//! Circuit breaker and retry integration tests
//!
//! The breaker wraps the retry loop: retries absorb blips, the breaker
//! counts one failure per exhausted retry sequence.

use crate::helpers::*;
use crate::mock_dependency::MockDependency;
use pretty_assertions::assert_eq;
use recovery_core::RecoveryError;
use recovery_resilience::{
    CircuitBreaker, CircuitBreakerConfig, ResiliencePipeline, RetryExecutor, RetryPolicy,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn pipeline(threshold: u32, reset_timeout: Duration) -> ResiliencePipeline {
    let breaker = Arc::new(CircuitBreaker::new(
        "inventory",
        CircuitBreakerConfig::new(threshold, reset_timeout),
    ));
    ResiliencePipeline::new(
        breaker,
        RetryExecutor::new("inventory", RetryPolicy::new(1, Duration::from_millis(10))),
    )
}

/// A single blip is retried and never reaches the breaker
#[tokio::test]
async fn test_blip_absorbed_by_retry() {
    init_tracing();
    let dependency = MockDependency::start().await;
    dependency.fail_times("/stock", 503, 1).await;
    dependency.serve_json("/stock", json!({"count": 7})).await;

    let client = json_client("inventory", dependency.uri());
    let pipeline = pipeline(1, Duration::from_secs(30));

    let body = pipeline.execute(|| client.get("/stock")).await.unwrap();

    assert_eq!(body, json!({"count": 7}));
    assert!(pipeline.breaker().is_closed());
    assert_eq!(dependency.request_count().await, 2);
}

/// Sustained outage opens the breaker, after which no requests are sent
#[tokio::test]
async fn test_outage_opens_breaker() {
    let dependency = MockDependency::start().await;
    dependency.always("/stock", 503).await;

    let client = json_client("inventory", dependency.uri());
    let pipeline = pipeline(2, Duration::from_secs(30));

    for _ in 0..2 {
        let err = pipeline.execute(|| client.get("/stock")).await.unwrap_err();
        assert_eq!(err.status_code(), 503);
        assert!(!err.is_circuit_open());
    }
    assert!(pipeline.breaker().is_open());
    assert_eq!(dependency.request_count().await, 4);

    let rejected = pipeline.execute(|| client.get("/stock")).await.unwrap_err();
    assert!(rejected.is_circuit_open());
    assert_eq!(rejected.status_code(), 503);
    assert_eq!(dependency.request_count().await, 4);

    let stats = pipeline.breaker().stats();
    assert_eq!(stats.rejected_calls, 1);
    assert_eq!(stats.failures, 2);
}

/// After the reset timeout a successful probe closes the breaker
#[tokio::test]
async fn test_recovers_after_reset_timeout() {
    let dependency = MockDependency::start().await;
    dependency.always("/stock", 500).await;

    let client = json_client("inventory", dependency.uri());
    let pipeline = pipeline(1, Duration::from_millis(100));

    pipeline.execute(|| client.get("/stock")).await.unwrap_err();
    assert!(pipeline.breaker().is_open());

    dependency.reset().await;
    dependency.serve_json("/stock", json!({"count": 1})).await;

    // Still inside the reset timeout
    let early = pipeline.execute(|| client.get("/stock")).await.unwrap_err();
    assert!(early.is_circuit_open());
    assert_eq!(dependency.request_count().await, 0);

    tokio::time::sleep(Duration::from_millis(150)).await;

    let body = pipeline.execute(|| client.get("/stock")).await.unwrap();
    assert_eq!(body, json!({"count": 1}));
    assert!(pipeline.breaker().is_closed());
    assert_eq!(dependency.request_count().await, 1);
}

/// Client errors skip the retry loop when the executor classifies them
#[tokio::test]
async fn test_client_error_not_retried() {
    let dependency = MockDependency::start().await;
    dependency.always("/stock", 404).await;

    let client = json_client("inventory", dependency.uri());
    let executor = RetryExecutor::new("inventory", RetryPolicy::new(3, Duration::from_millis(10)));

    let err = executor
        .execute_if(|| client.get("/stock"), RecoveryError::is_retryable)
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 404);
    assert_eq!(dependency.request_count().await, 1);
}
