//! HTTP source integration tests
//!
//! Drives `HttpSource` and `JsonClient` against wiremock and a listener that
//! never answers.

use crate::helpers::*;
use crate::mock_dependency::MockDependency;
use pretty_assertions::assert_eq;
use recovery_core::{DataSource, RateLimitSignal, RecoveryError};
use recovery_http::{HttpSource, JsonClient};
use recovery_resilience::{
    CircuitBreaker, CircuitBreakerConfig, RateLimitAwareCaller, RetryExecutor, RetryPolicy,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

fn source(
    client: JsonClient,
    threshold: u32,
    max_retries: u32,
    max_rate_limit_retries: u32,
) -> (HttpSource, Arc<CircuitBreaker>) {
    let breaker = Arc::new(CircuitBreaker::new(
        "ledger",
        CircuitBreakerConfig::new(threshold, Duration::from_secs(30)),
    ));
    let retry = RetryExecutor::new("ledger", RetryPolicy::new(max_retries, Duration::from_millis(10)));
    let rate_limit = RateLimitAwareCaller::new(
        "ledger",
        RetryPolicy::new(max_rate_limit_retries, Duration::from_millis(10)),
    );
    let source = HttpSource::new(client, breaker.clone(), retry, rate_limit);
    (source, breaker)
}

/// Bind a listener that accepts connections and never writes a byte
async fn silent_listener() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{addr}")
}

/// 429, 429, 200 is absorbed by the rate-limit layer
#[tokio::test]
async fn test_rate_limits_retried_until_success() {
    init_tracing();
    let dependency = MockDependency::start().await;
    dependency.rate_limit_times("/balance", 1, 2).await;
    dependency.serve_json("/balance", json!({"amount": 10})).await;

    let (source, breaker) = source(json_client("ledger", dependency.uri()), 1, 0, 3);

    let body = source.fetch("balance").await.unwrap();

    assert_eq!(body, json!({"amount": 10}));
    assert_eq!(dependency.request_count().await, 3);
    assert!(breaker.is_closed());
}

/// A 503 is retried by the transient-failure layer
#[tokio::test]
async fn test_server_error_retried_by_outer_layer() {
    let dependency = MockDependency::start().await;
    dependency.fail_times("/balance", 503, 1).await;
    dependency.serve_json("/balance", json!({"amount": 10})).await;

    let (source, breaker) = source(json_client("ledger", dependency.uri()), 1, 2, 3);

    let body = source.fetch("balance").await.unwrap();

    assert_eq!(body, json!({"amount": 10}));
    assert_eq!(dependency.request_count().await, 2);
    assert!(breaker.is_closed());
}

/// A 404 is returned after a single request
#[tokio::test]
async fn test_client_error_not_retried() {
    let dependency = MockDependency::start().await;
    dependency.always("/balance", 404).await;

    let (source, _breaker) = source(json_client("ledger", dependency.uri()), 5, 3, 3);

    let err = source.fetch("balance").await.unwrap_err();

    assert_eq!(err.status_code(), 404);
    assert!(!err.is_retryable());
    assert_eq!(dependency.request_count().await, 1);
}

/// An exhausted retry sequence opens the breaker; the next fetch sends nothing
#[tokio::test]
async fn test_exhausted_retries_open_breaker() {
    let dependency = MockDependency::start().await;
    dependency.always("/balance", 503).await;

    let (source, breaker) = source(json_client("ledger", dependency.uri()), 1, 1, 3);

    let err = source.fetch("balance").await.unwrap_err();
    assert_eq!(err.status_code(), 503);
    assert!(!err.is_circuit_open());
    assert_eq!(dependency.request_count().await, 2);
    assert!(breaker.is_open());

    let rejected = source.fetch("balance").await.unwrap_err();
    assert!(rejected.is_circuit_open());
    assert_eq!(rejected.status_code(), 503);
    assert_eq!(dependency.request_count().await, 2);
    assert_eq!(breaker.stats().rejected_calls, 1);
}

/// Exhausted rate-limit retries keep the server's Retry-After hint
#[tokio::test]
async fn test_exhausted_rate_limit_keeps_retry_after() {
    let dependency = MockDependency::start().await;
    dependency.rate_limit_times("/balance", 2, 10).await;

    let (source, _breaker) = source(json_client("ledger", dependency.uri()), 5, 2, 1);

    let err = source.fetch("balance").await.unwrap_err();

    assert!(err.is_rate_limited());
    assert!(matches!(
        err,
        RecoveryError::RateLimited { retry_after: Some(wait), .. } if wait == Duration::from_secs(2)
    ));
    // the transient layer leaves rate limits to the inner caller
    assert_eq!(dependency.request_count().await, 2);
}

/// A server that never replies surfaces as a 504 timeout
#[tokio::test]
async fn test_unanswered_request_times_out() {
    let base_url = silent_listener().await;
    let timeout = Duration::from_millis(50);
    let client = JsonClient::new("ledger", base_url, timeout).unwrap();

    let err = client.get("balance").await.unwrap_err();

    assert_eq!(err, RecoveryError::timeout(timeout));
    assert_eq!(err.status_code(), 504);
    assert!(err.is_retryable());
}

/// Timeouts count as transient failures and trip the breaker
#[tokio::test]
async fn test_timeout_through_source() {
    let base_url = silent_listener().await;
    let timeout = Duration::from_millis(50);
    let client = JsonClient::new("ledger", base_url, timeout).unwrap();
    let (source, breaker) = source(client, 1, 1, 3);

    let err = source.fetch("balance").await.unwrap_err();

    assert_eq!(err, RecoveryError::timeout(timeout));
    assert_eq!(err.status_code(), 504);
    assert!(breaker.is_open());
}
