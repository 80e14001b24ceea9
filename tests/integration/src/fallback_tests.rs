//! Graceful degradation integration tests

use crate::helpers::*;
use crate::mock_dependency::MockDependency;
use pretty_assertions::assert_eq;
use recovery_core::DataOrigin;
use recovery_resilience::{CircuitBreaker, CircuitBreakerConfig, FallbackAccessor, MemoryCache};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

fn cache() -> Arc<MemoryCache<Value>> {
    Arc::new(MemoryCache::new(100, Duration::from_secs(60)))
}

/// Live data is written through, then served from cache during an outage
#[tokio::test]
async fn test_cache_serves_during_outage() {
    init_tracing();
    let dependency = MockDependency::start().await;
    dependency.serve_json("/profile", json!({"name": "Ada"})).await;

    let cache = cache();
    let accessor = FallbackAccessor::with_default(
        "profiles",
        json_client("profiles", dependency.uri()),
        cache.clone(),
        Value::Null,
    )
    .with_write_through(true);

    let live = accessor.get_data_with_fallback("profile").await;
    assert_eq!(live.source, DataOrigin::Live);
    assert_eq!(live.data, json!({"name": "Ada"}));
    assert_eq!(cache.len().await, 1);

    dependency.reset().await;
    dependency.always("/profile", 503).await;

    let degraded = accessor.get_data_with_fallback("profile").await;
    assert_eq!(degraded.source, DataOrigin::Cache);
    assert_eq!(degraded.data, json!({"name": "Ada"}));
    assert_eq!(dependency.request_count().await, 1);
}

/// Without write-through the live path leaves the cache untouched
#[tokio::test]
async fn test_live_path_leaves_cache_alone() {
    let dependency = MockDependency::start().await;
    dependency.serve_json("/profile", json!({"name": "Ada"})).await;

    let cache = cache();
    let accessor = FallbackAccessor::with_default(
        "profiles",
        json_client("profiles", dependency.uri()),
        cache.clone(),
        Value::Null,
    );

    let result = accessor.get_data_with_fallback("profile").await;

    assert_eq!(result.source, DataOrigin::Live);
    assert!(cache.is_empty().await);
}

/// Outage with an empty cache yields the default value
#[tokio::test]
async fn test_default_when_everything_fails() {
    let dependency = MockDependency::start().await;
    dependency.always("/profile", 500).await;

    let accessor = FallbackAccessor::with_default(
        "profiles",
        json_client("profiles", dependency.uri()),
        cache(),
        json!({"name": "guest"}),
    );

    let result = accessor.get_data_with_fallback("profile").await;

    assert_eq!(result.source, DataOrigin::Default);
    assert_eq!(result.data, json!({"name": "guest"}));
    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({"data": {"name": "guest"}, "source": "default"})
    );
}

/// An open breaker sends reads straight to the cache without touching the network
#[tokio::test]
async fn test_open_breaker_falls_back_without_request() {
    let dependency = MockDependency::start().await;
    dependency.serve_json("/profile", json!({"name": "Ada"})).await;

    let cache = cache();
    recovery_core::CacheStore::set(&*cache, "profile", json!({"name": "cached"}))
        .await
        .unwrap();

    let breaker = Arc::new(CircuitBreaker::new(
        "profiles",
        CircuitBreakerConfig::new(1, Duration::from_secs(30)),
    ));
    breaker.force_open();

    let source = GuardedSource {
        client: json_client("profiles", dependency.uri()),
        breaker: breaker.clone(),
    };
    let accessor = FallbackAccessor::with_default("profiles", source, cache, Value::Null);

    let result = accessor.get_data_with_fallback("profile").await;

    assert_eq!(result.source, DataOrigin::Cache);
    assert_eq!(result.data, json!({"name": "cached"}));
    assert_eq!(dependency.request_count().await, 0);
    assert_eq!(breaker.stats().rejected_calls, 1);
}
