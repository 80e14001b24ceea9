//! Configuration-driven construction tests

use crate::helpers::*;
use crate::mock_dependency::MockDependency;
use pretty_assertions::assert_eq;
use recovery_config::{load_config_from_path, ToolkitConfig};
use recovery_resilience::{
    CircuitBreaker, CircuitBreakerConfig, RateLimitAwareCaller, ResiliencePipeline, RetryExecutor,
    RetryPolicy,
};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

fn pipeline_from(config: &ToolkitConfig) -> ResiliencePipeline {
    let breaker = Arc::new(CircuitBreaker::new(
        "catalog",
        CircuitBreakerConfig::new(
            config.circuit_breaker.threshold,
            config.circuit_breaker.reset_timeout,
        ),
    ));
    let retry = RetryExecutor::new(
        "catalog",
        RetryPolicy::new(config.retry.max_retries, config.retry.base_delay),
    );
    ResiliencePipeline::new(breaker, retry)
}

/// Settings loaded from YAML drive breaker threshold and retry count
#[tokio::test]
async fn test_yaml_settings_drive_pipeline() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    write!(
        file,
        "circuit_breaker:\n  threshold: 1\n  reset_timeout: 1m\nretry:\n  max_retries: 2\n  base_delay: 5ms\n"
    )
    .unwrap();
    let config = load_config_from_path(file.path()).await.unwrap();

    let dependency = MockDependency::start().await;
    dependency.always("/catalog", 503).await;
    let client = json_client("catalog", dependency.uri());
    let pipeline = pipeline_from(&config);

    pipeline.execute(|| client.get("/catalog")).await.unwrap_err();

    assert_eq!(dependency.request_count().await, 3);
    assert!(pipeline.breaker().is_open());
    assert_eq!(pipeline.breaker().config().reset_timeout, Duration::from_secs(60));
}

/// TOML rate-limit settings drive the rate-limit caller
#[tokio::test]
async fn test_toml_rate_limit_settings() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    write!(file, "[rate_limit]\nmax_retries = 2\nbase_delay = \"5ms\"\n").unwrap();
    let config = load_config_from_path(file.path()).await.unwrap();

    let dependency = MockDependency::start().await;
    dependency.rate_limit_times("/catalog", 1, 2).await;
    dependency.serve_json("/catalog", json!(["a", "b"])).await;

    let caller = RateLimitAwareCaller::new(
        "catalog",
        RetryPolicy::new(config.rate_limit.max_retries, config.rate_limit.base_delay),
    );
    let client = json_client("catalog", dependency.uri());

    let body = caller
        .call_with_rate_limit_handling(|| client.get("/catalog"))
        .await
        .unwrap();

    assert_eq!(body, json!(["a", "b"]));
    assert_eq!(caller.policy().max_retries(), 2);
    assert_eq!(dependency.request_count().await, 3);
}
