//! # Recovery Probe
//!
//! Fetches JSON from an HTTP endpoint through the recovery toolkit: circuit
//! breaker, retry with backoff, rate-limit handling and fallback to cache or
//! a default value.
//!
//! ## Usage
//!
//! ```bash
//! # Fetch http://localhost:8080/users/1 once
//! recovery-probe --url http://localhost:8080 --key users/1
//!
//! # Repeat five times with a config file, print JSON and metrics
//! recovery-probe -c recovery.yaml -u http://localhost:8080 -k users/1 -n 5 --json --metrics
//!
//! # Override settings from the environment
//! RECOVERY_BREAKER_THRESHOLD=2 recovery-probe -u http://localhost:8080
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use recovery_config::{load_config, load_config_from_path, LogFormat, ToolkitConfig};
use recovery_core::ResilienceObserver;
use recovery_http::{HttpSource, JsonClient};
use recovery_resilience::{
    CircuitBreaker, CircuitBreakerConfig, FallbackAccessor, MemoryCache, RateLimitAwareCaller,
    RetryExecutor, RetryPolicy,
};
use recovery_telemetry::{init_logging, LoggingConfig, ResilienceMetrics};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Probe an HTTP dependency through the recovery toolkit
#[derive(Parser, Debug)]
#[command(name = "recovery-probe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (YAML or TOML); defaults to `$RECOVERY_CONFIG`
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base URL of the dependency
    #[arg(short = 'u', long, env = "RECOVERY_PROBE_URL")]
    url: String,

    /// Key appended to the base URL
    #[arg(short = 'k', long, default_value = "")]
    key: String,

    /// Number of fetches to perform
    #[arg(short = 'n', long, default_value_t = 1)]
    repeat: u32,

    /// Pause between fetches
    #[arg(long, default_value = "1s", value_parser = humantime_duration)]
    interval: Duration,

    /// Request timeout
    #[arg(long, default_value = "10s", value_parser = humantime_duration)]
    timeout: Duration,

    /// Print Prometheus metrics after the last fetch
    #[arg(long)]
    metrics: bool,

    /// Output in JSON format
    #[arg(long)]
    json: bool,

    /// Increase output verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn humantime_duration(value: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(value).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config_from_path(path)
            .await
            .with_context(|| format!("loading {}", path.display()))?,
        None => load_config().await.context("loading configuration")?,
    };

    init_logging(&logging_config(&cli, &config))?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        url = %cli.url,
        "Starting recovery probe"
    );

    run(cli, config).await
}

fn logging_config(cli: &Cli, config: &ToolkitConfig) -> LoggingConfig {
    let level = match cli.verbose {
        0 => config.logging.level.clone(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    LoggingConfig::new(level)
        .with_json(cli.json || config.logging.format == LogFormat::Json)
        .with_target(cli.verbose > 1)
}

async fn run(cli: Cli, config: ToolkitConfig) -> Result<()> {
    let metrics = ResilienceMetrics::new()?;
    let observer: Arc<dyn ResilienceObserver> = Arc::new(metrics.clone());
    let dependency = dependency_name(&cli.url);

    let breaker = Arc::new(
        CircuitBreaker::new(
            dependency.clone(),
            CircuitBreakerConfig::new(
                config.circuit_breaker.threshold,
                config.circuit_breaker.reset_timeout,
            ),
        )
        .with_observer(observer.clone()),
    );
    let retry = RetryExecutor::new(dependency.clone(), policy(&config.retry))
        .with_observer(observer.clone());
    let rate_limit = RateLimitAwareCaller::new(dependency.clone(), policy(&config.rate_limit))
        .with_observer(observer.clone());

    let client = JsonClient::new(dependency.clone(), cli.url.clone(), cli.timeout)
        .context("building HTTP client")?;
    let source = HttpSource::new(client, breaker.clone(), retry, rate_limit);
    let cache = MemoryCache::<Value>::new(config.fallback.cache_capacity, config.fallback.cache_ttl);

    let accessor = FallbackAccessor::with_default(dependency, source, cache, Value::Null)
        .with_write_through(config.fallback.write_through)
        .with_observer(observer);

    for round in 1..=cli.repeat.max(1) {
        if round > 1 {
            tokio::time::sleep(cli.interval).await;
        }

        let result = accessor.get_data_with_fallback(&cli.key).await;
        if cli.json {
            println!("{}", serde_json::to_string(&result)?);
        } else {
            println!("[{round}] source: {}", result.source);
            println!("{}", serde_json::to_string_pretty(&result.data)?);
        }
    }

    let stats = breaker.stats();
    info!(
        breaker = %breaker.name(),
        state = %stats.state,
        total_calls = stats.total_calls,
        rejected_calls = stats.rejected_calls,
        failures = stats.failures,
        "Probe finished"
    );

    if cli.metrics {
        print!("{}", metrics.render()?);
    }

    Ok(())
}

fn policy(settings: &recovery_config::RetrySettings) -> RetryPolicy {
    let policy = RetryPolicy::new(settings.max_retries, settings.base_delay);
    match settings.max_delay {
        Some(cap) => policy.with_max_delay(cap),
        None => policy,
    }
}

/// Host part of `url`, used to name the breaker and executors.
fn dependency_name(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}
