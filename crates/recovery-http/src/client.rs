//! Single-request JSON client.

use async_trait::async_trait;
use recovery_core::{DataSource, RecoveryError, RecoveryResult};
use reqwest::header::RETRY_AFTER;
use reqwest::{StatusCode, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Issues one `GET` per call and classifies the outcome.
///
/// | Outcome | Error |
/// |---|---|
/// | client timeout | `Timeout` with the configured duration |
/// | other transport failure | `Upstream` without status |
/// | 429 | `RateLimited`, `Retry-After` seconds kept |
/// | other non-2xx | `Upstream` with status |
#[derive(Debug, Clone)]
pub struct JsonClient {
    client: reqwest::Client,
    base_url: String,
    dependency: String,
    timeout: Duration,
}

impl JsonClient {
    /// Create a client for `base_url` with a per-request `timeout`.
    ///
    /// # Errors
    /// Returns `Configuration` if the base URL does not parse or the HTTP
    /// client cannot be built
    pub fn new(
        dependency: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> RecoveryResult<Self> {
        let base_url = base_url.into();
        Url::parse(&base_url).map_err(|e| {
            RecoveryError::configuration(format!("invalid base URL {base_url:?}: {e}"))
        })?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RecoveryError::configuration(format!("building HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            dependency: dependency.into(),
            timeout,
        })
    }

    /// Dependency name used in errors
    #[must_use]
    pub fn dependency(&self) -> &str {
        &self.dependency
    }

    /// Per-request timeout
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Full URL for `key`; an empty key addresses the base URL itself
    #[must_use]
    pub fn url_for(&self, key: &str) -> String {
        let key = key.trim_start_matches('/');
        if key.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{key}", self.base_url)
        }
    }

    /// `GET` the JSON document at `key`
    ///
    /// # Errors
    /// See the type-level table
    pub async fn get(&self, key: &str) -> RecoveryResult<Value> {
        let url = self.url_for(key);
        debug!(dependency = %self.dependency, url = %url, "Sending request");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(RecoveryError::rate_limited(
                format!("{url} returned {status}"),
                retry_after,
            ));
        }
        if !status.is_success() {
            return Err(RecoveryError::upstream(
                &self.dependency,
                format!("{url} returned {status}"),
                Some(status.as_u16()),
            ));
        }

        response.json().await.map_err(|e| {
            if e.is_timeout() {
                return RecoveryError::timeout(self.timeout);
            }
            RecoveryError::upstream(
                &self.dependency,
                format!("invalid JSON body: {e}"),
                Some(status.as_u16()),
            )
        })
    }

    fn transport_error(&self, error: &reqwest::Error) -> RecoveryError {
        if error.is_timeout() {
            RecoveryError::timeout(self.timeout)
        } else {
            RecoveryError::upstream(&self.dependency, error.to_string(), None)
        }
    }
}

#[async_trait]
impl DataSource<Value> for JsonClient {
    async fn fetch(&self, key: &str) -> RecoveryResult<Value> {
        self.get(key).await
    }
}
