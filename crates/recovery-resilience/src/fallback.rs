//! Graceful degradation: live data, then cache, then a default.

use recovery_core::{CacheStore, DataOrigin, DataSource, ResilienceObserver};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Value returned by a [`FallbackAccessor`], tagged with the tier that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackResult<T> {
    /// The value
    pub data: T,
    /// Which tier answered
    pub source: DataOrigin,
}

impl<T> FallbackResult<T> {
    /// Create a result
    pub fn new(data: T, source: DataOrigin) -> Self {
        Self { data, source }
    }

    /// Whether the value came from anywhere other than the primary source
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.source != DataOrigin::Live
    }
}

/// Data accessor that never fails.
///
/// Tries the primary source; if that fails, the cache; if that fails or
/// misses too, returns the configured default. Errors from every tier are
/// logged and swallowed.
pub struct FallbackAccessor<T, S, C> {
    name: String,
    primary: S,
    cache: C,
    default_value: T,
    write_through: bool,
    observer: Option<Arc<dyn ResilienceObserver>>,
}

impl<T, S, C> fmt::Debug for FallbackAccessor<T, S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackAccessor")
            .field("name", &self.name)
            .field("write_through", &self.write_through)
            .finish_non_exhaustive()
    }
}

impl<T, S, C> FallbackAccessor<T, S, C>
where
    T: Default,
{
    /// Create an accessor whose last resort is `T::default()`
    #[must_use]
    pub fn new(name: impl Into<String>, primary: S, cache: C) -> Self {
        Self::with_default(name, primary, cache, T::default())
    }
}

impl<T, S, C> FallbackAccessor<T, S, C> {
    /// Create an accessor with an explicit last-resort value
    #[must_use]
    pub fn with_default(name: impl Into<String>, primary: S, cache: C, default_value: T) -> Self {
        Self {
            name: name.into(),
            primary,
            cache,
            default_value,
            write_through: false,
            observer: None,
        }
    }

    /// Store live values in the cache as they are fetched
    #[must_use]
    pub fn with_write_through(mut self, enabled: bool) -> Self {
        self.write_through = enabled;
        self
    }

    /// Report which tier answered to `observer`
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ResilienceObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Accessor name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T, S, C> FallbackAccessor<T, S, C>
where
    T: Clone + Send + Sync + 'static,
    S: DataSource<T>,
    C: CacheStore<T>,
{
    /// Fetch `key`, degrading to the cache and then the default.
    pub async fn get_data_with_fallback(&self, key: &str) -> FallbackResult<T> {
        match self.primary.fetch(key).await {
            Ok(data) => {
                debug!(accessor = %self.name, key = %key, "Serving live data");
                if self.write_through {
                    if let Err(error) = self.cache.set(key, data.clone()).await {
                        warn!(
                            accessor = %self.name,
                            key = %key,
                            error = %error,
                            "Failed to refresh cache"
                        );
                    }
                }
                return self.finish(key, data, DataOrigin::Live);
            }
            Err(error) => {
                warn!(
                    accessor = %self.name,
                    key = %key,
                    error = %error,
                    "Primary source failed, trying cache"
                );
            }
        }

        match self.cache.get(key).await {
            Ok(Some(data)) => return self.finish(key, data, DataOrigin::Cache),
            Ok(None) => {
                debug!(accessor = %self.name, key = %key, "Cache miss, using default");
            }
            Err(error) => {
                warn!(
                    accessor = %self.name,
                    key = %key,
                    error = %error,
                    "Cache lookup failed, using default"
                );
            }
        }

        self.finish(key, self.default_value.clone(), DataOrigin::Default)
    }

    fn finish(&self, key: &str, data: T, source: DataOrigin) -> FallbackResult<T> {
        if let Some(observer) = &self.observer {
            observer.on_fallback(key, source);
        }
        FallbackResult::new(data, source)
    }
}
