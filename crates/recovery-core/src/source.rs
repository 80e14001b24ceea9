//! Collaborator traits for the data-access layer.

use crate::error::RecoveryResult;
use async_trait::async_trait;
use std::sync::Arc;

/// Primary source of data for a fallback accessor (a downstream service,
/// a database query, ...).
#[async_trait]
pub trait DataSource<T>: Send + Sync {
    /// Fetch the value for `key`
    async fn fetch(&self, key: &str) -> RecoveryResult<T>;
}

/// Key/value cache consulted when the primary source fails.
#[async_trait]
pub trait CacheStore<T>: Send + Sync {
    /// Look up `key`; `Ok(None)` is a miss
    async fn get(&self, key: &str) -> RecoveryResult<Option<T>>;

    /// Store `value` under `key`
    async fn set(&self, key: &str, value: T) -> RecoveryResult<()>;
}

#[async_trait]
impl<T, S> DataSource<T> for Arc<S>
where
    T: Send + 'static,
    S: DataSource<T> + ?Sized,
{
    async fn fetch(&self, key: &str) -> RecoveryResult<T> {
        (**self).fetch(key).await
    }
}

#[async_trait]
impl<T, C> CacheStore<T> for Arc<C>
where
    T: Send + 'static,
    C: CacheStore<T> + ?Sized,
{
    async fn get(&self, key: &str) -> RecoveryResult<Option<T>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: T) -> RecoveryResult<()> {
        (**self).set(key, value).await
    }
}
