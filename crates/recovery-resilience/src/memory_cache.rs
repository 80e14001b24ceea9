//! In-memory cache store used as the fallback tier.

use async_trait::async_trait;
use recovery_core::{CacheStore, RecoveryResult};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Cache entry with instant-based expiry
#[derive(Debug)]
struct CacheEntry<T> {
    value: T,
    expires_at: Instant,
    hits: u64,
}

impl<T> CacheEntry<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
            hits: 0,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Bounded in-memory [`CacheStore`] with per-entry TTL.
///
/// When full, expired entries are dropped first, then the least-hit ones.
#[derive(Debug)]
pub struct MemoryCache<T> {
    entries: RwLock<HashMap<String, CacheEntry<T>>>,
    max_entries: usize,
    ttl: Duration,
}

impl<T> MemoryCache<T> {
    /// Create a cache holding at most `max_entries` values for `ttl` each
    #[must_use]
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries: max_entries.max(1),
            ttl,
        }
    }

    /// Number of stored entries, including expired ones not yet evicted
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no entries
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Remove one key
    pub async fn remove(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    /// Remove every entry
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    fn evict_if_needed(&self, entries: &mut HashMap<String, CacheEntry<T>>) {
        entries.retain(|_, entry| !entry.is_expired());

        if entries.len() >= self.max_entries {
            let to_remove = entries.len() - self.max_entries + 1;
            let mut hit_counts: Vec<(String, u64)> = entries
                .iter()
                .map(|(k, v)| (k.clone(), v.hits))
                .collect();
            hit_counts.sort_by_key(|(_, hits)| *hits);

            for (key, _) in hit_counts.into_iter().take(to_remove) {
                entries.remove(&key);
            }
        }
    }
}

#[async_trait]
impl<T> CacheStore<T> for MemoryCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> RecoveryResult<Option<T>> {
        let mut entries = self.entries.write().await;

        if let Some(entry) = entries.get_mut(key) {
            if entry.is_expired() {
                entries.remove(key);
                return Ok(None);
            }
            entry.hits += 1;
            return Ok(Some(entry.value.clone()));
        }

        Ok(None)
    }

    async fn set(&self, key: &str, value: T) -> RecoveryResult<()> {
        let mut entries = self.entries.write().await;
        if !entries.contains_key(key) {
            self.evict_if_needed(&mut entries);
        }
        entries.insert(key.to_string(), CacheEntry::new(value, self.ttl));
        Ok(())
    }
}
