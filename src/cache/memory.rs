//! In-process TTL cache

use super::{CacheResult, CacheStore, key_matches};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

struct Entry {
    value: String,
    expires_at: Instant,
}

/// TTL map behind a `tokio` RwLock. Expired entries are dropped lazily on
/// read; there is no background sweeper.
#[derive(Clone)]
pub struct MemoryCache {
    inner: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of live (possibly expired, not yet swept) entries
    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        {
            let map = self.inner.read().await;
            match map.get(key) {
                None => return Ok(None),
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Ok(Some(entry.value.clone()));
                }
                Some(_) => {} // expired, fall through to sweep
            }
        }
        let mut map = self.inner.write().await;
        // Re-check under the write lock: a concurrent set may have renewed it
        if let Some(entry) = map.get(key) {
            if entry.expires_at > Instant::now() {
                return Ok(Some(entry.value.clone()));
            }
            map.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        let mut map = self.inner.write().await;
        map.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn del(&self, key: &str) -> CacheResult<()> {
        self.inner.write().await.remove(key);
        Ok(())
    }

    async fn del_pattern(&self, pattern: &str) -> CacheResult<()> {
        let mut map = self.inner.write().await;
        map.retain(|key, _| !key_matches(key, pattern));
        Ok(())
    }

    async fn clear(&self) -> CacheResult<()> {
        self.inner.write().await.clear();
        Ok(())
    }
}
