//! Cache port
//!
//! Read-through cache layer in front of the database. The port is a trait
//! with two implementations selected by configuration:
//!
//! - [`MemoryCache`] - in-process TTL map (single-instance and tests)
//! - [`RedisCache`] - shared networked cache (multi-instance deployments)
//!
//! Cache failures must never fail the caller: services go through the
//! best-effort helpers in this module ([`get_json`], [`put_json`],
//! [`invalidate`], [`invalidate_pattern`]), which log and swallow every
//! backend error so reads always fall through to the source of truth.

pub mod keys;
pub mod memory;
pub mod redis;

pub use memory::MemoryCache;
pub use redis::RedisCache;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Cache serialization error: {0}")]
    Serialization(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Key/value cache with per-key TTL
///
/// Values are opaque JSON strings. `del_pattern` takes a literal key
/// pattern containing at most one `*`, interpreted as "prefix*suffix"
/// substring match (not a full glob).
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;
    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()>;
    async fn del(&self, key: &str) -> CacheResult<()>;
    async fn del_pattern(&self, pattern: &str) -> CacheResult<()>;
    async fn clear(&self) -> CacheResult<()>;
}

/// Build the configured cache backend
pub async fn connect(backend: &str, redis_url: &str) -> anyhow::Result<Arc<dyn CacheStore>> {
    match backend {
        "redis" => {
            let cache = RedisCache::connect(redis_url).await?;
            tracing::info!("Cache backend: redis ({})", redis_url);
            Ok(Arc::new(cache))
        }
        "memory" => {
            tracing::info!("Cache backend: in-process memory");
            Ok(Arc::new(MemoryCache::new()))
        }
        other => anyhow::bail!("Unknown cache backend: {other}"),
    }
}

/// Match a key against a "prefix*suffix" pattern (at most one `*`)
pub(crate) fn key_matches(key: &str, pattern: &str) -> bool {
    match pattern.split_once('*') {
        Some((prefix, suffix)) => {
            key.len() >= prefix.len() + suffix.len()
                && key.starts_with(prefix)
                && key.ends_with(suffix)
        }
        None => key == pattern,
    }
}

// ========== Best-effort helpers ==========

/// Read and deserialize a cached value; any error counts as a miss
pub async fn get_json<T: DeserializeOwned>(cache: &dyn CacheStore, key: &str) -> Option<T> {
    match cache.get(key).await {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "Discarding undecodable cache entry");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(key, error = %e, "Cache read failed, falling through");
            None
        }
    }
}

/// Serialize and store a value; errors are logged and swallowed
pub async fn put_json<T: Serialize>(cache: &dyn CacheStore, key: &str, value: &T, ttl: Duration) {
    let raw = match serde_json::to_string(value) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(key, error = %e, "Cache serialization failed");
            return;
        }
    };
    if let Err(e) = cache.set(key, raw, ttl).await {
        tracing::warn!(key, error = %e, "Cache write failed");
    }
}

/// Delete keys; errors are logged and swallowed
pub async fn invalidate(cache: &dyn CacheStore, keys: &[&str]) {
    for key in keys {
        if let Err(e) = cache.del(key).await {
            tracing::warn!(key, error = %e, "Cache invalidation failed");
        }
    }
}

/// Delete keys by pattern; errors are logged and swallowed
pub async fn invalidate_pattern(cache: &dyn CacheStore, pattern: &str) {
    if let Err(e) = cache.del_pattern(pattern).await {
        tracing::warn!(pattern, error = %e, "Cache pattern invalidation failed");
    }
}
