//! # Response Cache
//!
//! Short-TTL memoisation of upstream JSON documents, so a burst of dashboard
//! requests for the same shop and window hits Etsy once.
//!
//! Backends implement the [`Cache`] trait and are interchangeable behind
//! `Arc<dyn Cache>`:
//!
//! - [`MemoryCache`]: an in-process map. Expired entries are invisible to
//!   `get` and are removed by [`Cache::clear_expired`], which the caller is
//!   expected to run periodically. There is no internal timer.
//! - [`RedisCache`]: JSON strings stored with `SET EX`; Redis drops expired
//!   keys itself.

use async_trait::async_trait;
use configuration::{CacheBackend, CacheConfig};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub mod error;
pub mod memory;
pub mod redis_store;

pub use error::CacheError;
pub use memory::MemoryCache;
pub use redis_store::RedisCache;

/// A key/value store with per-entry expiry.
///
/// `set` always replaces the whole entry, so concurrent writers resolve as
/// last-write-wins and readers never observe a partially written value.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Returns the value if the key is set and has not expired.
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    /// Stores `value` under `key`, replacing any existing entry. Expires after `ttl`.
    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError>;

    /// Removes `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Drops every expired entry and returns how many were removed.
    async fn clear_expired(&self) -> Result<usize, CacheError>;

    fn backend_name(&self) -> &'static str;
}

/// Builds the configured cache backend.
///
/// If Redis is selected but cannot be reached, this falls back to the memory
/// backend and logs a warning rather than failing startup.
pub async fn build_cache(config: &CacheConfig) -> Arc<dyn Cache> {
    match config.backend {
        CacheBackend::Memory => Arc::new(MemoryCache::new()),
        CacheBackend::Redis => match RedisCache::connect(&config.redis_url).await {
            Ok(cache) => {
                tracing::info!(url = %config.redis_url, "Using Redis response cache.");
                Arc::new(cache)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Redis unavailable, falling back to in-memory cache.");
                Arc::new(MemoryCache::new())
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_backend_is_the_default() {
        let cache = build_cache(&CacheConfig::default()).await;
        assert_eq!(cache.backend_name(), "memory");
    }

    #[tokio::test]
    async fn unreachable_redis_falls_back_to_memory() {
        let config = CacheConfig {
            backend: CacheBackend::Redis,
            // Port 1 is reserved and refuses connections.
            redis_url: "redis://127.0.0.1:1".to_string(),
            ..CacheConfig::default()
        };
        let cache = build_cache(&config).await;
        assert_eq!(cache.backend_name(), "memory");
    }
}
