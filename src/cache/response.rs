//! Per-path cache of successful GET responses.
//!
//! [`ResponseCache`] holds the most recent successful body for each
//! endpoint path together with the instant it was stored. Freshness is
//! decided at read time against the caller-supplied max-age (which varies
//! per path), so entries are never expired eagerly; a stale entry stays in
//! place until the next successful GET overwrites it or the entry-count
//! bound evicts it.
//!
//! The key is the endpoint path with its query string removed (see
//! [`ApiRequest::endpoint_key`](crate::ApiRequest::endpoint_key)), so
//! query-bearing variants of one path share a single entry. Trailing
//! slashes are not normalized.
//!
//! # Architecture
//!
//! The cache sits in [`ApiClient`](crate::ApiClient) in front of the rate
//! limiter. A fresh hit bypasses rate limiting, the concurrency gate,
//! retry and failover entirely. Cache hit/miss metrics are emitted here.

use std::time::Duration;

use bytes::Bytes;
use moka::sync::Cache;
use tokio::time::Instant;

use crate::telemetry;

/// Configuration for the response cache.
///
/// ```rust
/// # use courier::CacheConfig;
/// let config = CacheConfig::new().max_entries(500);
/// assert_eq!(config.max_entries, 500);
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached paths. Default: 1,000.
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_entries: 1_000 }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached paths.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }
}

#[derive(Clone, Debug)]
struct CachedResponse {
    body: Bytes,
    stored_at: Instant,
}

/// A fresh cache hit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheHit {
    pub body: Bytes,
    pub age: Duration,
}

/// In-memory response cache keyed by endpoint path.
pub struct ResponseCache {
    cache: Cache<String, CachedResponse>,
}

impl ResponseCache {
    /// Create a new response cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder().max_capacity(config.max_entries).build();
        Self { cache }
    }

    /// Look up `path`, returning the body only if younger than `max_age`.
    ///
    /// Emits cache hit/miss metrics.
    pub fn get(&self, path: &str, max_age: Duration) -> Option<CacheHit> {
        let fresh = self.cache.get(path).and_then(|entry| {
            let age = entry.stored_at.elapsed();
            (age < max_age).then_some(CacheHit {
                body: entry.body,
                age,
            })
        });
        let metric = if fresh.is_some() {
            telemetry::CACHE_HITS_TOTAL
        } else {
            telemetry::CACHE_MISSES_TOTAL
        };
        metrics::counter!(metric, "tier" => "response").increment(1);
        fresh
    }

    /// Store (or overwrite) the body for `path`, stamped now.
    pub fn put(&self, path: &str, body: Bytes) {
        self.cache.insert(
            path.to_owned(),
            CachedResponse {
                body,
                stored_at: Instant::now(),
            },
        );
    }

    /// Age of the stored entry for `path`, fresh or not.
    pub fn age(&self, path: &str) -> Option<Duration> {
        self.cache.get(path).map(|e| e.stored_at.elapsed())
    }

    /// Drop the entry for `path`.
    pub fn invalidate(&self, path: &str) {
        self.cache.invalidate(path);
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}
