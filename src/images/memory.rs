//! Memory tier: decoded images in an LRU cache bounded by count and cost.

use std::sync::Arc;

use bytes::Bytes;
use image::RgbaImage;
use moka::policy::EvictionPolicy;
use moka::sync::Cache;

use crate::telemetry;
use crate::{CourierError, Result};

/// A decoded image together with the bytes it was decoded from.
///
/// Cloning is cheap: pixels and encoded bytes are shared.
#[derive(Clone, Debug)]
pub struct LoadedImage {
    encoded: Bytes,
    pixels: Arc<RgbaImage>,
    placeholder: bool,
}

impl LoadedImage {
    /// Decode an encoded image (PNG, JPEG, WebP, GIF).
    pub fn decode(encoded: Bytes) -> Result<Self> {
        let decoded = image::load_from_memory(&encoded)
            .map_err(|e| CourierError::DecodingFailed(format!("image: {e}")))?;
        Ok(Self {
            encoded,
            pixels: Arc::new(decoded.to_rgba8()),
            placeholder: false,
        })
    }

    pub(crate) fn placeholder(encoded: Bytes, pixels: RgbaImage) -> Self {
        Self {
            encoded,
            pixels: Arc::new(pixels),
            placeholder: true,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// RGBA8 pixels.
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Bytes as received from the origin (or synthesized).
    pub fn encoded(&self) -> &Bytes {
        &self.encoded
    }

    /// Whether this image was synthesized after every origin failed.
    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    /// Memory cost estimate: width × height × 4 bytes.
    pub fn cost(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height()) * 4
    }
}

/// Memory tier limits.
#[derive(Debug, Clone)]
pub struct MemoryCacheConfig {
    /// Maximum number of images. Default: 100.
    pub max_items: u64,
    /// Maximum total cost in bytes. Default: 64 MiB.
    pub max_cost: u64,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_items: 100,
            max_cost: 64 * 1024 * 1024,
        }
    }
}

/// In-memory LRU cache of decoded images keyed by source URL.
///
/// moka bounds a cache by a single weighted capacity, so both limits are
/// folded into it: capacity is `max_cost` and every entry weighs at least
/// `max_cost / max_items`. At most `max_items` entries fit, and the total
/// cost of the entries never exceeds `max_cost`.
pub struct MemoryCache {
    cache: Cache<String, LoadedImage>,
}

impl MemoryCache {
    pub fn new(config: &MemoryCacheConfig) -> Self {
        let max_cost = config.max_cost.max(1);
        let floor = (max_cost / config.max_items.max(1)).max(1);
        let cache = Cache::builder()
            .max_capacity(max_cost)
            .eviction_policy(EvictionPolicy::lru())
            .weigher(move |_key: &String, image: &LoadedImage| -> u32 {
                image.cost().max(floor).min(u64::from(u32::MAX)) as u32
            })
            .build();
        Self { cache }
    }

    /// Look up `key`. Emits cache hit/miss metrics.
    pub fn get(&self, key: &str) -> Option<LoadedImage> {
        let hit = self.cache.get(key);
        let metric = if hit.is_some() {
            telemetry::CACHE_HITS_TOTAL
        } else {
            telemetry::CACHE_MISSES_TOTAL
        };
        metrics::counter!(metric, "tier" => "memory").increment(1);
        hit
    }

    pub fn insert(&self, key: &str, image: LoadedImage) {
        self.cache.insert(key.to_owned(), image);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.cache.contains_key(key)
    }

    pub fn invalidate(&self, key: &str) {
        self.cache.invalidate(key);
    }

    /// Number of cached images (approximate until pending tasks run).
    pub fn len(&self) -> u64 {
        self.cache.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total weight currently held.
    pub fn weighted_size(&self) -> u64 {
        self.cache.weighted_size()
    }

    /// Apply pending evictions now instead of on the next access.
    pub fn sync(&self) {
        self.cache.run_pending_tasks();
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(&MemoryCacheConfig::default())
    }
}
