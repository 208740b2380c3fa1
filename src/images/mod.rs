//! Image fetch and two-tier cache.
//!
//! ```text
//! load_image(url)
//!   ├─ MemoryCache   decoded RGBA, LRU, bounded by item count and byte cost
//!   ├─ DiskCache     encoded bytes, one file per URL, bounded by bytes and age
//!   ├─ origins       source URL, primary, secondary, alternates (in order)
//!   └─ placeholder   synthesized, cached in memory, never an error
//! ```
//!
//! Keys are the URL strings callers pass in, used verbatim by both tiers.
//! Network results reach memory immediately; disk writes run on a spawned
//! task.

pub mod disk;
pub mod loader;
pub mod memory;
pub mod placeholder;

pub use disk::{CleanupReport, DiskCache, DiskCacheConfig, STALE_TMP_AGE};
pub use loader::{ImageLoader, ImageOrigin};
pub use memory::{LoadedImage, MemoryCache, MemoryCacheConfig};
pub use placeholder::PLACEHOLDER_SIZE;
