//! Caching subsystem for API responses.
//!
//! - [`response::ResponseCache`]: per-path cache of successful GET bodies,
//!   consulted by [`ApiClient`](crate::ApiClient) before any admission
//!   control or network work.
//!
//! Image payloads are cached separately by the [`images`](crate::images)
//! pipeline and share nothing with this cache.

pub mod response;

pub use response::{CacheConfig, CacheHit, ResponseCache};
