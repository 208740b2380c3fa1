//! Telemetry metric name constants.
//!
//! Centralised metric names for courier operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `courier_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `origin`: "primary" or "secondary"
//! - `path`: endpoint path (exact string, as used for cache keys)
//! - `status`: outcome: "ok" or "error"
//! - `tier`: cache tier: "response", "memory" or "disk"

/// Total network round trips (one per attempt).
///
/// Labels: `origin`, `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "courier_requests_total";

/// Round-trip duration in seconds.
///
/// Labels: `origin`.
pub const REQUEST_DURATION_SECONDS: &str = "courier_request_duration_seconds";

/// Total retry attempts (not counting the initial request).
///
/// Labels: `origin`.
pub const RETRIES_TOTAL: &str = "courier_retries_total";

/// Total resubmissions to the secondary origin after a primary 503.
pub const FAILOVERS_TOTAL: &str = "courier_failovers_total";

/// Total cache hits.
///
/// Labels: `tier`.
pub const CACHE_HITS_TOTAL: &str = "courier_cache_hits_total";

/// Total cache misses.
///
/// Labels: `tier`.
pub const CACHE_MISSES_TOTAL: &str = "courier_cache_misses_total";

/// Requests rejected by the rate limiter.
///
/// Labels: `path`.
pub const THROTTLED_TOTAL: &str = "courier_throttled_total";

/// Requests rejected because the endpoint's in-flight limit was reached.
///
/// Labels: `path`.
pub const QUEUE_REJECTIONS_TOTAL: &str = "courier_queue_rejections_total";

/// Image loads that exhausted every origin and fell back to a placeholder.
pub const IMAGE_PLACEHOLDERS_TOTAL: &str = "courier_image_placeholders_total";

/// Files removed from the disk image cache.
pub const DISK_EVICTIONS_TOTAL: &str = "courier_disk_evictions_total";
