//! Admission control and failure handling for API requests.
//!
//! - [`RateLimiter`] spaces dispatches per endpoint path.
//! - [`ConcurrencyGate`] caps in-flight requests per endpoint path.
//! - [`RetryConfig`] and the retry helper retry transient transport errors.
//! - The failover helper resubmits to the secondary origin on a primary 503.

pub mod failover;
pub mod gate;
pub mod rate_limit;
pub mod retry;

pub use failover::Origin;
pub use gate::{ConcurrencyGate, DEFAULT_MAX_CONCURRENT, SlotGuard};
pub use rate_limit::{Admission, RateLimiter};
pub use retry::RetryConfig;
