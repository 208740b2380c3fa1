//! Primary/secondary origin failover.
//!
//! ```text
//! Primary ──(503)──▶ Secondary ──▶ result
//!    │
//!    └──(anything else)──▶ result
//! ```
//!
//! Each origin runs under its own [`with_retry()`] loop, so transient
//! failures are retried against the origin that produced them before the
//! failover decision is made.

use std::future::Future;

use tracing::warn;

use super::retry::{RetryConfig, with_retry};
use crate::Result;
use crate::telemetry;

/// Which backend an attempt targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Primary,
    Secondary,
}

impl Origin {
    pub fn as_str(self) -> &'static str {
        match self {
            Origin::Primary => "primary",
            Origin::Secondary => "secondary",
        }
    }
}

/// Run `attempt` against the primary origin, falling over to the secondary
/// when the primary answers 503.
///
/// `attempt` performs exactly one round trip against the given origin.
pub(crate) async fn with_failover<F, Fut, T>(config: &RetryConfig, path: &str, attempt: F) -> Result<T>
where
    F: Fn(Origin) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let primary = with_retry(config, Origin::Primary.as_str(), path, || {
        attempt(Origin::Primary)
    })
    .await;

    match primary {
        Err(e) if e.is_failover_trigger() => {
            metrics::counter!(telemetry::FAILOVERS_TOTAL).increment(1);
            warn!(path, error = %e, "primary origin unavailable, failing over to secondary");
            with_retry(config, Origin::Secondary.as_str(), path, || {
                attempt(Origin::Secondary)
            })
            .await
        }
        other => other,
    }
}
