//! Per-endpoint dispatch spacing.
//!
//! The limiter remembers when each path was last dispatched and refuses a
//! new dispatch until the path's interval has elapsed. A path's very first
//! dispatch in the process lifetime is always admitted and moves the path
//! into the warmed set.
//!
//! Admission and timestamp update happen under one lock, before the
//! network call starts, so a burst of concurrent callers on the same path
//! gets exactly one winner.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::policy::EndpointPolicies;

#[derive(Debug, Default)]
struct RateLimitState {
    last_dispatch: HashMap<String, Instant>,
    warmed: HashSet<String>,
}

/// Throttle decision for one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Dispatch may proceed; the path's timestamp has been recorded.
    Admitted,
    /// Dispatch refused; retry after the given wait.
    Throttled(Duration),
}

/// Per-path rate limiter.
#[derive(Debug)]
pub struct RateLimiter {
    state: Mutex<RateLimitState>,
    policies: EndpointPolicies,
}

impl RateLimiter {
    pub fn new(policies: EndpointPolicies) -> Self {
        Self {
            state: Mutex::new(RateLimitState::default()),
            policies,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RateLimitState> {
        // A panic while holding the lock cannot leave the maps inconsistent.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Check `path` and, when admitted, record the dispatch time.
    pub fn check(&self, path: &str) -> Admission {
        let now = Instant::now();
        let mut state = self.lock();

        if !state.warmed.contains(path) {
            state.warmed.insert(path.to_owned());
            state.last_dispatch.insert(path.to_owned(), now);
            debug!(path, "first dispatch for path, not throttled");
            return Admission::Admitted;
        }

        let interval = self.policies.interval_for(path);
        if let Some(last) = state.last_dispatch.get(path) {
            let elapsed = now.saturating_duration_since(*last);
            if elapsed < interval {
                return Admission::Throttled(interval - elapsed);
            }
        }
        state.last_dispatch.insert(path.to_owned(), now);
        Admission::Admitted
    }

    /// `true` iff a dispatch to `path` right now would be refused.
    ///
    /// Unlike [`check`](Self::check) this records nothing.
    pub fn should_throttle(&self, path: &str) -> bool {
        let state = self.lock();
        if !state.warmed.contains(path) {
            return false;
        }
        match state.last_dispatch.get(path) {
            Some(last) => last.elapsed() < self.policies.interval_for(path),
            None => false,
        }
    }

    /// Whether `path` has been dispatched at least once.
    pub fn is_warm(&self, path: &str) -> bool {
        self.lock().warmed.contains(path)
    }

    /// Interval applied to `path`.
    pub fn interval_for(&self, path: &str) -> Duration {
        self.policies.interval_for(path)
    }
}
