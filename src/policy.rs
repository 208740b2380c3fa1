//! Per-endpoint rate-limit intervals and cache max-ages.
//!
//! Rules match a path either exactly or by prefix (for templated endpoints
//! such as `/order-status/{id}`). Exact rules win over prefix rules, and
//! among prefix rules the longest prefix wins. Matching only selects a
//! policy; the rate limiter, response cache and gate still key on the full
//! path string.

use std::time::Duration;

use serde::Deserialize;

/// Default minimum spacing between two dispatches to the same path.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(2);

/// Default freshness window for cached GET responses.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(60);

/// Policy override for one path or path prefix.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EndpointRule {
    /// Path (or path prefix when `prefix` is set).
    pub path: String,
    /// Treat `path` as a prefix.
    #[serde(default)]
    pub prefix: bool,
    /// Minimum interval between dispatches, in milliseconds.
    #[serde(default)]
    pub min_interval_ms: Option<u64>,
    /// Maximum age of a cached response, in seconds.
    #[serde(default)]
    pub max_age_secs: Option<u64>,
}

impl EndpointRule {
    /// Rule matching exactly one path.
    pub fn exact(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            prefix: false,
            min_interval_ms: None,
            max_age_secs: None,
        }
    }

    /// Rule matching every path starting with `prefix`.
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: true,
            ..Self::exact(prefix)
        }
    }

    pub fn min_interval(mut self, interval: Duration) -> Self {
        self.min_interval_ms = Some(interval.as_millis() as u64);
        self
    }

    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age_secs = Some(max_age.as_secs());
        self
    }

    fn matches(&self, path: &str) -> bool {
        if self.prefix {
            path.starts_with(&self.path)
        } else {
            path == self.path
        }
    }
}

/// Built-in rules for the known endpoint surface.
///
/// Aggregate endpoints are expensive and change rarely: long interval,
/// long max-age. Per-user endpoints are cheap and time-sensitive: short
/// interval, short max-age.
pub fn default_rules() -> Vec<EndpointRule> {
    let secs = Duration::from_secs;
    vec![
        EndpointRule::exact("/get_All_Restaurant")
            .min_interval(secs(10))
            .max_age(secs(300)),
        EndpointRule::exact("/top-picks")
            .min_interval(secs(10))
            .max_age(secs(300)),
        EndpointRule::prefix("/get_all_product/")
            .min_interval(secs(5))
            .max_age(secs(120)),
        EndpointRule::prefix("/get_Restaurant/")
            .min_interval(secs(5))
            .max_age(secs(120)),
        EndpointRule::prefix("/get-UserOrder/")
            .min_interval(secs(1))
            .max_age(secs(15)),
        EndpointRule::prefix("/order-status/")
            .min_interval(secs(1))
            .max_age(secs(5)),
        EndpointRule::exact("/order-placed").min_interval(secs(3)),
        EndpointRule::exact("/schedule-order-placed").min_interval(secs(3)),
        EndpointRule::exact("/verify-order").min_interval(secs(3)),
    ]
}

/// Policy table consulted by the rate limiter and the response cache.
#[derive(Debug, Clone)]
pub struct EndpointPolicies {
    rules: Vec<EndpointRule>,
    default_interval: Duration,
    default_max_age: Duration,
}

impl Default for EndpointPolicies {
    fn default() -> Self {
        Self::new(default_rules(), DEFAULT_MIN_INTERVAL, DEFAULT_MAX_AGE)
    }
}

impl EndpointPolicies {
    pub fn new(rules: Vec<EndpointRule>, default_interval: Duration, default_max_age: Duration) -> Self {
        Self {
            rules,
            default_interval,
            default_max_age,
        }
    }

    /// Add a rule. A later exact rule for the same path replaces the earlier one.
    pub fn push(&mut self, rule: EndpointRule) {
        self.rules
            .retain(|r| !(r.path == rule.path && r.prefix == rule.prefix));
        self.rules.push(rule);
    }

    /// The rule governing `path`, if any.
    pub fn rule_for(&self, path: &str) -> Option<&EndpointRule> {
        self.rules
            .iter()
            .find(|r| !r.prefix && r.matches(path))
            .or_else(|| {
                self.rules
                    .iter()
                    .filter(|r| r.prefix && r.matches(path))
                    .max_by_key(|r| r.path.len())
            })
    }

    /// Minimum spacing between dispatches to `path`.
    pub fn interval_for(&self, path: &str) -> Duration {
        self.rule_for(path)
            .and_then(|r| r.min_interval_ms)
            .map(Duration::from_millis)
            .unwrap_or(self.default_interval)
    }

    /// Freshness window for cached responses of `path`.
    pub fn max_age_for(&self, path: &str) -> Duration {
        self.rule_for(path)
            .and_then(|r| r.max_age_secs)
            .map(Duration::from_secs)
            .unwrap_or(self.default_max_age)
    }

    pub fn default_interval(&self) -> Duration {
        self.default_interval
    }

    pub fn default_max_age(&self) -> Duration {
        self.default_max_age
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_rule_beats_prefix() {
        let mut policies = EndpointPolicies::new(vec![], DEFAULT_MIN_INTERVAL, DEFAULT_MAX_AGE);
        policies.push(EndpointRule::prefix("/orders/").min_interval(Duration::from_secs(1)));
        policies.push(EndpointRule::exact("/orders/all").min_interval(Duration::from_secs(9)));

        assert_eq!(policies.interval_for("/orders/42"), Duration::from_secs(1));
        assert_eq!(policies.interval_for("/orders/all"), Duration::from_secs(9));
    }

    #[test]
    fn longest_prefix_wins() {
        let policies = EndpointPolicies::new(
            vec![
                EndpointRule::prefix("/a/").max_age(Duration::from_secs(1)),
                EndpointRule::prefix("/a/b/").max_age(Duration::from_secs(2)),
            ],
            DEFAULT_MIN_INTERVAL,
            DEFAULT_MAX_AGE,
        );
        assert_eq!(policies.max_age_for("/a/b/c"), Duration::from_secs(2));
        assert_eq!(policies.max_age_for("/a/x"), Duration::from_secs(1));
    }

    #[test]
    fn no_trailing_slash_normalization() {
        let policies = EndpointPolicies::default();
        assert_eq!(
            policies.interval_for("/top-picks"),
            Duration::from_secs(10)
        );
        assert_eq!(policies.interval_for("/top-picks/"), DEFAULT_MIN_INTERVAL);
    }

    #[test]
    fn rule_without_override_falls_back() {
        let policies = EndpointPolicies::default();
        // order placement sets an interval but no max-age
        assert_eq!(policies.max_age_for("/order-placed"), DEFAULT_MAX_AGE);
        assert_eq!(policies.interval_for("/unknown"), DEFAULT_MIN_INTERVAL);
    }
}
