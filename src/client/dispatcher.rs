//! ApiClient: the request dispatcher.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use reqwest::Url;
use tracing::debug;

use super::request::ApiRequest;
use crate::cache::ResponseCache;
use crate::policy::EndpointPolicies;
use crate::resilience::failover::with_failover;
use crate::resilience::{Admission, ConcurrencyGate, Origin, RateLimiter, RetryConfig};
use crate::telemetry;
use crate::transport::{HttpRequest, Transport};
use crate::{CourierError, Result};

/// Base URLs of the two interchangeable backends.
#[derive(Debug, Clone)]
pub struct Origins {
    primary: String,
    secondary: String,
}

impl Origins {
    /// Validate and store both base URLs.
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Result<Self> {
        let primary = normalize_base(primary.into())?;
        let secondary = normalize_base(secondary.into())?;
        Ok(Self { primary, secondary })
    }

    pub fn base(&self, origin: Origin) -> &str {
        match origin {
            Origin::Primary => &self.primary,
            Origin::Secondary => &self.secondary,
        }
    }

    /// Absolute URL for `path` on `origin`.
    pub fn url_for(&self, origin: Origin, path: &str) -> Result<String> {
        let base = self.base(origin);
        let url = if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        };
        Url::parse(&url).map_err(|e| CourierError::InvalidUrl(format!("{url}: {e}")))?;
        Ok(url)
    }
}

fn normalize_base(base: String) -> Result<String> {
    Url::parse(&base).map_err(|e| CourierError::InvalidUrl(format!("{base}: {e}")))?;
    Ok(base.trim_end_matches('/').to_owned())
}

/// Dispatches API requests through cache, rate limiter, concurrency gate,
/// retry and failover.
///
/// Cloning is cheap and clones share every store, so one client can be
/// handed to many tasks.
#[derive(Clone)]
pub struct ApiClient {
    origins: Arc<Origins>,
    transport: Arc<dyn Transport>,
    policies: Arc<EndpointPolicies>,
    rate_limiter: Arc<RateLimiter>,
    cache: Arc<ResponseCache>,
    gate: Arc<ConcurrencyGate>,
    retry: RetryConfig,
}

impl ApiClient {
    pub(crate) fn new(
        origins: Origins,
        transport: Arc<dyn Transport>,
        policies: EndpointPolicies,
        cache: ResponseCache,
        gate: ConcurrencyGate,
        retry: RetryConfig,
    ) -> Self {
        Self {
            origins: Arc::new(origins),
            transport,
            rate_limiter: Arc::new(RateLimiter::new(policies.clone())),
            policies: Arc::new(policies),
            cache: Arc::new(cache),
            gate: Arc::new(gate),
            retry,
        }
    }

    /// Dispatch `request` and return the response body.
    ///
    /// 1. GET, not forced: a fresh cached body is returned immediately.
    /// 2. Not forced: the rate limiter may refuse with `RateLimited`.
    /// 3. An in-flight slot is claimed or the call fails with `QueueFull`.
    /// 4. The primary origin is tried under the retry policy, then the
    ///    secondary if the primary answered 503.
    /// 5. A successful GET body is written to the response cache.
    ///
    /// Steps 1 to 3 and the cache write are keyed by
    /// [`ApiRequest::endpoint_key`]; the query string only reaches the wire.
    ///
    /// The slot is released however the call ends, including when the
    /// returned future is dropped before completion.
    pub async fn request(&self, request: &ApiRequest) -> Result<Bytes> {
        let path = request.endpoint_key();

        if request.is_cacheable() && !request.is_forced() {
            let max_age = self.policies.max_age_for(path);
            if let Some(hit) = self.cache.get(path, max_age) {
                debug!(path, age_ms = hit.age.as_millis() as u64, "serving cached response");
                return Ok(hit.body);
            }
        }

        if !request.is_forced()
            && let Admission::Throttled(retry_after) = self.rate_limiter.check(path)
        {
            metrics::counter!(telemetry::THROTTLED_TOTAL, "path" => path.to_owned()).increment(1);
            debug!(path, retry_after_ms = retry_after.as_millis() as u64, "request throttled");
            return Err(CourierError::RateLimited { retry_after });
        }

        let slot = self.gate.acquire(path)?;
        debug!(request_id = slot.id(), path, method = %request.method(), "dispatching request");

        let result = with_failover(&self.retry, path, |origin| self.execute(origin, request)).await;

        if let Ok(body) = &result
            && request.is_cacheable()
        {
            self.cache.put(path, body.clone());
        }
        drop(slot);
        result
    }

    /// One network round trip against `origin`.
    async fn execute(&self, origin: Origin, request: &ApiRequest) -> Result<Bytes> {
        let url = self.origins.url_for(origin, request.path())?;
        let http = HttpRequest {
            method: request.method().clone(),
            url,
            headers: request.headers().clone(),
            body: request.body_bytes().cloned(),
        };

        let start = Instant::now();
        let outcome = self.transport.send(http).await.and_then(|response| {
            if response.is_success() {
                Ok(response.body)
            } else {
                let body = (!response.body.is_empty())
                    .then(|| String::from_utf8_lossy(&response.body).into_owned());
                Err(CourierError::Server {
                    status: response.status,
                    body,
                })
            }
        });
        record_request(origin, start, outcome.is_ok());
        outcome
    }

    /// Endpoint policy table in use.
    pub fn policies(&self) -> &EndpointPolicies {
        &self.policies
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn response_cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    pub fn origins(&self) -> &Origins {
        &self.origins
    }
}

/// Record request outcome metrics (counter + histogram).
fn record_request(origin: Origin, start: Instant, ok: bool) {
    let status = if ok { "ok" } else { "error" };
    metrics::counter!(telemetry::REQUESTS_TOTAL,
        "origin" => origin.as_str(),
        "status" => status,
    )
    .increment(1);
    metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS, "origin" => origin.as_str())
        .record(start.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joining() {
        let origins = Origins::new("https://a.example.com/", "https://b.example.com/v1").unwrap();
        assert_eq!(
            origins.url_for(Origin::Primary, "/ping").unwrap(),
            "https://a.example.com/ping"
        );
        assert_eq!(
            origins.url_for(Origin::Secondary, "top-picks").unwrap(),
            "https://b.example.com/v1/top-picks"
        );
    }

    #[test]
    fn bad_origin_rejected() {
        let err = Origins::new("not a url", "https://b.example.com").unwrap_err();
        assert!(matches!(err, CourierError::InvalidUrl(_)));
    }
}
