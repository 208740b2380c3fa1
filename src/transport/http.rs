//! reqwest-backed transport.

use std::error::Error as _;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};

use super::{HttpRequest, HttpResponse, Transport};
use crate::error::NetworkErrorKind;
use crate::{CourierError, Result};

/// Default per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// [`Transport`] over a shared `reqwest::Client`.
///
/// The client carries the per-attempt timeout, so each call to
/// [`send`](Transport::send) is bounded independently of retries.
#[derive(Clone)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    /// Create a transport with the given per-attempt timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CourierError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    /// Wrap an existing client (shares its connection pool).
    pub fn with_client(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    fn name(&self) -> &str {
        "reqwest"
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = Url::parse(&request.url)
            .map_err(|e| CourierError::InvalidUrl(format!("{}: {e}", request.url)))?;

        let mut builder = self
            .http
            .request(request.method, url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().await.map_err(classify)?;

        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}

/// Map a reqwest failure onto the transport error taxonomy.
fn classify(err: reqwest::Error) -> CourierError {
    let message = error_chain(&err);
    let kind = if err.is_timeout() {
        NetworkErrorKind::TimedOut
    } else if err.is_builder() {
        return CourierError::InvalidUrl(message);
    } else if err.is_connect() {
        if looks_like_dns(&message) {
            NetworkErrorKind::HostResolution
        } else {
            NetworkErrorKind::NotConnected
        }
    } else if err.is_request() || err.is_body() {
        NetworkErrorKind::ConnectionLost
    } else if err.is_decode() {
        return CourierError::InvalidResponse(message);
    } else {
        NetworkErrorKind::Other
    };
    CourierError::network(kind, message)
}

/// Flatten an error and its sources into one line.
fn error_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

fn looks_like_dns(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("dns error")
        || lower.contains("failed to lookup address")
        || lower.contains("name or service not known")
        || lower.contains("no such host")
}
