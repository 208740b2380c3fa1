//! HTTP transport seam.
//!
//! Everything above this module speaks [`HttpRequest`] / [`HttpResponse`]
//! and never touches `reqwest` directly. The production implementation is
//! [`ReqwestTransport`]; tests substitute their own [`Transport`] to
//! simulate timeouts, dropped connections or slow origins.
//!
//! A transport returns `Ok` for every response it received, whatever the
//! status code. Mapping statuses to errors is the caller's business, since
//! the dispatcher and the image loader disagree on what counts as a miss.

mod http;

pub use http::{DEFAULT_TIMEOUT, ReqwestTransport};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use reqwest::header::HeaderMap;

use crate::Result;

/// A fully-resolved outgoing request (absolute URL).
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

/// A received response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type: None,
            body: body.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the body is declared as JSON (`application/json`,
    /// `application/problem+json`, ...).
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| {
                let mime = ct.split(';').next().unwrap_or("").trim();
                mime.eq_ignore_ascii_case("application/json") || mime.ends_with("+json")
            })
            .unwrap_or(false)
    }
}

/// Performs one HTTP round trip.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport name for logging/debugging.
    fn name(&self) -> &str;

    /// Send the request and return whatever the origin answered.
    ///
    /// Errors are reserved for failures where no response was received,
    /// classified as [`CourierError::Network`](crate::CourierError::Network)
    /// or [`CourierError::InvalidUrl`](crate::CourierError::InvalidUrl).
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}
