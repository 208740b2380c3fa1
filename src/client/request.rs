//! Request descriptor.

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;

use crate::Result;

/// One logical API call: path, method, optional body and headers, and
/// whether admission checks are bypassed.
///
/// Built with consuming methods and read-only afterwards:
///
/// ```rust
/// # use courier::ApiRequest;
/// let ping = ApiRequest::get("/ping").force();
/// assert!(ping.is_forced());
/// assert_eq!(ping.path(), "/ping");
/// ```
#[derive(Debug, Clone)]
pub struct ApiRequest {
    path: String,
    method: Method,
    body: Option<Bytes>,
    headers: HeaderMap,
    force: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            body: None,
            headers: HeaderMap::new(),
            force: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Attach a JSON body and the matching content type.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(body)?;
        self.body = Some(Bytes::from(bytes));
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(self)
    }

    /// Attach a raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Bypass the response cache and the rate limiter (health checks,
    /// diagnostics). The concurrency gate still applies.
    pub fn force(mut self) -> Self {
        self.force = true;
        self
    }

    /// Path as sent on the wire, query string included.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Endpoint path with any query string removed.
    ///
    /// This is the key for the response cache, the rate limiter, the
    /// concurrency gate and policy lookup, so `/top-picks?page=1` and
    /// `/top-picks?page=2` share one entry.
    pub fn endpoint_key(&self) -> &str {
        endpoint_key(&self.path)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn body_bytes(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn is_forced(&self) -> bool {
        self.force
    }

    /// Only GET responses are cached.
    pub fn is_cacheable(&self) -> bool {
        self.method == Method::GET
    }
}

/// Strip the query string (and any fragment) from `path`.
pub fn endpoint_key(path: &str) -> &str {
    match path.find(['?', '#']) {
        Some(idx) => &path[..idx],
        None => path,
    }
}
