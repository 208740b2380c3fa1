//! Image fetch with memory → disk → multi-origin fallback.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::disk::DiskCache;
use super::memory::{LoadedImage, MemoryCache};
use super::placeholder::placeholder;
use crate::telemetry;
use crate::transport::{HttpRequest, Transport};
use crate::{CourierError, Result};

/// Statuses after which the next origin is worth trying.
const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// A base URL images may be served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageOrigin {
    pub name: String,
    pub base: String,
}

impl ImageOrigin {
    pub fn new(name: impl Into<String>, base: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: base.into().trim_end_matches('/').to_owned(),
        }
    }
}

/// Loads images through the memory and disk tiers, falling back to the
/// network and, when every origin fails, to a placeholder.
///
/// Cloning is cheap and clones share both tiers.
#[derive(Clone)]
pub struct ImageLoader {
    transport: Arc<dyn Transport>,
    origins: Arc<Vec<ImageOrigin>>,
    memory: Arc<MemoryCache>,
    disk: Arc<DiskCache>,
    sweep_interval: Duration,
}

impl ImageLoader {
    /// `origins` are tried in order: primary, secondary, then alternates.
    pub fn new(
        transport: Arc<dyn Transport>,
        origins: Vec<ImageOrigin>,
        memory: MemoryCache,
        disk: DiskCache,
    ) -> Self {
        Self {
            transport,
            origins: Arc::new(origins),
            memory: Arc::new(memory),
            disk: Arc::new(disk),
            sweep_interval: Duration::from_secs(24 * 60 * 60),
        }
    }

    /// Set how often [`start_maintenance`](Self::start_maintenance) sweeps.
    pub fn sweep_interval(mut self, every: Duration) -> Self {
        self.sweep_interval = every;
        self
    }

    /// Load the image at `url`. Never fails: an image no origin can serve
    /// resolves to a placeholder, which is then cached in memory so repeat
    /// requests do not walk the origin list again.
    pub async fn load_image(&self, url: &str) -> LoadedImage {
        if let Some(image) = self.memory.get(url) {
            return image;
        }

        if let Some(bytes) = self.disk.get(url).await {
            match LoadedImage::decode(bytes) {
                Ok(image) => {
                    self.memory.insert(url, image.clone());
                    return image;
                }
                Err(e) => {
                    warn!(url, error = %e, "undecodable disk cache entry, discarding");
                    self.disk.remove(url).await;
                }
            }
        }

        for (origin, candidate) in self.candidates(url) {
            match self.fetch(&candidate).await {
                Ok(image) => {
                    debug!(url, origin = %origin, candidate = %candidate, "image fetched");
                    self.store(url, image.clone());
                    return image;
                }
                Err(e) => {
                    warn!(url, origin = %origin, candidate = %candidate, error = %e, "image origin missed");
                }
            }
        }

        metrics::counter!(telemetry::IMAGE_PLACEHOLDERS_TOTAL).increment(1);
        warn!(url, "every image origin failed, using placeholder");
        let image = placeholder();
        self.memory.insert(url, image.clone());
        image
    }

    /// Cache `image` under `key`: memory now, disk in the background.
    pub fn store(&self, key: &str, image: LoadedImage) {
        self.memory.insert(key, image.clone());
        if image.is_placeholder() {
            return;
        }
        let disk = Arc::clone(&self.disk);
        let key = key.to_owned();
        tokio::spawn(async move {
            if let Err(e) = disk.put(&key, image.encoded()).await {
                warn!(key = %key, error = %e, "failed to persist image to disk");
            }
        });
    }

    /// Memory-tier lookup only.
    pub fn cached(&self, key: &str) -> Option<LoadedImage> {
        self.memory.get(key)
    }

    /// Candidate URLs for `url`, in the order they are tried.
    ///
    /// An absolute URL is tried as given first; its path and query are
    /// then rebased onto every configured origin. A relative path is only
    /// rebased. Duplicates are dropped.
    pub fn candidates(&self, url: &str) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = Vec::new();
        let suffix = match Url::parse(url) {
            Ok(parsed) => {
                out.push(("source".to_owned(), url.to_owned()));
                match parsed.query() {
                    Some(q) => format!("{}?{q}", parsed.path()),
                    None => parsed.path().to_owned(),
                }
            }
            Err(_) if url.starts_with('/') => url.to_owned(),
            Err(_) => return out,
        };

        for origin in self.origins.iter() {
            let candidate = format!("{}{suffix}", origin.base);
            if !out.iter().any(|(_, c)| *c == candidate) {
                out.push((origin.name.clone(), candidate));
            }
        }
        out
    }

    /// One GET against one candidate. Any `Err` is a miss for that origin.
    async fn fetch(&self, url: &str) -> Result<LoadedImage> {
        let response = self.transport.send(HttpRequest::get(url)).await?;
        if response.is_json() {
            return Err(CourierError::InvalidResponse(format!(
                "JSON body (status {}) instead of image",
                response.status
            )));
        }
        if !response.is_success() {
            if !RETRYABLE_STATUSES.contains(&response.status) {
                debug!(url, status = response.status, "non-retryable image status");
            }
            return Err(CourierError::Server {
                status: response.status,
                body: None,
            });
        }
        if response.body.is_empty() {
            return Err(CourierError::NoData);
        }
        LoadedImage::decode(response.body)
    }

    /// Spawn the periodic disk sweep.
    pub fn start_maintenance(&self) -> JoinHandle<()> {
        Arc::clone(&self.disk).spawn_sweeper(self.sweep_interval)
    }

    pub fn memory(&self) -> &MemoryCache {
        &self.memory
    }

    pub fn disk(&self) -> &DiskCache {
        &self.disk
    }

    pub fn origins(&self) -> &[ImageOrigin] {
        &self.origins
    }
}
