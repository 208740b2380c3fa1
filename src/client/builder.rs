//! Builder for configuring client instances

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::dispatcher::{ApiClient, Origins};
use crate::cache::{CacheConfig, ResponseCache};
use crate::config::{ClientConfig, ImageSettings, default_image_cache_dir};
use crate::images::{
    DiskCache, DiskCacheConfig, ImageLoader, ImageOrigin, MemoryCache, MemoryCacheConfig,
};
use crate::policy::{EndpointPolicies, EndpointRule};
use crate::resilience::{ConcurrencyGate, DEFAULT_MAX_CONCURRENT, RetryConfig};
use crate::transport::{ReqwestTransport, Transport};
use crate::{CourierError, Result};

/// Main entry point for creating client instances.
pub struct Courier;

impl Courier {
    /// Create a new builder for configuring the client.
    pub fn builder() -> CourierBuilder {
        CourierBuilder::new()
    }

    /// Create a builder pre-populated from a loaded configuration.
    pub fn from_config(config: &ClientConfig) -> CourierBuilder {
        CourierBuilder::new()
            .primary(config.origins.primary.clone())
            .secondary(config.origins.secondary.clone())
            .timeout(Duration::from_secs(config.limits.request_timeout_secs))
            .max_concurrent(config.limits.max_concurrent_per_endpoint)
            .retry(RetryConfig::from(&config.retry))
            .policies(config.policies())
            .response_cache(CacheConfig::new().max_entries(config.cache.max_entries))
            .images(config.images.clone())
    }
}

/// API client and image loader sharing one transport.
#[derive(Clone)]
pub struct CourierClient {
    api: ApiClient,
    images: ImageLoader,
}

impl CourierClient {
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn images(&self) -> &ImageLoader {
        &self.images
    }

    pub fn into_parts(self) -> (ApiClient, ImageLoader) {
        (self.api, self.images)
    }
}

/// Builder for configuring client instances.
pub struct CourierBuilder {
    primary: Option<String>,
    secondary: Option<String>,
    timeout: Duration,
    max_concurrent: usize,
    retry: RetryConfig,
    policies: EndpointPolicies,
    response_cache: CacheConfig,
    images: ImageSettings,
    transport: Option<Arc<dyn Transport>>,
}

impl CourierBuilder {
    pub fn new() -> Self {
        Self {
            primary: None,
            secondary: None,
            timeout: crate::transport::DEFAULT_TIMEOUT,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            retry: RetryConfig::default(),
            policies: EndpointPolicies::default(),
            response_cache: CacheConfig::default(),
            images: ImageSettings::default(),
            transport: None,
        }
    }

    /// Base URL of the primary origin.
    pub fn primary(mut self, base_url: impl Into<String>) -> Self {
        self.primary = Some(base_url.into());
        self
    }

    /// Base URL of the secondary (failover) origin.
    pub fn secondary(mut self, base_url: impl Into<String>) -> Self {
        self.secondary = Some(base_url.into());
        self
    }

    /// Per-attempt HTTP timeout (default: 20s). Ignored with a custom transport.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// In-flight cap per endpoint path (default: 3).
    pub fn max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Retry policy applied to each origin.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    /// Replace the whole endpoint policy table.
    pub fn policies(mut self, policies: EndpointPolicies) -> Self {
        self.policies = policies;
        self
    }

    /// Add or replace one endpoint rule.
    pub fn endpoint(mut self, rule: EndpointRule) -> Self {
        self.policies.push(rule);
        self
    }

    /// Response cache capacity.
    pub fn response_cache(mut self, config: CacheConfig) -> Self {
        self.response_cache = config;
        self
    }

    /// Image pipeline settings.
    pub fn images(mut self, settings: ImageSettings) -> Self {
        self.images = settings;
        self
    }

    /// Directory of the disk image tier.
    pub fn image_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.images.cache_dir = Some(dir.into());
        self
    }

    /// Add an alternate image origin, tried after primary and secondary.
    pub fn image_alternate(mut self, base_url: impl Into<String>) -> Self {
        self.images.alternates.push(base_url.into());
        self
    }

    /// Use a custom transport instead of the reqwest one.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    fn origins(&self) -> Result<Origins> {
        let primary = self
            .primary
            .clone()
            .ok_or_else(|| CourierError::Configuration("primary origin not set".into()))?;
        let secondary = self
            .secondary
            .clone()
            .ok_or_else(|| CourierError::Configuration("secondary origin not set".into()))?;
        Origins::new(primary, secondary)
    }

    fn make_transport(&self) -> Result<Arc<dyn Transport>> {
        match &self.transport {
            Some(transport) => Ok(Arc::clone(transport)),
            None => Ok(Arc::new(ReqwestTransport::new(self.timeout)?)),
        }
    }

    fn api_with(&self, origins: Origins, transport: Arc<dyn Transport>) -> ApiClient {
        ApiClient::new(
            origins,
            transport,
            self.policies.clone(),
            ResponseCache::new(&self.response_cache),
            ConcurrencyGate::new(self.max_concurrent),
            self.retry.clone(),
        )
    }

    fn images_with(&self, origins: &Origins, transport: Arc<dyn Transport>) -> ImageLoader {
        use crate::resilience::Origin;

        let settings = &self.images;
        let mut image_origins = vec![
            ImageOrigin::new("primary", origins.base(Origin::Primary)),
            ImageOrigin::new("secondary", origins.base(Origin::Secondary)),
        ];
        for (i, base) in settings.alternates.iter().enumerate() {
            image_origins.push(ImageOrigin::new(format!("alternate-{}", i + 1), base.clone()));
        }

        let memory = MemoryCache::new(&MemoryCacheConfig {
            max_items: settings.memory_max_items,
            max_cost: settings.memory_max_cost_bytes,
        });
        let dir = settings
            .cache_dir
            .clone()
            .unwrap_or_else(default_image_cache_dir);
        let disk = DiskCache::new(
            DiskCacheConfig::new(dir)
                .max_bytes(settings.disk_max_bytes)
                .max_age(Duration::from_secs(
                    settings.disk_max_age_days.saturating_mul(24 * 60 * 60),
                )),
        );

        ImageLoader::new(transport, image_origins, memory, disk)
            .sweep_interval(Duration::from_secs(settings.sweep_interval_secs.max(1)))
    }

    /// Build only the API client.
    pub fn build_api(self) -> Result<ApiClient> {
        let origins = self.origins()?;
        let transport = self.make_transport()?;
        Ok(self.api_with(origins, transport))
    }

    /// Build only the image loader.
    pub fn build_images(self) -> Result<ImageLoader> {
        let origins = self.origins()?;
        let transport = self.make_transport()?;
        Ok(self.images_with(&origins, transport))
    }

    /// Build the API client and image loader over one shared transport.
    pub fn build(self) -> Result<CourierClient> {
        let origins = self.origins()?;
        let transport = self.make_transport()?;
        let images = self.images_with(&origins, Arc::clone(&transport));
        let api = self.api_with(origins, transport);
        Ok(CourierClient { api, images })
    }
}

impl Default for CourierBuilder {
    fn default() -> Self {
        Self::new()
    }
}
