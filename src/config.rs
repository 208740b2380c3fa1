//! Configuration loading.
//!
//! A [`ClientConfig`] is read from a TOML file (or string) and turned into
//! a [`CourierBuilder`](crate::CourierBuilder) via
//! [`Courier::from_config()`](crate::Courier::from_config). Every section
//! except `[origins]` is optional and falls back to the defaults below.
//!
//! ```toml
//! [origins]
//! primary = "https://api.example.com"
//! secondary = "https://backup.example.com"
//!
//! [limits]
//! request_timeout_secs = 20
//! max_concurrent_per_endpoint = 3
//!
//! [[endpoints]]
//! path = "/order-status/"
//! prefix = true
//! min_interval_ms = 500
//! max_age_secs = 5
//!
//! [images]
//! alternates = ["https://cdn.example.com"]
//! disk_max_age_days = 7
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::policy::{DEFAULT_MAX_AGE, DEFAULT_MIN_INTERVAL, EndpointPolicies, EndpointRule, default_rules};
use crate::resilience::RetryConfig;
use crate::{CourierError, Result};

/// Client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub origins: OriginsConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    /// Extra endpoint rules, applied on top of the built-in table.
    #[serde(default)]
    pub endpoints: Vec<EndpointRule>,
    /// Start from the built-in endpoint table (default: true).
    #[serde(default = "default_true")]
    pub use_default_endpoints: bool,
    #[serde(default)]
    pub images: ImageSettings,
}

fn default_true() -> bool {
    true
}

/// The two interchangeable backend origins.
#[derive(Debug, Clone, Deserialize)]
pub struct OriginsConfig {
    pub primary: String,
    pub secondary: String,
}

/// Transport and admission limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Per-attempt HTTP timeout in seconds (default: 20).
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    /// Maximum in-flight requests per endpoint path (default: 3).
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_per_endpoint: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_timeout(),
            max_concurrent_per_endpoint: default_max_concurrent(),
        }
    }
}

fn default_timeout() -> u64 {
    20
}

fn default_max_concurrent() -> usize {
    3
}

/// Retry/backoff settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    /// Total attempts per origin, including the first (default: 3).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry in milliseconds (default: 1000).
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Backoff cap in milliseconds (default: 8000).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    8_000
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        RetryConfig::new()
            .max_attempts(settings.max_attempts)
            .initial_delay(Duration::from_millis(settings.initial_delay_ms))
            .max_delay(Duration::from_millis(settings.max_delay_ms))
    }
}

/// Rate limiter defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    /// Interval for paths without a rule, in milliseconds (default: 2000).
    #[serde(default = "default_interval_ms")]
    pub default_interval_ms: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            default_interval_ms: default_interval_ms(),
        }
    }
}

fn default_interval_ms() -> u64 {
    DEFAULT_MIN_INTERVAL.as_millis() as u64
}

/// Response cache settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// Max-age for paths without a rule, in seconds (default: 60).
    #[serde(default = "default_max_age_secs")]
    pub default_max_age_secs: u64,
    /// Maximum number of cached paths (default: 1,000).
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_max_age_secs: default_max_age_secs(),
            max_entries: default_max_entries(),
        }
    }
}

fn default_max_age_secs() -> u64 {
    DEFAULT_MAX_AGE.as_secs()
}

fn default_max_entries() -> u64 {
    1_000
}

/// Image pipeline settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageSettings {
    /// Maximum decoded images held in memory (default: 100).
    #[serde(default = "default_memory_max_items")]
    pub memory_max_items: u64,
    /// Maximum total decoded cost held in memory, in bytes (default: 64 MiB).
    #[serde(default = "default_memory_max_cost")]
    pub memory_max_cost_bytes: u64,
    /// Disk tier ceiling in bytes (default: 100 MiB).
    #[serde(default = "default_disk_max_bytes")]
    pub disk_max_bytes: u64,
    /// Disk tier max age in days (default: 7).
    #[serde(default = "default_disk_max_age_days")]
    pub disk_max_age_days: u64,
    /// Disk tier directory (default: `<user cache dir>/courier/images`).
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// Named alternate origins tried after primary and secondary.
    #[serde(default)]
    pub alternates: Vec<String>,
    /// Interval between scheduled disk sweeps in seconds (default: one day).
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            memory_max_items: default_memory_max_items(),
            memory_max_cost_bytes: default_memory_max_cost(),
            disk_max_bytes: default_disk_max_bytes(),
            disk_max_age_days: default_disk_max_age_days(),
            cache_dir: None,
            alternates: Vec::new(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_memory_max_items() -> u64 {
    100
}

fn default_memory_max_cost() -> u64 {
    64 * 1024 * 1024
}

fn default_disk_max_bytes() -> u64 {
    100 * 1024 * 1024
}

fn default_disk_max_age_days() -> u64 {
    7
}

fn default_sweep_interval() -> u64 {
    24 * 60 * 60
}

/// Default disk tier directory: `~/.cache/courier/images`.
pub fn default_image_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("courier")
        .join("images")
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CourierError::Configuration(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| CourierError::Configuration(format!("invalid config: {e}")))
    }

    /// Build the endpoint policy table described by this config.
    pub fn policies(&self) -> EndpointPolicies {
        let base = if self.use_default_endpoints {
            default_rules()
        } else {
            Vec::new()
        };
        let mut policies = EndpointPolicies::new(
            base,
            Duration::from_millis(self.rate_limit.default_interval_ms),
            Duration::from_secs(self.cache.default_max_age_secs),
        );
        for rule in &self.endpoints {
            policies.push(rule.clone());
        }
        policies
    }
}
