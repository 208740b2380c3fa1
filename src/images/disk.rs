//! Disk tier: one file per image, no manifest.
//!
//! The file name is the hex SHA-256 of the cache key, so the directory
//! listing is the whole index: sizes and ages are recomputed by enumerating
//! it. Files are written to a temporary name and renamed into place, and
//! are never modified afterwards, so a file's modification time is its
//! creation time.
//!
//! Cleanup removes every entry older than `max_age`, then, if the remaining
//! files still exceed `max_bytes`, removes oldest-first until usage is at
//! most half of `max_bytes`. Temporary files left behind by an interrupted
//! write are removed once they are older than [`STALE_TMP_AGE`].

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::Result;
use crate::telemetry;

const ENTRY_EXTENSION: &str = "img";
const TMP_EXTENSION: &str = "tmp";

/// Age after which a leftover temporary file is treated as abandoned.
pub const STALE_TMP_AGE: Duration = Duration::from_secs(60 * 60);

/// Disk tier limits.
#[derive(Debug, Clone)]
pub struct DiskCacheConfig {
    pub dir: PathBuf,
    /// Ceiling on total bytes. Default: 100 MiB.
    pub max_bytes: u64,
    /// Entries older than this are removed. Default: 7 days.
    pub max_age: Duration,
}

impl DiskCacheConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_bytes: 100 * 1024 * 1024,
            max_age: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }

    pub fn max_bytes(mut self, bytes: u64) -> Self {
        self.max_bytes = bytes;
        self
    }

    pub fn max_age(mut self, age: Duration) -> Self {
        self.max_age = age;
        self
    }
}

/// Outcome of one cleanup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: usize,
    pub freed_bytes: u64,
    pub remaining_bytes: u64,
    /// Abandoned temporary files deleted. Not counted in `removed`.
    pub stale_tmp_removed: usize,
}

#[derive(Debug)]
struct DiskEntry {
    path: PathBuf,
    len: u64,
    created: SystemTime,
}

/// On-disk image cache.
#[derive(Debug)]
pub struct DiskCache {
    config: DiskCacheConfig,
    tmp_counter: AtomicU64,
}

impl DiskCache {
    pub fn new(config: DiskCacheConfig) -> Self {
        Self {
            config,
            tmp_counter: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &DiskCacheConfig {
        &self.config
    }

    /// File name for `key`: hex SHA-256 plus extension.
    pub fn file_name(key: &str) -> String {
        let digest = Sha256::digest(key.as_bytes());
        format!("{}.{ENTRY_EXTENSION}", hex::encode(digest))
    }

    /// Full path of the file backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.config.dir.join(Self::file_name(key))
    }

    /// Read the bytes stored for `key`.
    ///
    /// Entries past `max_age` are deleted and reported as a miss. Emits
    /// cache hit/miss metrics.
    pub async fn get(&self, key: &str) -> Option<Bytes> {
        let path = self.path_for(key);
        let found = match self.read_fresh(&path).await {
            Ok(found) => found,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read disk cache entry");
                None
            }
        };
        let metric = if found.is_some() {
            telemetry::CACHE_HITS_TOTAL
        } else {
            telemetry::CACHE_MISSES_TOTAL
        };
        metrics::counter!(metric, "tier" => "disk").increment(1);
        found
    }

    async fn read_fresh(&self, path: &Path) -> std::io::Result<Option<Bytes>> {
        let meta = match fs::metadata(path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        if age_of(created_at(&meta)) > self.config.max_age {
            debug!(path = %path.display(), "disk cache entry expired");
            remove_quietly(path).await;
            return Ok(None);
        }
        match fs::read(path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Store `data` under `key`, then clean up if usage exceeds the ceiling.
    pub async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.config.dir).await?;

        let path = self.path_for(key);
        let seq = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let tmp_path = path.with_extension(format!("{seq}.{TMP_EXTENSION}"));
        fs::write(&tmp_path, data).await?;
        if let Err(e) = fs::rename(&tmp_path, &path).await {
            remove_quietly(&tmp_path).await;
            return Err(e.into());
        }

        if self.usage().await? > self.config.max_bytes {
            self.cleanup().await?;
        }
        Ok(())
    }

    /// Delete the entry for `key`, if any.
    pub async fn remove(&self, key: &str) {
        remove_quietly(&self.path_for(key)).await;
    }

    /// Total bytes held by cache entries.
    pub async fn usage(&self) -> Result<u64> {
        Ok(self.entries().await?.iter().map(|e| e.len).sum())
    }

    /// Number of cache entries on disk.
    pub async fn len(&self) -> Result<usize> {
        Ok(self.entries().await?.len())
    }

    async fn entries(&self) -> Result<Vec<DiskEntry>> {
        self.scan(ENTRY_EXTENSION).await
    }

    async fn scan(&self, extension: &str) -> Result<Vec<DiskEntry>> {
        let mut dir = match fs::read_dir(&self.config.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some(extension) {
                continue;
            }
            let meta = match item.metadata().await {
                Ok(meta) if meta.is_file() => meta,
                Ok(_) => continue,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            entries.push(DiskEntry {
                path,
                len: meta.len(),
                created: created_at(&meta),
            });
        }
        Ok(entries)
    }

    /// Remove expired entries, then shrink to half the ceiling if over it.
    pub async fn cleanup(&self) -> Result<CleanupReport> {
        let mut report = CleanupReport::default();
        let mut kept = Vec::new();

        for tmp in self.scan(TMP_EXTENSION).await? {
            if age_of(tmp.created) > STALE_TMP_AGE && remove_entry(&tmp.path).await {
                report.stale_tmp_removed += 1;
            }
        }
        if report.stale_tmp_removed > 0 {
            debug!(
                count = report.stale_tmp_removed,
                "removed abandoned temporary files"
            );
        }

        for entry in self.entries().await? {
            if age_of(entry.created) > self.config.max_age {
                if remove_entry(&entry.path).await {
                    report.removed += 1;
                    report.freed_bytes += entry.len;
                }
            } else {
                kept.push(entry);
            }
        }

        let mut total: u64 = kept.iter().map(|e| e.len).sum();
        if total > self.config.max_bytes {
            let target = self.config.max_bytes / 2;
            kept.sort_by_key(|e| e.created);
            for entry in &kept {
                if total <= target {
                    break;
                }
                if remove_entry(&entry.path).await {
                    report.removed += 1;
                    report.freed_bytes += entry.len;
                    total -= entry.len;
                }
            }
        }
        report.remaining_bytes = total;

        if report.removed > 0 {
            metrics::counter!(telemetry::DISK_EVICTIONS_TOTAL).increment(report.removed as u64);
            info!(
                removed = report.removed,
                freed_bytes = report.freed_bytes,
                remaining_bytes = report.remaining_bytes,
                "disk image cache cleaned up"
            );
        }
        Ok(report)
    }

    /// Run [`cleanup`](Self::cleanup) now and then every `every`.
    pub fn spawn_sweeper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                if let Err(e) = self.cleanup().await {
                    warn!(dir = %self.config.dir.display(), error = %e, "scheduled disk cache sweep failed");
                }
            }
        })
    }
}

fn created_at(meta: &std::fs::Metadata) -> SystemTime {
    meta.modified().unwrap_or(SystemTime::UNIX_EPOCH)
}

fn age_of(created: SystemTime) -> Duration {
    SystemTime::now()
        .duration_since(created)
        .unwrap_or(Duration::ZERO)
}

/// Remove a cache file. `true` if this call removed it.
async fn remove_entry(path: &Path) -> bool {
    match fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => false,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to remove disk cache entry");
            false
        }
    }
}

async fn remove_quietly(path: &Path) {
    let _ = remove_entry(path).await;
}
