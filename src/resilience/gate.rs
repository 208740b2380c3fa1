//! Per-endpoint in-flight cap.
//!
//! Each path gets its own semaphore with `max_concurrent` permits. An
//! acquisition that finds no free permit fails immediately with
//! [`CourierError::QueueFull`] instead of waiting. The permit lives inside a
//! [`SlotGuard`] and goes back to the semaphore when the guard drops, which
//! covers success, error and a caller abandoning the future mid-flight.
//! A path whose last slot is released is dropped from the map, so the map
//! only holds paths with requests in flight.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tracing::{debug, warn};

use crate::telemetry;
use crate::{CourierError, Result};

/// Default in-flight cap per endpoint path.
pub const DEFAULT_MAX_CONCURRENT: usize = 3;

/// Per-path concurrency gate.
#[derive(Debug)]
pub struct ConcurrencyGate {
    max_concurrent: usize,
    slots: Arc<Mutex<SlotMap>>,
    next_id: AtomicU64,
}

type SlotMap = HashMap<String, Arc<Semaphore>>;

fn lock(slots: &Mutex<SlotMap>) -> MutexGuard<'_, SlotMap> {
    slots.lock().unwrap_or_else(|e| e.into_inner())
}

/// One acquired in-flight slot. Releases on drop.
#[derive(Debug)]
pub struct SlotGuard {
    id: u64,
    path: String,
    permit: Option<OwnedSemaphorePermit>,
    semaphore: Arc<Semaphore>,
    slots: Arc<Mutex<SlotMap>>,
    max_concurrent: usize,
}

impl SlotGuard {
    /// Correlation id of the request holding this slot.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        drop(self.permit.take());
        // acquire takes its permit under the same lock, so a fully free
        // semaphore here has no holder and no acquirer racing for it
        let mut slots = lock(&self.slots);
        if self.semaphore.available_permits() == self.max_concurrent
            && slots
                .get(&self.path)
                .is_some_and(|s| Arc::ptr_eq(s, &self.semaphore))
        {
            slots.remove(&self.path);
        }
        debug!(request_id = self.id, path = %self.path, "released in-flight slot");
    }
}

impl ConcurrencyGate {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
            slots: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Claim a slot for `path`, failing fast when the path is saturated.
    pub fn acquire(&self, path: &str) -> Result<SlotGuard> {
        let acquired = {
            let mut slots = lock(&self.slots);
            let semaphore = slots
                .entry(path.to_owned())
                .or_insert_with(|| Arc::new(Semaphore::new(self.max_concurrent)))
                .clone();
            Arc::clone(&semaphore)
                .try_acquire_owned()
                .map(|permit| (permit, semaphore))
        };
        match acquired {
            Ok((permit, semaphore)) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                debug!(request_id = id, path, "acquired in-flight slot");
                Ok(SlotGuard {
                    id,
                    path: path.to_owned(),
                    permit: Some(permit),
                    semaphore,
                    slots: Arc::clone(&self.slots),
                    max_concurrent: self.max_concurrent,
                })
            }
            Err(TryAcquireError::NoPermits) | Err(TryAcquireError::Closed) => {
                metrics::counter!(telemetry::QUEUE_REJECTIONS_TOTAL, "path" => path.to_owned())
                    .increment(1);
                warn!(
                    path,
                    max_concurrent = self.max_concurrent,
                    "in-flight limit reached"
                );
                Err(CourierError::QueueFull {
                    path: path.to_owned(),
                })
            }
        }
    }

    /// Number of slots currently held for `path`.
    pub fn in_flight(&self, path: &str) -> usize {
        lock(&self.slots)
            .get(path)
            .map(|s| self.max_concurrent - s.available_permits())
            .unwrap_or(0)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Number of paths with at least one slot held.
    pub fn tracked_paths(&self) -> usize {
        lock(&self.slots).len()
    }
}

impl Default for ConcurrencyGate {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT)
    }
}
