//! Tests for metrics integration.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

use courier::images::{DiskCache, DiskCacheConfig};
use courier::resilience::ConcurrencyGate;
use courier::telemetry;
use courier::{
    ApiClient, ApiRequest, Courier, HttpRequest, HttpResponse, NetworkErrorKind, Result,
    RetryConfig, Transport,
};

// ============================================================================
// Mock transports
// ============================================================================

/// Primary answers `primary_status`; secondary always answers 200.
struct SplitTransport {
    primary_status: u16,
}

#[async_trait]
impl Transport for SplitTransport {
    fn name(&self) -> &str {
        "split"
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let status = if request.url.starts_with("https://primary.test") {
            self.primary_status
        } else {
            200
        };
        Ok(HttpResponse::new(status, "[]"))
    }
}

struct DeadTransport;

#[async_trait]
impl Transport for DeadTransport {
    fn name(&self) -> &str {
        "dead"
    }

    async fn send(&self, _request: HttpRequest) -> Result<HttpResponse> {
        Err(courier::CourierError::network(
            NetworkErrorKind::ConnectionLost,
            "reset by peer",
        ))
    }
}

fn client(transport: Arc<dyn Transport>) -> ApiClient {
    Courier::builder()
        .primary("https://primary.test")
        .secondary("https://secondary.test")
        .retry(RetryConfig::new().initial_delay(Duration::from_millis(1)))
        .transport(transport)
        .build_api()
        .unwrap()
}

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

// ============================================================================
// Helpers
// ============================================================================

/// Sum all counter values matching a given metric name.
fn counter_total(snapshot: &SnapshotVec, name: &str) -> u64 {
    counter_where(snapshot, name, |_| true)
}

/// Sum counter values for `name` carrying `label = value`.
fn counter_labeled(snapshot: &SnapshotVec, name: &str, label: &str, value: &str) -> u64 {
    counter_where(snapshot, name, |key| {
        key.key()
            .labels()
            .any(|l| l.key() == label && l.value() == value)
    })
}

fn counter_where(
    snapshot: &SnapshotVec,
    name: &str,
    filter: impl Fn(&metrics_util::CompositeKey) -> bool,
) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| {
            key.kind() == MetricKind::Counter && key.key().name() == name && filter(key)
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Check if any histogram entries exist for a given metric name.
fn has_histogram(snapshot: &SnapshotVec, name: &str) -> bool {
    snapshot
        .iter()
        .any(|(key, _, _, _)| key.kind() == MetricKind::Histogram && key.key().name() == name)
}

/// Run `fut` with `recorder` installed for the current thread.
///
/// `block_in_place` ensures the sync `with_local_recorder` closure stays
/// on the current thread while `block_on` drives the inner async work.
fn recorded<F: std::future::Future>(recorder: &DebuggingRecorder, fut: F) -> F::Output {
    metrics::with_local_recorder(recorder, || {
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(fut))
    })
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn successful_request_records_metrics() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let api = client(Arc::new(SplitTransport { primary_status: 200 }));

    let result = recorded(&recorder, async {
        api.request(&ApiRequest::get("/top-picks")).await?;
        api.request(&ApiRequest::get("/top-picks")).await
    });
    assert!(result.is_ok());

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_total(&snapshot, telemetry::REQUESTS_TOTAL), 1);
    assert_eq!(
        counter_labeled(&snapshot, telemetry::REQUESTS_TOTAL, "status", "ok"),
        1
    );
    assert!(has_histogram(&snapshot, telemetry::REQUEST_DURATION_SECONDS));
    assert_eq!(
        counter_labeled(&snapshot, telemetry::CACHE_MISSES_TOTAL, "tier", "response"),
        1
    );
    assert_eq!(
        counter_labeled(&snapshot, telemetry::CACHE_HITS_TOTAL, "tier", "response"),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn failover_records_both_origins() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let api = client(Arc::new(SplitTransport { primary_status: 503 }));

    let result = recorded(&recorder, api.request(&ApiRequest::post("/verify-order")));
    assert!(result.is_ok());

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_total(&snapshot, telemetry::FAILOVERS_TOTAL), 1);
    assert_eq!(
        counter_labeled(&snapshot, telemetry::REQUESTS_TOTAL, "origin", "primary"),
        1
    );
    assert_eq!(
        counter_labeled(&snapshot, telemetry::REQUESTS_TOTAL, "origin", "secondary"),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn retries_are_counted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let api = client(Arc::new(DeadTransport));

    let result = recorded(&recorder, api.request(&ApiRequest::get("/top-picks")));
    assert!(result.is_err());

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_total(&snapshot, telemetry::RETRIES_TOTAL), 2);
    assert_eq!(
        counter_labeled(&snapshot, telemetry::REQUESTS_TOTAL, "status", "error"),
        3
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn throttled_request_is_counted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let api = client(Arc::new(SplitTransport { primary_status: 200 }));

    let result = recorded(&recorder, async {
        api.request(&ApiRequest::post("/order-placed")).await?;
        api.request(&ApiRequest::post("/order-placed")).await
    });
    assert!(result.is_err());

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_labeled(&snapshot, telemetry::THROTTLED_TOTAL, "path", "/order-placed"),
        1
    );
    assert_eq!(counter_total(&snapshot, telemetry::REQUESTS_TOTAL), 1);
}

#[test]
fn queue_rejection_is_counted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        let gate = ConcurrencyGate::new(1);
        let _held = gate.acquire("/top-picks").unwrap();
        assert!(gate.acquire("/top-picks").is_err());
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_total(&snapshot, telemetry::QUEUE_REJECTIONS_TOTAL), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn placeholder_is_counted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let dir = tempfile::tempdir().unwrap();
    let loader = Courier::builder()
        .primary("https://primary.test")
        .secondary("https://secondary.test")
        .image_cache_dir(dir.path())
        .transport(Arc::new(DeadTransport))
        .build_images()
        .unwrap();

    let image = recorded(&recorder, loader.load_image("/get_product_photo/1"));
    assert!(image.is_placeholder());

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_total(&snapshot, telemetry::IMAGE_PLACEHOLDERS_TOTAL), 1);
    assert_eq!(
        counter_labeled(&snapshot, telemetry::CACHE_MISSES_TOTAL, "tier", "memory"),
        1
    );
    assert_eq!(
        counter_labeled(&snapshot, telemetry::CACHE_MISSES_TOTAL, "tier", "disk"),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn disk_evictions_are_counted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let dir = tempfile::tempdir().unwrap();
    let disk = DiskCache::new(DiskCacheConfig::new(dir.path()).max_bytes(100));

    let result = recorded(&recorder, async {
        disk.put("a", &[0u8; 60]).await?;
        disk.put("b", &[0u8; 60]).await
    });
    assert!(result.is_ok());

    let snapshot = snapshotter.snapshot().into_vec();
    assert!(counter_total(&snapshot, telemetry::DISK_EVICTIONS_TOTAL) >= 1);
}

#[tokio::test]
async fn metrics_are_noop_without_recorder() {
    // Verify no panics when no recorder is installed.
    let api = client(Arc::new(SplitTransport { primary_status: 200 }));
    api.request(&ApiRequest::get("/top-picks")).await.unwrap();
}
