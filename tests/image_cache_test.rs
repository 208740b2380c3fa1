//! Integration tests for the image pipeline: memory tier, disk tier,
//! origin fallback and the placeholder.

use std::io::Cursor;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use courier::images::{DiskCache, DiskCacheConfig, PLACEHOLDER_SIZE, STALE_TMP_AGE};
use courier::{Courier, ImageLoader, LoadedImage};

fn png(width: u32, height: u32) -> Vec<u8> {
    let pixels = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]));
    let mut out = Vec::new();
    DynamicImage::ImageRgba8(pixels)
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .unwrap();
    out
}

fn png_response(width: u32, height: u32) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(png(width, height), "image/png")
}

fn loader(
    primary: &MockServer,
    secondary: &MockServer,
    alternate: Option<&MockServer>,
    dir: &std::path::Path,
) -> ImageLoader {
    let mut builder = Courier::builder()
        .primary(primary.uri())
        .secondary(secondary.uri())
        .image_cache_dir(dir);
    if let Some(alternate) = alternate {
        builder = builder.image_alternate(alternate.uri());
    }
    builder.build_images().unwrap()
}

fn set_age(path: &std::path::Path, age: Duration) {
    let file = std::fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - age).unwrap();
}

// =============================================================================
// Memory tier
// =============================================================================

#[tokio::test]
async fn stored_image_is_served_from_memory() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let loader = loader(&primary, &secondary, None, dir.path());

    let encoded = png(4, 3);
    let image = LoadedImage::decode(Bytes::from(encoded.clone())).unwrap();
    let pixels = image.pixels().as_raw().clone();
    loader.store("/get_product_photo/1", image);

    let cached = loader.cached("/get_product_photo/1").unwrap();
    assert_eq!((cached.width(), cached.height()), (4, 3));

    let loaded = loader.load_image("/get_product_photo/1").await;
    assert!(!loaded.is_placeholder());
    assert_eq!(loaded.pixels().as_raw(), &pixels);
    assert_eq!(&loaded.encoded()[..], &encoded[..]);
    assert_eq!(&loaded.pixels().as_raw()[..4], &[10, 20, 30, 255]);
    assert!(primary.received_requests().await.unwrap().is_empty());
    assert!(secondary.received_requests().await.unwrap().is_empty());
}

// =============================================================================
// Disk tier
// =============================================================================

#[tokio::test]
async fn overflow_evicts_oldest_down_to_half_the_ceiling() {
    let dir = tempfile::tempdir().unwrap();
    let disk = DiskCache::new(DiskCacheConfig::new(dir.path()).max_bytes(1000));

    for (i, hours) in [3u64, 2, 1].iter().enumerate() {
        let key = format!("old-{i}");
        disk.put(&key, &[0u8; 300]).await.unwrap();
        set_age(&disk.path_for(&key), Duration::from_secs(hours * 3600));
    }
    assert_eq!(disk.usage().await.unwrap(), 900);

    disk.put("newest", &[1u8; 300]).await.unwrap();

    assert!(disk.usage().await.unwrap() <= 500);
    assert_eq!(disk.get("newest").await.as_deref(), Some(&[1u8; 300][..]));
    for i in 0..3 {
        assert!(disk.get(&format!("old-{i}")).await.is_none());
    }
}

#[tokio::test]
async fn expired_entries_are_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let disk = DiskCache::new(
        DiskCacheConfig::new(dir.path()).max_age(Duration::from_secs(7 * 24 * 3600)),
    );

    disk.put("stale", b"bytes").await.unwrap();
    disk.put("fresh", b"bytes").await.unwrap();
    set_age(&disk.path_for("stale"), Duration::from_secs(8 * 24 * 3600));

    let report = disk.cleanup().await.unwrap();
    assert_eq!(report.removed, 1);
    assert_eq!(report.freed_bytes, 5);
    assert_eq!(report.remaining_bytes, 5);
    assert!(!disk.path_for("stale").exists());
    assert!(disk.get("fresh").await.is_some());
}

#[tokio::test]
async fn abandoned_temp_files_are_swept() {
    let dir = tempfile::tempdir().unwrap();
    let disk = DiskCache::new(DiskCacheConfig::new(dir.path()));
    disk.put("kept", b"bytes").await.unwrap();

    let abandoned = dir.path().join("0f0f.3.tmp");
    let in_progress = dir.path().join("0f0f.4.tmp");
    std::fs::write(&abandoned, b"partial").unwrap();
    std::fs::write(&in_progress, b"partial").unwrap();
    set_age(&abandoned, STALE_TMP_AGE + Duration::from_secs(60));

    let report = disk.cleanup().await.unwrap();
    assert_eq!(report.stale_tmp_removed, 1);
    assert_eq!(report.removed, 0);
    assert!(!abandoned.exists());
    assert!(in_progress.exists());
    assert_eq!(disk.len().await.unwrap(), 1);
}

#[tokio::test]
async fn expired_entry_is_a_miss_on_read() {
    let dir = tempfile::tempdir().unwrap();
    let disk = DiskCache::new(DiskCacheConfig::new(dir.path()));

    disk.put("stale", b"bytes").await.unwrap();
    set_age(&disk.path_for("stale"), Duration::from_secs(30 * 24 * 3600));

    assert!(disk.get("stale").await.is_none());
    assert!(!disk.path_for("stale").exists());
}

#[tokio::test]
async fn disk_hit_is_promoted_to_memory() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let loader = loader(&primary, &secondary, None, dir.path());

    let url = "/get_restaurant_photo/abc";
    loader.disk().put(url, &png(5, 5)).await.unwrap();
    assert!(!loader.memory().contains(url));

    let image = loader.load_image(url).await;
    assert_eq!(image.width(), 5);
    assert!(loader.memory().contains(url));
    assert!(primary.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn corrupt_disk_entry_is_discarded() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get_restaurant_photo/abc"))
        .respond_with(png_response(2, 2))
        .expect(1)
        .mount(&primary)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let loader = loader(&primary, &secondary, None, dir.path());

    let url = "/get_restaurant_photo/abc";
    loader.disk().put(url, b"not an image").await.unwrap();

    let image = loader.load_image(url).await;
    assert!(!image.is_placeholder());
    assert_eq!(image.width(), 2);
}

// =============================================================================
// Origin fallback
// =============================================================================

#[tokio::test]
async fn falls_back_past_json_and_unavailable_origins() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;
    let alternate = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/get_product_photo/7"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"error": "no photo"})),
        )
        .expect(1)
        .mount(&primary)
        .await;
    Mock::given(method("GET"))
        .and(path("/get_product_photo/7"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&secondary)
        .await;
    Mock::given(method("GET"))
        .and(path("/get_product_photo/7"))
        .respond_with(png_response(8, 6))
        .expect(1)
        .mount(&alternate)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let loader = loader(&primary, &secondary, Some(&alternate), dir.path());

    let image = loader.load_image("/get_product_photo/7").await;
    assert!(!image.is_placeholder());
    assert_eq!((image.width(), image.height()), (8, 6));

    // Served from memory; the expect(1) counts above would fail otherwise.
    let again = loader.load_image("/get_product_photo/7").await;
    assert_eq!(again.width(), 8);
}

#[tokio::test]
async fn absolute_url_is_tried_before_origins() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;
    let source = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/photos/1.png"))
        .respond_with(png_response(3, 3))
        .expect(1)
        .mount(&source)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let loader = loader(&primary, &secondary, None, dir.path());

    let url = format!("{}/photos/1.png", source.uri());
    let candidates = loader.candidates(&url);
    assert_eq!(candidates[0].0, "source");
    assert_eq!(candidates[1].1, format!("{}/photos/1.png", primary.uri()));

    let image = loader.load_image(&url).await;
    assert_eq!(image.width(), 3);
    assert!(primary.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn fetched_image_is_persisted_to_disk() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(png_response(2, 2))
        .mount(&primary)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let loader = loader(&primary, &secondary, None, dir.path());
    loader.load_image("/get_product_photo/9").await;

    let mut stored = None;
    for _ in 0..100 {
        stored = loader.disk().get("/get_product_photo/9").await;
        if stored.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(stored.map(|b| b.to_vec()), Some(png(2, 2)));
}

// =============================================================================
// Placeholder
// =============================================================================

#[tokio::test]
async fn total_failure_yields_cached_placeholder() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&primary)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&secondary)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let loader = loader(&primary, &secondary, None, dir.path());

    let image = loader.load_image("/get_product_photo/missing").await;
    assert!(image.is_placeholder());
    assert_eq!(image.width(), PLACEHOLDER_SIZE);
    assert_eq!(image.height(), PLACEHOLDER_SIZE);

    let again = loader.load_image("/get_product_photo/missing").await;
    assert!(again.is_placeholder());
    assert_eq!(loader.disk().len().await.unwrap(), 0);
}

#[tokio::test]
async fn empty_body_is_a_miss() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&primary)
        .await;
    Mock::given(method("GET"))
        .respond_with(png_response(1, 1))
        .expect(1)
        .mount(&secondary)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let loader = loader(&primary, &secondary, None, dir.path());

    let image = loader.load_image("/get_product_photo/2").await;
    assert!(!image.is_placeholder());
}
