//! Slide cache integration tests.
//!
//! Tests verify that slides are opened once and shared:
//! - Across repeated and concurrent HTTP requests
//! - Between the tile and heatmap endpoints
//! - Not at all for failed opens, which are retried

use std::sync::Arc;

use axum::http::StatusCode;

use wsi_viewer::slide::SlideRegistry;
use wsi_viewer::tile::{PyramidConfig, TileRequest, TileService};
use wsi_viewer::CachePolicy;

use super::test_utils::{slides_dir, CountingSource, TestApp};

#[tokio::test]
async fn test_slide_opened_once_across_endpoints() {
    let app = TestApp::new();

    app.get_json("/api/slide/small.png/metadata", StatusCode::OK)
        .await;
    app.get_image("/api/slide/small.png/tile/0/0/0.jpg").await;
    app.get_image("/api/slide/small.png/thumbnail").await;
    app.get_image("/api/slide/small.png/region").await;
    app.get_json("/api/slide/small.png/heatmap", StatusCode::OK)
        .await;

    assert_eq!(app.open_count(), 1);
    assert_eq!(app.registry.cached_count().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_open_once() {
    let app = Arc::new(TestApp::new());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let app = Arc::clone(&app);
            tokio::spawn(async move {
                let uri = if i % 2 == 0 {
                    "/api/slide/square.png/tile/1/0/0.jpg"
                } else {
                    "/api/slide/square.png/heatmap"
                };
                app.get(uri).await.status()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }
    assert_eq!(app.open_count(), 1);
}

#[tokio::test]
async fn test_failed_open_is_retried() {
    let app = TestApp::new();

    app.get_json(
        "/api/slide/broken.png/metadata",
        StatusCode::INTERNAL_SERVER_ERROR,
    )
    .await;
    app.get_json(
        "/api/slide/broken.png/metadata",
        StatusCode::INTERNAL_SERVER_ERROR,
    )
    .await;

    assert_eq!(app.open_count(), 2);
    assert_eq!(app.registry.cached_count().await, 0);
}

#[tokio::test]
async fn test_lru_policy_evicts_and_reopens() {
    let dir = slides_dir();
    let registry = Arc::new(SlideRegistry::with_policy(
        CountingSource::new(dir.path()),
        PyramidConfig::default(),
        CachePolicy::from_capacity(1),
    ));
    let service = TileService::new(Arc::clone(&registry));

    service
        .get_tile(TileRequest::new("small.png", 0, 0, 0))
        .await
        .unwrap();
    service
        .get_tile(TileRequest::new("square.png", 0, 0, 0))
        .await
        .unwrap();
    assert_eq!(registry.cached_count().await, 1);

    // small.png was evicted by square.png
    service
        .get_tile(TileRequest::new("small.png", 0, 0, 0))
        .await
        .unwrap();
    assert_eq!(registry.source().open_count(), 3);
}

#[tokio::test]
async fn test_invalidate_forces_reopen() {
    let app = TestApp::new();

    app.get_image("/api/slide/small.png/tile/0/0/0.jpg").await;
    app.registry.invalidate("small.png").await;
    app.get_image("/api/slide/small.png/tile/0/0/0.jpg").await;

    assert_eq!(app.open_count(), 2);
}
