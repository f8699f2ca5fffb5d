//! Deep-zoom pyramid integration tests.
//!
//! Tests verify tile sizes and content as served over HTTP:
//! - Overlap only on interior edges
//! - Clipped edge tiles
//! - Whole-slide single tile at level 0
//! - Custom tile size and overlap

use std::sync::Arc;

use axum::http::StatusCode;
use image::RgbImage;

use wsi_viewer::heatmap::HeatmapService;
use wsi_viewer::slide::SlideRegistry;
use wsi_viewer::tile::{PyramidConfig, TileRequest, TileService};
use wsi_viewer::CachePolicy;

use super::test_utils::{half_tissue_image, slides_dir, CountingSource, TestApp};

#[tokio::test]
async fn test_level_zero_is_single_tile() {
    let app = TestApp::new();
    // 600x400 downscaled by 4
    let tile = app.get_image("/api/slide/small.png/tile/0/0/0.jpg").await;
    assert_eq!(tile.dimensions(), (150, 100));
}

#[tokio::test]
async fn test_interior_edges_carry_overlap() {
    let app = TestApp::new();

    // square.png level 1 is 512x512 in a 2x2 grid of 256px tiles
    let expected = [
        ((0, 0), (257, 257)),
        ((1, 0), (257, 257)),
        ((0, 1), (257, 257)),
        ((1, 1), (257, 257)),
    ];
    for ((col, row), size) in expected {
        let uri = format!("/api/slide/square.png/tile/1/{col}/{row}.jpg");
        let tile = app.get_image(&uri).await;
        assert_eq!(tile.dimensions(), size, "tile ({col}, {row})");
    }
}

#[tokio::test]
async fn test_edge_tiles_are_clipped() {
    let app = TestApp::new();

    // small.png level 2 is 600x400 in a 3x2 grid
    let tile = app.get_image("/api/slide/small.png/tile/2/0/0.jpg").await;
    assert_eq!(tile.dimensions(), (257, 257));

    let tile = app.get_image("/api/slide/small.png/tile/2/1/1.jpg").await;
    assert_eq!(tile.dimensions(), (258, 145));

    let tile = app.get_image("/api/slide/small.png/tile/2/2/1.jpg").await;
    assert_eq!(tile.dimensions(), (89, 145));
}

#[tokio::test]
async fn test_tile_content_follows_slide() {
    let app = TestApp::new();

    // Left tile of the full-resolution level is glass, right one tissue
    let left = app.get_image("/api/slide/small.png/tile/2/0/0.jpg").await;
    let right = app.get_image("/api/slide/small.png/tile/2/2/0.jpg").await;

    assert!(mean_brightness(&left) > 220.0);
    assert!(mean_brightness(&right) < 120.0);
}

#[tokio::test]
async fn test_custom_tile_geometry() {
    let dir = slides_dir();
    let registry = Arc::new(SlideRegistry::with_policy(
        CountingSource::new(dir.path()),
        PyramidConfig {
            tile_size: 100,
            overlap: 2,
        },
        CachePolicy::Unbounded,
    ));
    let service = TileService::new(Arc::clone(&registry));

    let metadata = service.slide_metadata("small.png").await.unwrap();
    // 100 < 600, 200 < 600, 400 < 600, 800 >= 600
    assert_eq!(metadata.pyramid_level_count, 4);
    assert_eq!(metadata.pyramid_tile_grids.last(), Some(&(6, 4)));

    let tile = service
        .get_tile(TileRequest::new("small.png", 3, 1, 1))
        .await
        .unwrap();
    assert_eq!((tile.width, tile.height), (104, 104));

    let corner = service
        .get_tile(TileRequest::new("small.png", 3, 5, 3))
        .await
        .unwrap();
    assert_eq!((corner.width, corner.height), (102, 102));

    // The heatmap shares the registry and reuses the opened slide
    let heatmaps = HeatmapService::new(registry);
    heatmaps.compute_or_fetch("small.png").await.unwrap();
    assert_eq!(source_opens(&service), 1);
}

#[tokio::test]
async fn test_wide_slide_level_count() {
    let dir = tempfile::tempdir().unwrap();
    half_tissue_image(2000, 10)
        .save(dir.path().join("strip.png"))
        .unwrap();
    let app = TestApp::with_dir(dir);

    let json = app
        .get_json("/api/slide/strip.png/metadata", StatusCode::OK)
        .await;
    // 256, 512, 1024 < 2000 <= 2048
    assert_eq!(json["pyramid_level_count"], 4);
    assert_eq!(json["pyramid_tile_grids"][3], serde_json::json!([8, 1]));

    // Level 0 of a very flat slide is still at least one pixel tall
    let tile = app.get_image("/api/slide/strip.png/tile/0/0/0.jpg").await;
    assert_eq!(tile.dimensions(), (250, 2));
}

fn source_opens(service: &TileService<CountingSource>) -> usize {
    service.registry().source().open_count()
}

fn mean_brightness(image: &RgbImage) -> f64 {
    let total: f64 = image
        .pixels()
        .map(|p| (p[0] as f64 + p[1] as f64 + p[2] as f64) / 3.0)
        .sum();
    total / (image.width() * image.height()) as f64
}
