//! API integration tests for listing, metadata, images and error handling.
//!
//! Tests verify:
//! - Slide listing and metadata JSON
//! - Tile, thumbnail and region responses and headers
//! - Error cases and their HTTP status codes

use axum::http::StatusCode;

use super::test_utils::{body_bytes, TestApp};

// =============================================================================
// Health and Listing
// =============================================================================

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let json = app.get_json("/health", StatusCode::OK).await;
    assert_eq!(json["status"], "healthy");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_list_slides_filters_and_sorts() {
    let app = TestApp::new();
    let json = app.get_json("/api/slides", StatusCode::OK).await;

    let ids: Vec<&str> = json["slides"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["slide_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["broken.png", "small.png", "square.png"]);
    assert!(json["slides"][1]["size"].as_u64().unwrap() > 0);

    // Listing never opens a slide
    assert_eq!(app.open_count(), 0);
}

#[tokio::test]
async fn test_list_slides_empty_directory() {
    let app = TestApp::with_dir(tempfile::tempdir().unwrap());
    let json = app.get_json("/api/slides", StatusCode::OK).await;
    assert_eq!(json["slides"].as_array().unwrap().len(), 0);
}

// =============================================================================
// Metadata
// =============================================================================

#[tokio::test]
async fn test_slide_metadata() {
    let app = TestApp::new();
    let json = app
        .get_json("/api/slide/small.png/metadata", StatusCode::OK)
        .await;

    assert_eq!(json["slide_id"], "small.png");
    assert_eq!(json["width"], 600);
    assert_eq!(json["height"], 400);
    assert_eq!(json["level_count"], 1);
    assert_eq!(json["level_downsamples"][0], 1.0);
    assert_eq!(json["vendor"], "generic-png");
    assert!(json["mpp_x"].is_null());
    assert_eq!(json["tile_size"], 256);
    assert_eq!(json["overlap"], 1);

    // Levels of 150x100, 300x200 and 600x400
    assert_eq!(json["pyramid_level_count"], 3);
    assert_eq!(
        json["pyramid_tile_grids"],
        serde_json::json!([[1, 1], [2, 1], [3, 2]])
    );
}

#[tokio::test]
async fn test_metadata_unknown_slide_is_404() {
    let app = TestApp::new();
    let json = app
        .get_json("/api/slide/nothing.png/metadata", StatusCode::NOT_FOUND)
        .await;
    assert_eq!(json["error"], "not_found");
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn test_metadata_unsupported_extension_is_404() {
    let app = TestApp::new();
    app.get_json("/api/slide/notes.txt/metadata", StatusCode::NOT_FOUND)
        .await;
}

#[tokio::test]
async fn test_undecodable_slide_is_500() {
    let app = TestApp::new();
    let json = app
        .get_json(
            "/api/slide/broken.png/metadata",
            StatusCode::INTERNAL_SERVER_ERROR,
        )
        .await;
    assert_eq!(json["error"], "decode_error");
}

// =============================================================================
// Tiles
// =============================================================================

#[tokio::test]
async fn test_tile_headers() {
    let app = TestApp::new();
    let response = app.get("/api/slide/square.png/tile/0/0/0.jpg").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "image/jpeg"
    );
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "public, max-age=3600"
    );
    assert_eq!(response.headers().get("x-tile-quality").unwrap(), "85");
    assert!(!body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn test_tile_extension_is_optional() {
    let app = TestApp::new();
    let with_ext = app.get_image("/api/slide/square.png/tile/1/0/0.jpg").await;
    let without_ext = app.get_image("/api/slide/square.png/tile/1/0/0").await;
    assert_eq!(with_ext.dimensions(), without_ext.dimensions());
}

#[tokio::test]
async fn test_tile_quality_override() {
    let app = TestApp::new();
    let response = app
        .get("/api/slide/square.png/tile/0/0/0.jpg?quality=40")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-tile-quality").unwrap(), "40");
}

#[tokio::test]
async fn test_tile_invalid_quality_is_400() {
    let app = TestApp::new();
    let json = app
        .get_json(
            "/api/slide/square.png/tile/0/0/0.jpg?quality=0",
            StatusCode::BAD_REQUEST,
        )
        .await;
    assert_eq!(json["error"], "invalid_argument");
}

#[tokio::test]
async fn test_tile_out_of_range_is_404() {
    let app = TestApp::new();

    // Level beyond the pyramid
    let json = app
        .get_json("/api/slide/square.png/tile/9/0/0.jpg", StatusCode::NOT_FOUND)
        .await;
    assert_eq!(json["error"], "out_of_range");

    // Column beyond the level's grid
    app.get_json("/api/slide/square.png/tile/1/2/0.jpg", StatusCode::NOT_FOUND)
        .await;

    // Row beyond the level's grid
    app.get_json("/api/slide/square.png/tile/0/0/1.jpg", StatusCode::NOT_FOUND)
        .await;
}

#[tokio::test]
async fn test_tile_malformed_row_is_400() {
    let app = TestApp::new();
    app.get_json(
        "/api/slide/square.png/tile/0/0/abc.jpg",
        StatusCode::BAD_REQUEST,
    )
    .await;
}

#[tokio::test]
async fn test_tile_unknown_slide_is_404() {
    let app = TestApp::new();
    let json = app
        .get_json("/api/slide/ghost.png/tile/0/0/0.jpg", StatusCode::NOT_FOUND)
        .await;
    assert_eq!(json["error"], "not_found");
}

// =============================================================================
// Thumbnails
// =============================================================================

#[tokio::test]
async fn test_thumbnail_default_box() {
    let app = TestApp::new();
    let image = app.get_image("/api/slide/small.png/thumbnail").await;
    // Width is the binding edge
    assert_eq!(image.dimensions(), (512, 341));
}

#[tokio::test]
async fn test_thumbnail_custom_box_keeps_aspect() {
    let app = TestApp::new();
    let image = app
        .get_image("/api/slide/small.png/thumbnail?width=150&height=150")
        .await;
    assert_eq!(image.dimensions(), (150, 100));
}

#[tokio::test]
async fn test_thumbnail_zero_box_is_400() {
    let app = TestApp::new();
    app.get_json(
        "/api/slide/small.png/thumbnail?width=0&height=100",
        StatusCode::BAD_REQUEST,
    )
    .await;
}

// =============================================================================
// Regions
// =============================================================================

#[tokio::test]
async fn test_region_default_parameters() {
    let app = TestApp::new();
    // Default 512x512 at the origin is clipped to the 600x400 image
    let image = app.get_image("/api/slide/small.png/region").await;
    assert_eq!(image.dimensions(), (512, 400));
}

#[tokio::test]
async fn test_region_clipped_at_edge() {
    let app = TestApp::new();
    let image = app
        .get_image("/api/slide/small.png/region?x=500&y=300&w=256&h=256")
        .await;
    assert_eq!(image.dimensions(), (100, 100));

    // Right half of the slide is tissue
    let pixel = image.get_pixel(50, 50);
    assert!(pixel[0] < 150 && pixel[2] > pixel[1]);
}

#[tokio::test]
async fn test_region_errors_are_400() {
    let app = TestApp::new();

    for uri in [
        "/api/slide/small.png/region?w=0",
        "/api/slide/small.png/region?h=0",
        "/api/slide/small.png/region?w=9000",
        "/api/slide/small.png/region?level=3",
        "/api/slide/small.png/region?x=600",
        "/api/slide/small.png/region?y=5000",
    ] {
        let json = app.get_json(uri, StatusCode::BAD_REQUEST).await;
        assert_eq!(json["error"], "invalid_argument", "for {uri}");
    }
}

#[tokio::test]
async fn test_region_unknown_slide_is_404() {
    let app = TestApp::new();
    app.get_json("/api/slide/ghost.png/region", StatusCode::NOT_FOUND)
        .await;
}

// =============================================================================
// CORS
// =============================================================================

#[tokio::test]
async fn test_cors_allows_any_origin_by_default() {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    let app = TestApp::new();
    let request = Request::builder()
        .uri("/health")
        .header("origin", "https://viewer.example")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_cors_preflight_allows_only_content_type() {
    use axum::body::Body;
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/slides")
        .header("origin", "https://viewer.example")
        .header("access-control-request-method", "GET")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let allowed = response
        .headers()
        .get("access-control-allow-headers")
        .unwrap()
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert_eq!(allowed, "content-type");
    assert!(!allowed.contains("authorization"));
}
