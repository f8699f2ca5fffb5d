//! Heatmap integration tests.
//!
//! Tests verify:
//! - JSON shape of the heatmap response
//! - Scores follow where the tissue is
//! - Repeated requests are served from memory
//! - Error status codes

use axum::http::StatusCode;

use super::test_utils::TestApp;

#[tokio::test]
async fn test_heatmap_response_shape() {
    let app = TestApp::new();
    let json = app
        .get_json("/api/slide/small.png/heatmap", StatusCode::OK)
        .await;

    assert_eq!(json["grid_dims"], serde_json::json!([32, 32]));
    assert_eq!(json["base_dims"], serde_json::json!([600, 400]));

    let grid = json["grid"].as_array().unwrap();
    assert_eq!(grid.len(), 32);
    for row in grid {
        let row = row.as_array().unwrap();
        assert_eq!(row.len(), 32);
        for value in row {
            let value = value.as_f64().unwrap();
            assert!((0.0..=1.0).contains(&value));
        }
    }
}

#[tokio::test]
async fn test_heatmap_tracks_tissue() {
    let app = TestApp::new();
    let json = app
        .get_json("/api/slide/small.png/heatmap", StatusCode::OK)
        .await;

    // Left half of the slide is glass, right half stained tissue
    for row in json["grid"].as_array().unwrap() {
        let row: Vec<f64> = row
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_f64().unwrap())
            .collect();
        assert_eq!(row[0], 0.0);
        assert_eq!(row[31], 1.0);
        assert!(row[8] < row[24]);
    }
}

#[tokio::test]
async fn test_heatmap_repeat_is_identical_and_cached() {
    let app = TestApp::new();

    let first = app
        .get_json("/api/slide/square.png/heatmap", StatusCode::OK)
        .await;
    let second = app
        .get_json("/api/slide/square.png/heatmap", StatusCode::OK)
        .await;

    assert_eq!(first, second);
    assert_eq!(app.open_count(), 1);
}

#[tokio::test]
async fn test_heatmap_uniform_slide_is_all_zero() {
    let dir = tempfile::tempdir().unwrap();
    image::RgbImage::from_pixel(300, 300, image::Rgb([240, 240, 240]))
        .save(dir.path().join("blank.png"))
        .unwrap();
    let app = TestApp::with_dir(dir);

    let json = app
        .get_json("/api/slide/blank.png/heatmap", StatusCode::OK)
        .await;
    let all_zero = json["grid"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|row| row.as_array().unwrap())
        .all(|v| v.as_f64() == Some(0.0));
    assert!(all_zero);
}

#[tokio::test]
async fn test_heatmap_unknown_slide_is_404() {
    let app = TestApp::new();
    let json = app
        .get_json("/api/slide/ghost.png/heatmap", StatusCode::NOT_FOUND)
        .await;
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn test_heatmap_undecodable_slide_is_500() {
    let app = TestApp::new();
    let json = app
        .get_json(
            "/api/slide/broken.png/heatmap",
            StatusCode::INTERNAL_SERVER_ERROR,
        )
        .await;
    assert_eq!(json["error"], "analysis_error");
}
