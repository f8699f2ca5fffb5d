//! Test utilities for integration tests.
//!
//! Slides are real PNG files written into a temporary directory, served
//! through [`LocalSlideSource`] wrapped in a counting source.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use image::{Rgb, RgbImage};
use tempfile::TempDir;
use tower::ServiceExt;

use wsi_viewer::error::SlideError;
use wsi_viewer::heatmap::HeatmapService;
use wsi_viewer::slide::{LocalSlideSource, RasterSlide, SlideEntry, SlideRegistry, SlideSource};
use wsi_viewer::tile::TileService;
use wsi_viewer::{create_router, RouterConfig};

/// Glass background color.
pub const GLASS: Rgb<u8> = Rgb([245, 245, 245]);

/// Stained tissue color (purple, hematoxylin-like).
pub const TISSUE: Rgb<u8> = Rgb([90, 50, 130]);

// =============================================================================
// Counting Source
// =============================================================================

/// A local source that counts how many times slides are opened.
pub struct CountingSource {
    inner: LocalSlideSource,
    opens: Arc<AtomicUsize>,
}

impl CountingSource {
    pub fn new(root: &Path) -> Self {
        Self {
            inner: LocalSlideSource::new(root),
            opens: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl SlideSource for CountingSource {
    type Reader = RasterSlide;

    fn open(&self, slide_id: &str) -> Result<Self::Reader, SlideError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.inner.open(slide_id)
    }

    fn list(&self) -> Result<Vec<SlideEntry>, SlideError> {
        self.inner.list()
    }
}

// =============================================================================
// Slide Fixtures
// =============================================================================

/// Slide whose left half is glass and right half is stained tissue.
pub fn half_tissue_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            GLASS
        } else {
            TISSUE
        }
    })
}

/// Temporary slides directory with a few fixtures:
/// - `small.png` (600x400, half tissue)
/// - `square.png` (512x512, half tissue)
/// - `notes.txt` (not a slide)
/// - `broken.png` (not decodable)
pub fn slides_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    half_tissue_image(600, 400)
        .save(dir.path().join("small.png"))
        .unwrap();
    half_tissue_image(512, 512)
        .save(dir.path().join("square.png"))
        .unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"not a slide").unwrap();
    std::fs::write(dir.path().join("broken.png"), b"definitely not a png").unwrap();
    dir
}

// =============================================================================
// Test Application
// =============================================================================

/// A router plus handles on the pieces behind it.
pub struct TestApp {
    pub router: Router,
    pub registry: Arc<SlideRegistry<CountingSource>>,
    _dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_dir(slides_dir())
    }

    pub fn with_dir(dir: TempDir) -> Self {
        let registry = Arc::new(SlideRegistry::new(CountingSource::new(dir.path())));
        let tile_service = TileService::new(Arc::clone(&registry));
        let heatmap_service = HeatmapService::new(Arc::clone(&registry));
        let router = create_router(
            tile_service,
            heatmap_service,
            RouterConfig::new().with_tracing(false),
        );
        Self {
            router,
            registry,
            _dir: dir,
        }
    }

    pub fn open_count(&self) -> usize {
        self.registry.source().open_count()
    }

    /// Send a GET request and return the response.
    pub async fn get(&self, uri: &str) -> Response<Body> {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// GET expecting a JSON body with the given status.
    pub async fn get_json(&self, uri: &str, status: StatusCode) -> serde_json::Value {
        let response = self.get(uri).await;
        assert_eq!(response.status(), status, "unexpected status for {uri}");
        let body = body_bytes(response).await;
        serde_json::from_slice(&body).unwrap()
    }

    /// GET expecting a JPEG and decode it.
    pub async fn get_image(&self, uri: &str) -> RgbImage {
        let response = self.get(uri).await;
        assert_eq!(response.status(), StatusCode::OK, "unexpected status for {uri}");
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "image/jpeg"
        );
        let body = body_bytes(response).await;
        assert!(is_valid_jpeg(&body));
        image::load_from_memory(&body).unwrap().to_rgb8()
    }
}

pub async fn body_bytes(response: Response<Body>) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

/// Check SOI and EOI markers.
pub fn is_valid_jpeg(data: &[u8]) -> bool {
    data.len() >= 4 && data[0..2] == [0xFF, 0xD8] && data[data.len() - 2..] == [0xFF, 0xD9]
}
