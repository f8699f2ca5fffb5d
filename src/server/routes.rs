//! Router configuration for the WSI viewer.
//!
//! This module defines the HTTP routes and applies middleware for CORS and
//! request tracing.
//!
//! # Route Structure
//!
//! ```text
//! /health                                             - Health check
//! /api/slides                                         - List slides
//! /api/slide/{slide_id}/metadata                      - Slide metadata
//! /api/slide/{slide_id}/thumbnail?width=&height=      - Thumbnail JPEG
//! /api/slide/{slide_id}/tile/{level}/{col}/{row}.jpg  - Deep-zoom tile
//! /api/slide/{slide_id}/region?x=&y=&level=&w=&h=     - Region JPEG
//! /api/slide/{slide_id}/heatmap                       - Tissue heatmap
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use wsi_viewer::server::{create_router, RouterConfig};
//! use wsi_viewer::heatmap::HeatmapService;
//! use wsi_viewer::slide::{LocalSlideSource, SlideRegistry};
//! use wsi_viewer::tile::TileService;
//!
//! let registry = Arc::new(SlideRegistry::new(LocalSlideSource::new("uploads")));
//! let tile_service = TileService::new(Arc::clone(&registry));
//! let heatmap_service = HeatmapService::new(registry);
//!
//! let config = RouterConfig::new()
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(tile_service, heatmap_service, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:5050").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use http::header::CONTENT_TYPE;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    health_handler, heatmap_handler, region_handler, slide_metadata_handler, slides_handler,
    thumbnail_handler, tile_handler, AppState,
};
use crate::heatmap::HeatmapService;
use crate::slide::SlideSource;
use crate::tile::TileService;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Cache-Control max-age in seconds
    pub cache_max_age: u32,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a new router configuration.
    ///
    /// By default:
    /// - CORS allows any origin
    /// - Cache max-age is 1 hour (3600 seconds)
    /// - Tracing is enabled
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            cache_max_age: 3600,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    /// Pass None (or don't call this method) to allow any origin.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Set the Cache-Control max-age in seconds.
    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// Both services should share one [`SlideRegistry`](crate::slide::SlideRegistry)
/// so a slide opened for tiles is reused by the heatmap.
///
/// # Arguments
///
/// * `tile_service` - Tiles, thumbnails, regions and metadata
/// * `heatmap_service` - Heatmap computation and cache
/// * `config` - Router configuration
///
/// # Returns
///
/// A configured Axum router ready to be served.
pub fn create_router<S>(
    tile_service: TileService<S>,
    heatmap_service: HeatmapService<S>,
    config: RouterConfig,
) -> Router
where
    S: SlideSource + 'static,
{
    let app_state = AppState::with_cache_max_age(
        Arc::new(tile_service),
        Arc::new(heatmap_service),
        config.cache_max_age,
    );

    let cors = build_cors_layer(&config);

    // Uses {filename} to capture both "{row}" and "{row}.jpg" formats
    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/api/slides", get(slides_handler::<S>))
        .route(
            "/api/slide/{slide_id}/metadata",
            get(slide_metadata_handler::<S>),
        )
        .route(
            "/api/slide/{slide_id}/thumbnail",
            get(thumbnail_handler::<S>),
        )
        .route(
            "/api/slide/{slide_id}/tile/{level}/{col}/{filename}",
            get(tile_handler::<S>),
        )
        .route("/api/slide/{slide_id}/region", get(region_handler::<S>))
        .route("/api/slide/{slide_id}/heatmap", get(heatmap_handler::<S>))
        .with_state(app_state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(86400)); // 24 hours

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => {
            // No origins allowed - this effectively disables CORS
            cors
        }
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
