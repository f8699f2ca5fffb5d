//! # WSI Viewer
//!
//! Deep-zoom tiles and tissue heatmaps for Whole Slide Images (WSI).
//!
//! This library serves every slide in a directory as a deep-zoom image
//! pyramid: fixed-size overlapping JPEG tiles addressed by `(level, col, row)`,
//! whole-slide thumbnails, raw regions of native levels, and a coarse
//! tissue-content heatmap computed once per slide.
//!
//! ## Features
//!
//! - **Deep-zoom pyramid**: Power-of-two levels with configurable tile size and overlap
//! - **Slide caching**: Each slide is opened once and shared by concurrent requests
//! - **Tissue heatmap**: Color classification of a thumbnail into a smoothed score grid
//! - **Pluggable decoding**: Slides are read through the [`SlideReader`] trait
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`slide`] - Slide reader abstraction, local source and registry
//! - [`tile`] - Pyramid geometry, tile rendering and encoding
//! - [`heatmap`] - Tissue analysis and heatmap cache
//! - [`cache`] - Single-flight keyed cache shared by the registry and heatmaps
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wsi_viewer::{
//!     create_router, HeatmapService, LocalSlideSource, RouterConfig, SlideRegistry, TileService,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = Arc::new(SlideRegistry::new(LocalSlideSource::new("uploads")));
//!     let tile_service = TileService::new(Arc::clone(&registry));
//!     let heatmap_service = HeatmapService::new(registry);
//!
//!     let router = create_router(tile_service, heatmap_service, RouterConfig::new());
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:5050").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod heatmap;
pub mod server;
pub mod slide;
pub mod tile;

// Re-export commonly used types
pub use cache::{CachePolicy, SingleFlightCache};
pub use config::Config;
pub use error::{ErrorKind, HeatmapError, SlideError, TileError};
pub use heatmap::{HeatmapGrid, HeatmapParams, HeatmapService};
pub use server::{create_router, AppState, ErrorResponse, RouterConfig};
pub use slide::{
    CachedSlide, LocalSlideSource, RasterSlide, SlideEntry, SlideProperties, SlideReader,
    SlideRegistry, SlideSource,
};
pub use tile::{
    JpegTileEncoder, PyramidConfig, PyramidDescriptor, PyramidLevel, RegionRequest,
    SlideMetadata, TileAddress, TileRegion, TileRequest, TileResponse, TileService,
};
