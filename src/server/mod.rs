//! HTTP server layer for the WSI viewer.
//!
//! This module exposes slides, deep-zoom tiles and heatmaps over a JSON and
//! JPEG API.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │      GET /api/slide/{slide_id}/tile/{level}/{col}/{row}.jpg     │
//! │                                                                 │
//! │  ┌──────────────────────────┐  ┌─────────────────────────────┐  │
//! │  │        handlers          │  │          routes             │  │
//! │  │ (requests, error codes)  │  │  (router, CORS, tracing)    │  │
//! │  └──────────────────────────┘  └─────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    health_handler, heatmap_handler, region_handler, slide_metadata_handler, slides_handler,
    status_for, thumbnail_handler, tile_handler, AppState, ErrorResponse, HealthResponse,
    RegionQueryParams, SlidesResponse, ThumbnailQueryParams, TilePathParams, TileQueryParams,
};
pub use routes::{create_router, RouterConfig};
