//! Tile service layer.
//!
//! This module turns slides into deep-zoom tiles, thumbnails and regions for
//! serving over HTTP.
//!
//! # Architecture
//!
//! The tile service sits between the HTTP layer and the slide abstraction:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              Tile Service               │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │  pyramid +   │  │  JPEG Encoder   │  │
//! │  │  generator   │  │                 │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            SlideRegistry                │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`TileService`]: Main entry point for image requests
//! - [`PyramidDescriptor`]: Deep-zoom geometry of one slide
//! - [`generator`]: Pixel extraction for tiles, thumbnails and regions
//! - [`JpegTileEncoder`]: Encodes rendered images as JPEG
//!
//! # Example
//!
//! ```
//! use wsi_viewer::tile::{PyramidConfig, PyramidDescriptor, TileAddress};
//!
//! let pyramid = PyramidDescriptor::describe(512, 512, PyramidConfig::default());
//! assert_eq!(pyramid.level_count(), 2);
//! assert_eq!(pyramid.tile_grids(), vec![(1, 1), (2, 2)]);
//!
//! let region = pyramid.tile_region(TileAddress::new(1, 1, 0)).unwrap();
//! assert_eq!((region.width, region.height), (257, 257));
//! ```

mod encoder;
pub mod generator;
pub mod pyramid;
mod service;

pub use encoder::{
    is_valid_quality, JpegTileEncoder, DEFAULT_JPEG_QUALITY, MAX_JPEG_QUALITY, MIN_JPEG_QUALITY,
};
pub use generator::{RegionBounds, DEFAULT_REGION_MAX_EDGE};
pub use pyramid::{
    PyramidConfig, PyramidDescriptor, PyramidLevel, TileAddress, TileRegion, DEFAULT_OVERLAP,
    DEFAULT_TILE_SIZE,
};
pub use service::{RegionRequest, SlideMetadata, TileRequest, TileResponse, TileService};
