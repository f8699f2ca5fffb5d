//! Tile Service for orchestrating tile generation.
//!
//! The TileService is the caller-facing entry point for image requests. It
//! orchestrates:
//! - Request validation
//! - Slide access via the registry
//! - Pixel extraction and JPEG encoding on blocking workers
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         TileService                             │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │        get_tile() / get_thumbnail() / get_region()      │    │
//! │  │  1. Validate params   3. Render pixels (blocking)       │    │
//! │  │  2. Acquire slide     4. Encode JPEG & return           │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │           │                    │                    │           │
//! │           ▼                    ▼                    ▼           │
//! │    ┌──────────────┐    ┌──────────────┐   ┌──────────────────┐  │
//! │    │ SlideRegistry│    │  generator   │   │ JpegTileEncoder  │  │
//! │    └──────────────┘    └──────────────┘   └──────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use bytes::Bytes;
use image::RgbImage;
use serde::Serialize;
use tracing::debug;

use crate::error::{SlideError, TileError};
use crate::slide::{CachedSlide, SlideEntry, SlideReader, SlideRegistry, SlideSource};

use super::encoder::{is_valid_quality, JpegTileEncoder};
use super::generator::{
    render_region, render_thumbnail, render_tile, RegionBounds, DEFAULT_REGION_MAX_EDGE,
};
use super::pyramid::TileAddress;

// =============================================================================
// Requests
// =============================================================================

/// A request for a deep-zoom tile.
#[derive(Debug, Clone)]
pub struct TileRequest {
    /// Slide identifier
    pub slide_id: String,

    /// Pyramid level (0 = single tile, coarsest)
    pub level: usize,

    /// Tile column (0-indexed from left)
    pub col: u32,

    /// Tile row (0-indexed from top)
    pub row: u32,

    /// JPEG quality override (1-100)
    pub quality: Option<u8>,
}

impl TileRequest {
    /// Create a new tile request with the service's default quality.
    pub fn new(slide_id: impl Into<String>, level: usize, col: u32, row: u32) -> Self {
        Self {
            slide_id: slide_id.into(),
            level,
            col,
            row,
            quality: None,
        }
    }

    /// Create a new tile request with specified quality.
    pub fn with_quality(
        slide_id: impl Into<String>,
        level: usize,
        col: u32,
        row: u32,
        quality: u8,
    ) -> Self {
        Self {
            quality: Some(quality),
            ..Self::new(slide_id, level, col, row)
        }
    }

    pub fn address(&self) -> TileAddress {
        TileAddress::new(self.level, self.col, self.row)
    }
}

/// A request for a raw region of a native level.
#[derive(Debug, Clone)]
pub struct RegionRequest {
    /// Slide identifier
    pub slide_id: String,

    /// Left edge in level 0 pixels
    pub x: u64,

    /// Top edge in level 0 pixels
    pub y: u64,

    /// Native level to read from
    pub level: usize,

    /// Width in level pixels
    pub width: u32,

    /// Height in level pixels
    pub height: u32,
}

impl RegionRequest {
    fn bounds(&self) -> RegionBounds {
        RegionBounds {
            x: self.x,
            y: self.y,
            level: self.level,
            width: self.width,
            height: self.height,
        }
    }
}

// =============================================================================
// Responses
// =============================================================================

/// An encoded image produced by the tile service.
#[derive(Debug, Clone)]
pub struct TileResponse {
    /// The encoded JPEG data
    pub data: Bytes,

    /// Width of the encoded image
    pub width: u32,

    /// Height of the encoded image
    pub height: u32,

    /// The JPEG quality used for encoding
    pub quality: u8,
}

/// Everything a viewer needs to know about a slide.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlideMetadata {
    pub slide_id: String,

    /// Full-resolution width
    pub width: u32,

    /// Full-resolution height
    pub height: u32,

    /// Native level count
    pub level_count: usize,

    /// Native level dimensions, widest first
    pub level_dimensions: Vec<(u32, u32)>,

    /// Native level downsample factors
    pub level_downsamples: Vec<f64>,

    pub vendor: String,
    pub mpp_x: Option<f64>,
    pub mpp_y: Option<f64>,
    pub objective_power: Option<f64>,

    /// Deep-zoom level count
    pub pyramid_level_count: usize,

    /// Deep-zoom `(cols, rows)` per level, coarsest first
    pub pyramid_tile_grids: Vec<(u32, u32)>,

    pub tile_size: u32,
    pub overlap: u32,
}

impl SlideMetadata {
    pub fn from_slide<R: SlideReader>(slide: &CachedSlide<R>) -> Self {
        let reader = slide.reader();
        let (width, height) = reader.dimensions();
        let level_count = reader.level_count();
        let level_dimensions = (0..level_count)
            .filter_map(|level| reader.level_dimensions(level))
            .collect();
        let level_downsamples = (0..level_count)
            .filter_map(|level| reader.level_downsample(level))
            .collect();

        let properties = slide.properties();
        let pyramid = slide.pyramid();

        Self {
            slide_id: slide.slide_id().to_string(),
            width,
            height,
            level_count,
            level_dimensions,
            level_downsamples,
            vendor: properties.vendor.clone(),
            mpp_x: properties.mpp_x,
            mpp_y: properties.mpp_y,
            objective_power: properties.objective_power,
            pyramid_level_count: pyramid.level_count(),
            pyramid_tile_grids: pyramid.tile_grids(),
            tile_size: pyramid.tile_size(),
            overlap: pyramid.overlap(),
        }
    }
}

// =============================================================================
// Tile Service
// =============================================================================

/// Service for generating tiles, thumbnails and regions.
///
/// # Type Parameters
///
/// * `S` - The slide source type
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use wsi_viewer::slide::{LocalSlideSource, SlideRegistry};
/// use wsi_viewer::tile::{TileRequest, TileService};
///
/// # async fn run() -> Result<(), wsi_viewer::TileError> {
/// let registry = Arc::new(SlideRegistry::new(LocalSlideSource::new("uploads")));
/// let service = TileService::new(registry);
///
/// let response = service.get_tile(TileRequest::new("sample.tiff", 0, 0, 0)).await?;
/// println!("Tile is {}x{}, {} bytes", response.width, response.height, response.data.len());
/// # Ok(())
/// # }
/// ```
pub struct TileService<S: SlideSource> {
    /// The slide registry for accessing slides
    registry: Arc<SlideRegistry<S>>,

    /// Encoder carrying the default quality
    encoder: JpegTileEncoder,

    /// Largest accepted region edge
    region_max_edge: u32,
}

impl<S: SlideSource> TileService<S> {
    /// Create a tile service with default quality and region limit.
    pub fn new(registry: Arc<SlideRegistry<S>>) -> Self {
        Self::with_options(registry, JpegTileEncoder::default(), DEFAULT_REGION_MAX_EDGE)
    }

    pub fn with_options(
        registry: Arc<SlideRegistry<S>>,
        encoder: JpegTileEncoder,
        region_max_edge: u32,
    ) -> Self {
        Self {
            registry,
            encoder,
            region_max_edge,
        }
    }

    /// Get a reference to the underlying registry.
    pub fn registry(&self) -> &Arc<SlideRegistry<S>> {
        &self.registry
    }

    /// List every slide the source can open.
    pub async fn list_slides(&self) -> Result<Vec<SlideEntry>, TileError> {
        let source = self.registry.shared_source();
        let slides = tokio::task::spawn_blocking(move || source.list())
            .await
            .map_err(worker_error)??;
        Ok(slides)
    }

    /// Describe a slide and its deep-zoom pyramid.
    pub async fn slide_metadata(&self, slide_id: &str) -> Result<SlideMetadata, SlideError> {
        let slide = self.registry.acquire(slide_id).await?;
        Ok(SlideMetadata::from_slide(&slide))
    }

    /// Get a deep-zoom tile.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The quality is out of range
    /// - The slide cannot be found or opened
    /// - The level or tile coordinates are outside the pyramid
    /// - The pixels cannot be decoded or encoded
    pub async fn get_tile(&self, request: TileRequest) -> Result<TileResponse, TileError> {
        let encoder = self.encoder_for(request.quality)?;
        let slide = self.registry.acquire(&request.slide_id).await?;

        // Reject bad addresses before spawning any work
        let address = request.address();
        slide.pyramid().tile_region(address)?;

        debug!(
            slide_id = %request.slide_id,
            level = request.level,
            col = request.col,
            row = request.row,
            "Rendering tile"
        );

        let pyramid = slide.pyramid().clone();
        run_blocking(slide.reader(), encoder, move |reader| {
            render_tile(reader, &pyramid, address)
        })
        .await
    }

    /// Get a whole-slide thumbnail bounded by `max_width` x `max_height`.
    pub async fn get_thumbnail(
        &self,
        slide_id: &str,
        max_width: u32,
        max_height: u32,
    ) -> Result<TileResponse, TileError> {
        if max_width == 0 || max_height == 0 {
            return Err(TileError::invalid_region(format!(
                "thumbnail box must be non-empty, got {max_width}x{max_height}"
            )));
        }
        let slide = self.registry.acquire(slide_id).await?;

        debug!(
            slide_id = slide_id,
            max_width = max_width,
            max_height = max_height,
            "Rendering thumbnail"
        );

        run_blocking(slide.reader(), self.encoder, move |reader| {
            render_thumbnail(reader, max_width, max_height)
        })
        .await
    }

    /// Get a raw region of a native level.
    pub async fn get_region(&self, request: RegionRequest) -> Result<TileResponse, TileError> {
        let slide = self.registry.acquire(&request.slide_id).await?;
        let bounds = request.bounds();
        let max_edge = self.region_max_edge;

        debug!(
            slide_id = %request.slide_id,
            x = request.x,
            y = request.y,
            level = request.level,
            width = request.width,
            height = request.height,
            "Rendering region"
        );

        run_blocking(slide.reader(), self.encoder, move |reader| {
            render_region(reader, bounds, max_edge)
        })
        .await
    }

    fn encoder_for(&self, quality: Option<u8>) -> Result<JpegTileEncoder, TileError> {
        match quality {
            None => Ok(self.encoder),
            Some(quality) if is_valid_quality(quality) => JpegTileEncoder::new(quality),
            Some(quality) => Err(TileError::InvalidQuality { quality }),
        }
    }
}

/// Render and encode on a blocking worker thread.
async fn run_blocking<R, F>(
    reader: Arc<R>,
    encoder: JpegTileEncoder,
    render: F,
) -> Result<TileResponse, TileError>
where
    R: SlideReader + 'static,
    F: FnOnce(&R) -> Result<RgbImage, TileError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let image = render(&reader)?;
        let data = encoder.encode(&image)?;
        Ok::<_, TileError>(TileResponse {
            data,
            width: image.width(),
            height: image.height(),
            quality: encoder.quality(),
        })
    })
    .await
    .map_err(worker_error)?
}

fn worker_error(err: tokio::task::JoinError) -> TileError {
    TileError::Worker {
        message: err.to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
