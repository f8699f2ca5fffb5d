//! Pixel extraction for tiles, thumbnails and regions.
//!
//! Everything here is synchronous and CPU bound. [`super::TileService`] calls
//! these functions from blocking worker threads.
//!
//! A tile is produced by reading from the finest native level that is not
//! finer than the pyramid level, then resampling to the exact level-space
//! size:
//!
//! ```text
//!  pyramid level (scale 8)        native level (downsample 4)
//!  ┌───────────┐  <── Lanczos3 ── ┌───────────────────────┐
//!  │  w x h    │                  │   ~2w x ~2h           │
//!  └───────────┘                  └───────────────────────┘
//! ```

use image::imageops::FilterType;
use image::RgbImage;

use crate::error::TileError;
use crate::slide::{composite, SlideReader, BACKGROUND};

use super::pyramid::{PyramidDescriptor, TileAddress};

/// Default upper bound on either side of a requested region.
pub const DEFAULT_REGION_MAX_EDGE: u32 = 8192;

// =============================================================================
// Tiles
// =============================================================================

/// Render one deep-zoom tile as an opaque RGB image.
///
/// The output is exactly the size of the tile's level-space rectangle: at
/// most `tile_size + 2 * overlap` on each side, smaller at the right and
/// bottom edges.
pub fn render_tile<R>(
    reader: &R,
    pyramid: &PyramidDescriptor,
    address: TileAddress,
) -> Result<RgbImage, TileError>
where
    R: SlideReader + ?Sized,
{
    let region = pyramid.tile_region(address)?;

    let native = reader.best_level_for_downsample(region.scale as f64);
    let downsample = reader.level_downsample(native).unwrap_or(1.0).max(1.0);
    let (native_width, native_height) = reader
        .level_dimensions(native)
        .ok_or_else(|| TileError::invalid_region(format!("missing native level {native}")))?;

    // Native-level origin and extent of the base rectangle
    let origin_x = (region.base_x as f64 / downsample).floor() as u64;
    let origin_y = (region.base_y as f64 / downsample).floor() as u64;
    let read_width = native_extent(region.base_width, downsample, origin_x, native_width);
    let read_height = native_extent(region.base_height, downsample, origin_y, native_height);

    let raw = reader.read_region(region.base_x, region.base_y, native, read_width, read_height)?;
    let flat = composite(&raw, BACKGROUND);

    if flat.dimensions() == (region.width, region.height) {
        return Ok(flat);
    }
    Ok(image::imageops::resize(
        &flat,
        region.width,
        region.height,
        FilterType::Lanczos3,
    ))
}

/// Pixels to read along one native axis, clipped to the level and at least 1.
fn native_extent(base_extent: u64, downsample: f64, origin: u64, level_extent: u32) -> u32 {
    let wanted = (base_extent as f64 / downsample).ceil() as u64;
    let available = (level_extent as u64).saturating_sub(origin);
    wanted.min(available).max(1) as u32
}

// =============================================================================
// Thumbnails
// =============================================================================

/// Whole-slide thumbnail bounded by `max_width` x `max_height`.
pub fn render_thumbnail<R>(
    reader: &R,
    max_width: u32,
    max_height: u32,
) -> Result<RgbImage, TileError>
where
    R: SlideReader + ?Sized,
{
    if max_width == 0 || max_height == 0 {
        return Err(TileError::invalid_region(format!(
            "thumbnail box must be non-empty, got {max_width}x{max_height}"
        )));
    }
    Ok(reader.thumbnail(max_width, max_height)?)
}

// =============================================================================
// Regions
// =============================================================================

/// A raw region read request against a native level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionBounds {
    /// Left edge in level 0 pixels
    pub x: u64,

    /// Top edge in level 0 pixels
    pub y: u64,

    /// Native level to read from
    pub level: usize,

    /// Requested width in level pixels
    pub width: u32,

    /// Requested height in level pixels
    pub height: u32,
}

/// Read a region from a native level, clipped to the level bounds.
///
/// Rejects empty sizes, sizes above `max_edge`, unknown levels and regions
/// lying entirely outside the image.
pub fn render_region<R>(
    reader: &R,
    bounds: RegionBounds,
    max_edge: u32,
) -> Result<RgbImage, TileError>
where
    R: SlideReader + ?Sized,
{
    if bounds.width == 0 || bounds.height == 0 {
        return Err(TileError::invalid_region(format!(
            "region size must be non-zero, got {}x{}",
            bounds.width, bounds.height
        )));
    }
    if bounds.width > max_edge || bounds.height > max_edge {
        return Err(TileError::invalid_region(format!(
            "region {}x{} exceeds the {max_edge} pixel limit",
            bounds.width, bounds.height
        )));
    }

    let (level_width, level_height) =
        reader.level_dimensions(bounds.level).ok_or_else(|| {
            TileError::invalid_region(format!(
                "level {} does not exist (slide has {} levels)",
                bounds.level,
                reader.level_count()
            ))
        })?;
    let downsample = reader.level_downsample(bounds.level).unwrap_or(1.0).max(1.0);

    let origin_x = (bounds.x as f64 / downsample).floor() as u64;
    let origin_y = (bounds.y as f64 / downsample).floor() as u64;
    if origin_x >= level_width as u64 || origin_y >= level_height as u64 {
        return Err(TileError::invalid_region(format!(
            "origin ({}, {}) lies outside the image",
            bounds.x, bounds.y
        )));
    }

    let width = bounds.width.min((level_width as u64 - origin_x) as u32);
    let height = bounds.height.min((level_height as u64 - origin_y) as u32);

    let raw = reader.read_region(bounds.x, bounds.y, bounds.level, width, height)?;
    Ok(composite(&raw, BACKGROUND))
}

// =============================================================================
// Tests
// =============================================================================
