//! Deep-zoom pyramid geometry.
//!
//! A slide's synthetic pyramid is a pure function of its base dimensions, the
//! tile edge length and the tile overlap. Levels are numbered from the
//! coarsest (a single tile) to the finest (full resolution), and every level
//! is exactly half the resolution of the next one.
//!
//! ```text
//! level 0          level 1             level N-1 (base)
//! ┌─────┐          ┌─────┬─────┐       ┌──┬──┬──┬──┬ ...
//! │     │   x2     │     │     │  ...  ├──┼──┼──┼──┼
//! └─────┘          ├─────┼─────┤       ├──┼──┼──┼──┼
//!                  └─────┴─────┘       ...
//! ```
//!
//! Nothing here touches pixels; [`super::generator`] turns a [`TileRegion`]
//! into an image.

use serde::Serialize;

use crate::error::TileError;

/// Default tile edge length in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Default overlap in pixels added on interior tile edges.
pub const DEFAULT_OVERLAP: u32 = 1;

// =============================================================================
// Configuration
// =============================================================================

/// Tile geometry shared by every slide served by one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PyramidConfig {
    /// Tile edge length in pixels (excluding overlap)
    pub tile_size: u32,

    /// Extra pixels on each interior tile edge
    pub overlap: u32,
}

impl Default for PyramidConfig {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

// =============================================================================
// Addresses and Regions
// =============================================================================

/// A tile position in the pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileAddress {
    /// Pyramid level (0 = single-tile, coarsest)
    pub level: usize,

    /// Tile column (0-indexed from left)
    pub col: u32,

    /// Tile row (0-indexed from top)
    pub row: u32,
}

impl TileAddress {
    pub fn new(level: usize, col: u32, row: u32) -> Self {
        Self { level, col, row }
    }
}

/// Pixel rectangle covered by one tile, in both level and base coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRegion {
    /// Left edge in level pixels
    pub x: u32,

    /// Top edge in level pixels
    pub y: u32,

    /// Output tile width
    pub width: u32,

    /// Output tile height
    pub height: u32,

    /// Level downsample relative to base (a power of two)
    pub scale: u64,

    /// Left edge in base pixels
    pub base_x: u64,

    /// Top edge in base pixels
    pub base_y: u64,

    /// Width in base pixels, clipped to the image
    pub base_width: u64,

    /// Height in base pixels, clipped to the image
    pub base_height: u64,
}

// =============================================================================
// Pyramid Descriptor
// =============================================================================

/// Geometry of a single pyramid level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PyramidLevel {
    /// Width of this level in pixels
    pub width: u32,

    /// Height of this level in pixels
    pub height: u32,

    /// Number of tile columns
    pub cols: u32,

    /// Number of tile rows
    pub rows: u32,

    /// Downsample relative to the base image
    pub scale: u64,
}

/// The full synthetic pyramid of one slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PyramidDescriptor {
    base_width: u32,
    base_height: u32,
    config: PyramidConfig,

    /// Coarsest level first
    levels: Vec<PyramidLevel>,
}

impl PyramidDescriptor {
    /// Compute the pyramid for an image of `base_width` x `base_height`.
    ///
    /// The level count is `ceil(log2(max(w, h) / tile_size)) + 1`, at least 1,
    /// so the coarsest level always fits in a single tile.
    pub fn describe(base_width: u32, base_height: u32, config: PyramidConfig) -> Self {
        let tile_size = config.tile_size.max(1) as u64;
        let longest = base_width.max(base_height) as u64;

        let mut level_count = 1usize;
        while tile_size << (level_count - 1) < longest {
            level_count += 1;
        }

        let levels = (0..level_count)
            .map(|level| {
                let scale = 1u64 << (level_count - 1 - level);
                let width = (base_width as u64).div_ceil(scale) as u32;
                let height = (base_height as u64).div_ceil(scale) as u32;
                PyramidLevel {
                    width,
                    height,
                    cols: (width as u64).div_ceil(tile_size) as u32,
                    rows: (height as u64).div_ceil(tile_size) as u32,
                    scale,
                }
            })
            .collect();

        Self {
            base_width,
            base_height,
            config,
            levels,
        }
    }

    pub fn base_dimensions(&self) -> (u32, u32) {
        (self.base_width, self.base_height)
    }

    pub fn tile_size(&self) -> u32 {
        self.config.tile_size
    }

    pub fn overlap(&self) -> u32 {
        self.config.overlap
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, level: usize) -> Option<&PyramidLevel> {
        self.levels.get(level)
    }

    pub fn levels(&self) -> &[PyramidLevel] {
        &self.levels
    }

    /// `(width, height)` of every level, coarsest first.
    pub fn level_dimensions(&self) -> Vec<(u32, u32)> {
        self.levels.iter().map(|l| (l.width, l.height)).collect()
    }

    /// `(cols, rows)` of every level, coarsest first.
    pub fn tile_grids(&self) -> Vec<(u32, u32)> {
        self.levels.iter().map(|l| (l.cols, l.rows)).collect()
    }

    /// Resolve a tile address to the pixels it covers.
    ///
    /// Overlap is added on interior edges only: the first column/row has no
    /// leading overlap and nothing extends past the level boundary, so the
    /// last column/row may be narrower than a full tile.
    pub fn tile_region(&self, address: TileAddress) -> Result<TileRegion, TileError> {
        let level = self
            .levels
            .get(address.level)
            .ok_or(TileError::InvalidLevel {
                level: address.level,
                level_count: self.levels.len(),
            })?;

        if address.col >= level.cols || address.row >= level.rows {
            return Err(TileError::TileOutOfBounds {
                level: address.level,
                col: address.col,
                row: address.row,
                cols: level.cols,
                rows: level.rows,
            });
        }

        let (x, width) = self.tile_span(address.col, level.cols, level.width);
        let (y, height) = self.tile_span(address.row, level.rows, level.height);

        let scale = level.scale;
        let base_x = x as u64 * scale;
        let base_y = y as u64 * scale;
        let base_width = (width as u64 * scale).min(self.base_width as u64 - base_x);
        let base_height = (height as u64 * scale).min(self.base_height as u64 - base_y);

        Ok(TileRegion {
            x,
            y,
            width,
            height,
            scale,
            base_x,
            base_y,
            base_width,
            base_height,
        })
    }

    /// Start and length of tile `index` along one axis of `extent` pixels.
    fn tile_span(&self, index: u32, count: u32, extent: u32) -> (u32, u32) {
        let tile_size = self.config.tile_size as u64;
        let overlap = self.config.overlap as u64;

        let leading = if index > 0 { overlap } else { 0 };
        let trailing = if index + 1 < count { overlap } else { 0 };

        let start = (index as u64 * tile_size).saturating_sub(leading);
        let end = ((index as u64 + 1) * tile_size + trailing).min(extent as u64);
        (start as u32, (end - start) as u32)
    }
}

// =============================================================================
// Tests
// =============================================================================
