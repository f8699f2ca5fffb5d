//! Configuration management for the WSI viewer server.
//!
//! This module provides a flexible configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `WSI_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Environment Variables
//!
//! All configuration options can be set via environment variables with the `WSI_` prefix:
//!
//! - `WSI_HOST` - Server bind address (default: 0.0.0.0)
//! - `WSI_PORT` - Server port (default: 5050)
//! - `WSI_SLIDES_DIR` - Directory holding slide files (default: uploads)
//! - `WSI_TILE_SIZE` - Deep-zoom tile edge in pixels (default: 256)
//! - `WSI_OVERLAP` - Deep-zoom tile overlap in pixels (default: 1)
//! - `WSI_JPEG_QUALITY` - Default JPEG quality (default: 85)
//! - `WSI_REGION_MAX_EDGE` - Largest region edge in pixels (default: 8192)
//! - `WSI_HEATMAP_THUMBNAIL` - Heatmap thumbnail bound (default: 256)
//! - `WSI_HEATMAP_ROWS` / `WSI_HEATMAP_COLS` - Heatmap grid (default: 32x32)
//! - `WSI_CACHE_SLIDES` - Max slides to cache, 0 for unbounded (default: 0)
//! - `WSI_CACHE_MAX_AGE` - HTTP cache max-age seconds (default: 3600)
//! - `WSI_CORS_ORIGINS` - Allowed CORS origins, comma-separated

use std::path::PathBuf;

use clap::Parser;

use crate::cache::CachePolicy;
use crate::heatmap::{HeatmapParams, DEFAULT_GRID_COLS, DEFAULT_GRID_ROWS, DEFAULT_THUMBNAIL_SIZE};
use crate::tile::{
    is_valid_quality, PyramidConfig, DEFAULT_JPEG_QUALITY, DEFAULT_OVERLAP,
    DEFAULT_REGION_MAX_EDGE, DEFAULT_TILE_SIZE,
};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 5050;

/// Default slides directory.
pub const DEFAULT_SLIDES_DIR: &str = "uploads";

/// Default number of slides to cache (0 = unbounded).
pub const DEFAULT_SLIDE_CACHE_CAPACITY: usize = 0;

/// Default HTTP cache max-age in seconds (1 hour).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 3600;

// =============================================================================
// CLI Arguments
// =============================================================================

/// WSI Viewer - deep-zoom tiles and tissue heatmaps for Whole Slide Images.
///
/// Serves every slide in a local directory as a deep-zoom pyramid, together
/// with thumbnails, raw regions and a coarse tissue heatmap.
#[derive(Parser, Debug, Clone)]
#[command(name = "wsi-viewer")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "WSI_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "WSI_PORT")]
    pub port: u16,

    /// Directory containing the slide files.
    #[arg(long, default_value = DEFAULT_SLIDES_DIR, env = "WSI_SLIDES_DIR")]
    pub slides_dir: PathBuf,

    // =========================================================================
    // Tile Configuration
    // =========================================================================
    /// Deep-zoom tile edge length in pixels.
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE, env = "WSI_TILE_SIZE")]
    pub tile_size: u32,

    /// Pixels of overlap added on interior tile edges.
    #[arg(long, default_value_t = DEFAULT_OVERLAP, env = "WSI_OVERLAP")]
    pub overlap: u32,

    /// Default JPEG quality for encoded images (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, env = "WSI_JPEG_QUALITY")]
    pub jpeg_quality: u8,

    /// Largest accepted width or height of a region request.
    #[arg(long, default_value_t = DEFAULT_REGION_MAX_EDGE, env = "WSI_REGION_MAX_EDGE")]
    pub region_max_edge: u32,

    // =========================================================================
    // Heatmap Configuration
    // =========================================================================
    /// Bound on the thumbnail the heatmap is computed from.
    #[arg(long, default_value_t = DEFAULT_THUMBNAIL_SIZE, env = "WSI_HEATMAP_THUMBNAIL")]
    pub heatmap_thumbnail: u32,

    /// Heatmap grid rows.
    #[arg(long, default_value_t = DEFAULT_GRID_ROWS, env = "WSI_HEATMAP_ROWS")]
    pub heatmap_rows: usize,

    /// Heatmap grid columns.
    #[arg(long, default_value_t = DEFAULT_GRID_COLS, env = "WSI_HEATMAP_COLS")]
    pub heatmap_cols: usize,

    // =========================================================================
    // Cache Configuration
    // =========================================================================
    /// Maximum number of opened slides to keep in memory (0 = unbounded).
    #[arg(long, default_value_t = DEFAULT_SLIDE_CACHE_CAPACITY, env = "WSI_CACHE_SLIDES")]
    pub cache_slides: usize,

    /// HTTP Cache-Control max-age in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "WSI_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "WSI_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.tile_size == 0 {
            return Err("tile_size must be greater than 0".to_string());
        }
        if self.overlap >= self.tile_size {
            return Err(format!(
                "overlap ({}) must be smaller than tile_size ({})",
                self.overlap, self.tile_size
            ));
        }

        if !is_valid_quality(self.jpeg_quality) {
            return Err("jpeg_quality must be between 1 and 100".to_string());
        }

        if self.region_max_edge == 0 {
            return Err("region_max_edge must be greater than 0".to_string());
        }

        if self.heatmap_thumbnail == 0 {
            return Err("heatmap_thumbnail must be greater than 0".to_string());
        }
        if self.heatmap_rows == 0 || self.heatmap_cols == 0 {
            return Err("heatmap_rows and heatmap_cols must be greater than 0".to_string());
        }

        if self.slides_dir.as_os_str().is_empty() {
            return Err(
                "Slides directory is required. Set --slides-dir or WSI_SLIDES_DIR".to_string(),
            );
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn pyramid_config(&self) -> PyramidConfig {
        PyramidConfig {
            tile_size: self.tile_size,
            overlap: self.overlap,
        }
    }

    pub fn heatmap_params(&self) -> HeatmapParams {
        HeatmapParams {
            thumbnail_size: self.heatmap_thumbnail,
            rows: self.heatmap_rows,
            cols: self.heatmap_cols,
        }
    }

    pub fn slide_cache_policy(&self) -> CachePolicy {
        CachePolicy::from_capacity(self.cache_slides)
    }
}

// =============================================================================
// Tests
// =============================================================================
