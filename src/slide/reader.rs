//! SlideReader trait for format-agnostic slide access.
//!
//! This module defines the `SlideReader` trait, the contract the rest of the
//! crate expects from an image-decoding collaborator: base and per-level
//! dimensions, per-level downsample factors, vendor properties, exact region
//! reads and thumbnails.
//!
//! Decoders for proprietary container formats live outside this crate and
//! plug in by implementing this trait. [`crate::slide::RasterSlide`] is the
//! bundled implementation for ordinary raster files.

use std::collections::HashMap;

use image::imageops::FilterType;
use image::{Rgb, RgbImage, RgbaImage};

use crate::error::SlideError;

/// Property key holding the scanner vendor.
pub const PROPERTY_VENDOR: &str = "openslide.vendor";

/// Property key holding microns per pixel along X.
pub const PROPERTY_MPP_X: &str = "openslide.mpp-x";

/// Property key holding microns per pixel along Y.
pub const PROPERTY_MPP_Y: &str = "openslide.mpp-y";

/// Property key holding the scanning objective power.
pub const PROPERTY_OBJECTIVE_POWER: &str = "openslide.objective-power";

/// Background used when flattening transparent pixels.
pub const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Slack when comparing downsample factors, which decoders report as floats.
const DOWNSAMPLE_EPSILON: f64 = 1e-6;

// =============================================================================
// SlideReader Trait
// =============================================================================

/// Format-agnostic interface to one opened multi-resolution image.
///
/// Level 0 is always the full-resolution image; higher levels are
/// progressively smaller. All methods are synchronous and may be slow, so
/// callers run them on blocking worker threads.
pub trait SlideReader: Send + Sync {
    /// Dimensions of the full-resolution (level 0) image.
    fn dimensions(&self) -> (u32, u32);

    /// Number of native resolution levels.
    fn level_count(&self) -> usize;

    /// Dimensions of a native level, or `None` if the level does not exist.
    fn level_dimensions(&self, level: usize) -> Option<(u32, u32)>;

    /// Downsample factor of a native level relative to level 0.
    fn level_downsample(&self, level: usize) -> Option<f64>;

    /// Free-form vendor metadata.
    fn properties(&self) -> &HashMap<String, String>;

    /// Read a `width` x `height` RGBA region from native level `level`.
    ///
    /// `x` and `y` are the top-left corner in level 0 coordinates. Pixels
    /// outside the image are fully transparent.
    fn read_region(
        &self,
        x: u64,
        y: u64,
        level: usize,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage, SlideError>;

    /// Largest native level whose downsample does not exceed `downsample`.
    ///
    /// Falls back to level 0 when every level is coarser than requested.
    fn best_level_for_downsample(&self, downsample: f64) -> usize {
        (0..self.level_count())
            .filter(|&level| {
                self.level_downsample(level)
                    .is_some_and(|d| d <= downsample + DOWNSAMPLE_EPSILON)
            })
            .last()
            .unwrap_or(0)
    }

    /// Whole-image RGB thumbnail fitting inside `max_width` x `max_height`.
    ///
    /// The aspect ratio is preserved and the image is never upscaled past
    /// the native level it is read from.
    fn thumbnail(&self, max_width: u32, max_height: u32) -> Result<RgbImage, SlideError> {
        let (width, height) = self.dimensions();
        let max_width = max_width.max(1);
        let max_height = max_height.max(1);

        let downsample =
            (width as f64 / max_width as f64).max(height as f64 / max_height as f64);
        let level = self.best_level_for_downsample(downsample);
        let (level_width, level_height) = self
            .level_dimensions(level)
            .ok_or_else(|| SlideError::decode(format!("missing level {level}")))?;

        let region = self.read_region(0, 0, level, level_width, level_height)?;
        let flat = composite(&region, BACKGROUND);

        let (target_width, target_height) =
            fit_within(level_width, level_height, max_width, max_height);
        if (target_width, target_height) == (level_width, level_height) {
            return Ok(flat);
        }
        Ok(image::imageops::resize(
            &flat,
            target_width,
            target_height,
            FilterType::Triangle,
        ))
    }
}

// =============================================================================
// Pixel Helpers
// =============================================================================

/// Flatten an RGBA image onto an opaque background colour.
pub fn composite(source: &RgbaImage, background: Rgb<u8>) -> RgbImage {
    RgbImage::from_fn(source.width(), source.height(), |x, y| {
        let [r, g, b, a] = source.get_pixel(x, y).0;
        let alpha = a as u32;
        let blend = |fg: u8, bg: u8| -> u8 {
            ((fg as u32 * alpha + bg as u32 * (255 - alpha) + 127) / 255) as u8
        };
        Rgb([
            blend(r, background[0]),
            blend(g, background[1]),
            blend(b, background[2]),
        ])
    })
}

/// Largest size with the aspect ratio of `width` x `height` that fits the box.
///
/// Never grows the image; each side is at least one pixel.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }
    let scale = (max_width as f64 / width as f64).min(max_height as f64 / height as f64);
    let fitted_width = ((width as f64 * scale).round() as u32).clamp(1, max_width);
    let fitted_height = ((height as f64 * scale).round() as u32).clamp(1, max_height);
    (fitted_width, fitted_height)
}

// =============================================================================
// Slide Properties
// =============================================================================

/// Well-known properties parsed out of a reader's property map.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideProperties {
    /// Scanner vendor, `"Unknown"` when not reported
    pub vendor: String,

    /// Microns per pixel along X
    pub mpp_x: Option<f64>,

    /// Microns per pixel along Y
    pub mpp_y: Option<f64>,

    /// Objective power the slide was scanned at
    pub objective_power: Option<f64>,
}

impl SlideProperties {
    pub fn from_map(properties: &HashMap<String, String>) -> Self {
        let number = |key: &str| {
            properties
                .get(key)
                .and_then(|value| value.trim().parse::<f64>().ok())
        };

        Self {
            vendor: properties
                .get(PROPERTY_VENDOR)
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string()),
            mpp_x: number(PROPERTY_MPP_X),
            mpp_y: number(PROPERTY_MPP_Y),
            objective_power: number(PROPERTY_OBJECTIVE_POWER),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
