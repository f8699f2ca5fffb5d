//! JPEG tile encoder.
//!
//! Tiles, thumbnails and regions all leave the crate as baseline JPEGs. The
//! generator hands over opaque RGB images (transparency already flattened
//! onto white), so encoding never has to deal with an alpha channel.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

use crate::error::TileError;

/// Default JPEG quality (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Minimum allowed JPEG quality.
pub const MIN_JPEG_QUALITY: u8 = 1;

/// Maximum allowed JPEG quality.
pub const MAX_JPEG_QUALITY: u8 = 100;

// =============================================================================
// JPEG Encoder
// =============================================================================

/// JPEG encoder for generated images.
///
/// # Example
///
/// ```
/// use image::{Rgb, RgbImage};
/// use wsi_viewer::tile::JpegTileEncoder;
///
/// let encoder = JpegTileEncoder::new(85).unwrap();
/// let tile = RgbImage::from_pixel(256, 256, Rgb([230, 200, 210]));
/// let jpeg = encoder.encode(&tile).unwrap();
/// assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegTileEncoder {
    quality: u8,
}

impl Default for JpegTileEncoder {
    fn default() -> Self {
        Self {
            quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl JpegTileEncoder {
    /// Create an encoder with a fixed output quality.
    pub fn new(quality: u8) -> Result<Self, TileError> {
        if !is_valid_quality(quality) {
            return Err(TileError::InvalidQuality { quality });
        }
        Ok(Self { quality })
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Encode an RGB image as JPEG.
    pub fn encode(&self, image: &RgbImage) -> Result<Bytes, TileError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(TileError::EncodeError {
                message: "cannot encode an empty image".to_string(),
            });
        }

        let mut output = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut output, self.quality);
        encoder
            .encode_image(image)
            .map_err(|e| TileError::EncodeError {
                message: e.to_string(),
            })?;

        Ok(Bytes::from(output))
    }
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Validate JPEG quality parameter.
///
/// Returns `true` if quality is in the valid range (1-100).
#[inline]
pub fn is_valid_quality(quality: u8) -> bool {
    (MIN_JPEG_QUALITY..=MAX_JPEG_QUALITY).contains(&quality)
}

// =============================================================================
// Tests
// =============================================================================
