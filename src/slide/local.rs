//! Filesystem-backed slide source for ordinary raster images.
//!
//! `LocalSlideSource` serves every supported image file in one directory.
//! Each file is decoded fully into memory by the `image` crate and exposed as
//! a `RasterSlide` with synthetic native levels (successive halvings), which
//! is enough to drive the pyramid generator and the heatmap engine for
//! PNG/JPEG/TIFF/BMP inputs. Proprietary slide containers need a dedicated
//! `SlideSource` implementation.

use std::collections::HashMap;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{ImageReader, RgbaImage};
use tracing::debug;

use crate::error::SlideError;

use super::reader::{SlideReader, PROPERTY_VENDOR};
use super::source::{SlideEntry, SlideSource};

/// File extensions recognised as slides (lowercase).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp"];

/// Synthetic levels stop once the longer side is at most this many pixels.
const MIN_LEVEL_DIMENSION: u32 = 1024;

/// Property key for the number of native levels.
const PROPERTY_LEVEL_COUNT: &str = "openslide.level-count";

// =============================================================================
// LocalSlideSource
// =============================================================================

/// Slide source reading image files from a single directory.
///
/// Slide identifiers are bare file names inside the directory.
#[derive(Debug, Clone)]
pub struct LocalSlideSource {
    root: PathBuf,
}

impl LocalSlideSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map an identifier to a path inside the root directory.
    ///
    /// Identifiers that could escape the directory resolve to nothing.
    fn resolve(&self, slide_id: &str) -> Option<PathBuf> {
        let escapes = slide_id.is_empty()
            || slide_id.contains(['/', '\\'])
            || slide_id == "."
            || slide_id.contains("..");
        if escapes || !is_supported(slide_id) {
            return None;
        }
        Some(self.root.join(slide_id))
    }
}

/// Whether a file name carries a supported extension.
pub fn is_supported(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl SlideSource for LocalSlideSource {
    type Reader = RasterSlide;

    fn open(&self, slide_id: &str) -> Result<Self::Reader, SlideError> {
        let path = self
            .resolve(slide_id)
            .ok_or_else(|| SlideError::not_found(slide_id))?;
        debug!(slide_id = slide_id, path = %path.display(), "Opening raster slide");
        RasterSlide::open(&path).map_err(|err| match err {
            SlideError::NotFound { .. } => SlideError::not_found(slide_id),
            other => other,
        })
    }

    fn list(&self) -> Result<Vec<SlideEntry>, SlideError> {
        let entries = std::fs::read_dir(&self.root)
            .map_err(|_| SlideError::not_found(self.root.display().to_string()))?;

        let mut slides = Vec::new();
        for entry in entries.flatten() {
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if is_supported(&name) {
                slides.push(SlideEntry {
                    slide_id: name,
                    size: metadata.len(),
                });
            }
        }

        slides.sort_by(|a, b| a.slide_id.cmp(&b.slide_id));
        Ok(slides)
    }
}

// =============================================================================
// RasterSlide
// =============================================================================

/// A fully decoded raster image with synthetic downsampled levels.
pub struct RasterSlide {
    /// Level 0 first, each following level half the size of the previous
    levels: Vec<RgbaImage>,

    properties: HashMap<String, String>,
}

impl RasterSlide {
    /// Decode an image file.
    pub fn open(path: &Path) -> Result<Self, SlideError> {
        let reader = ImageReader::open(path).map_err(|err| match err.kind() {
            IoErrorKind::NotFound | IoErrorKind::PermissionDenied => {
                SlideError::not_found(path.display().to_string())
            }
            _ => SlideError::decode(err),
        })?;
        let reader = reader.with_guessed_format().map_err(SlideError::decode)?;
        let format = reader
            .format()
            .map(|f| format!("{f:?}").to_ascii_lowercase())
            .unwrap_or_else(|| "unknown".to_string());
        let image = reader.decode().map_err(SlideError::decode)?;

        let mut properties = HashMap::new();
        properties.insert(PROPERTY_VENDOR.to_string(), format!("generic-{format}"));
        Self::from_image(image.to_rgba8(), properties)
    }

    /// Build a slide from an already decoded image.
    pub fn from_image(
        base: RgbaImage,
        mut properties: HashMap<String, String>,
    ) -> Result<Self, SlideError> {
        if base.width() == 0 || base.height() == 0 {
            return Err(SlideError::decode("image has no pixels"));
        }

        let mut levels = vec![base];
        loop {
            let Some(last) = levels.last() else { break };
            let (width, height) = last.dimensions();
            if width.max(height) <= MIN_LEVEL_DIMENSION || width < 2 || height < 2 {
                break;
            }
            let next = image::imageops::resize(last, width / 2, height / 2, FilterType::Triangle);
            levels.push(next);
        }

        properties.insert(PROPERTY_LEVEL_COUNT.to_string(), levels.len().to_string());
        Ok(Self { levels, properties })
    }
}

impl SlideReader for RasterSlide {
    fn dimensions(&self) -> (u32, u32) {
        self.levels[0].dimensions()
    }

    fn level_count(&self) -> usize {
        self.levels.len()
    }

    fn level_dimensions(&self, level: usize) -> Option<(u32, u32)> {
        self.levels.get(level).map(|image| image.dimensions())
    }

    fn level_downsample(&self, level: usize) -> Option<f64> {
        let (base_width, base_height) = self.dimensions();
        let (width, height) = self.level_dimensions(level)?;
        Some((base_width as f64 / width as f64 + base_height as f64 / height as f64) / 2.0)
    }

    fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }

    fn read_region(
        &self,
        x: u64,
        y: u64,
        level: usize,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage, SlideError> {
        let source = self
            .levels
            .get(level)
            .ok_or_else(|| SlideError::decode(format!("no such level: {level}")))?;
        let downsample = self.level_downsample(level).unwrap_or(1.0);

        let origin_x = (x as f64 / downsample).floor() as u64;
        let origin_y = (y as f64 / downsample).floor() as u64;

        let mut region = RgbaImage::new(width, height);
        for dy in 0..height {
            let sy = origin_y + dy as u64;
            if sy >= source.height() as u64 {
                break;
            }
            for dx in 0..width {
                let sx = origin_x + dx as u64;
                if sx >= source.width() as u64 {
                    break;
                }
                region.put_pixel(dx, dy, *source.get_pixel(sx as u32, sy as u32));
            }
        }
        Ok(region)
    }
}

// =============================================================================
// Tests
// =============================================================================
