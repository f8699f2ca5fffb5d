//! Slide Registry for managing slide lifecycle and caching.
//!
//! The registry provides:
//! - Caching of opened slide readers so each slide is decoded once
//! - Singleflight pattern to prevent duplicate opens for the same slide
//! - The slide's pyramid descriptor, computed once when the slide is opened
//!
//! # Example
//!
//! ```no_run
//! use wsi_viewer::slide::{LocalSlideSource, SlideRegistry};
//!
//! # async fn run() -> Result<(), wsi_viewer::SlideError> {
//! let registry = SlideRegistry::new(LocalSlideSource::new("uploads"));
//!
//! // Opens and caches on first access
//! let slide = registry.acquire("sample.tiff").await?;
//! println!("{} pyramid levels", slide.pyramid().level_count());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tracing::{debug, info};

use crate::cache::{CachePolicy, SingleFlightCache};
use crate::error::SlideError;
use crate::tile::pyramid::{PyramidConfig, PyramidDescriptor};

use super::reader::{SlideProperties, SlideReader};
use super::source::SlideSource;

// =============================================================================
// CachedSlide
// =============================================================================

/// A slide that has been opened and cached.
///
/// Holds the decoder handle together with everything derived from it at open
/// time. Shared read-only by all concurrent requests for the slide.
pub struct CachedSlide<R> {
    slide_id: String,

    /// The decoder handle
    reader: Arc<R>,

    /// Deep-zoom geometry for the base dimensions
    pyramid: PyramidDescriptor,

    /// Parsed vendor properties
    properties: SlideProperties,
}

impl<R: SlideReader> CachedSlide<R> {
    pub fn new(slide_id: impl Into<String>, reader: R, config: PyramidConfig) -> Self {
        let (width, height) = reader.dimensions();
        let pyramid = PyramidDescriptor::describe(width, height, config);
        let properties = SlideProperties::from_map(reader.properties());
        Self {
            slide_id: slide_id.into(),
            reader: Arc::new(reader),
            pyramid,
            properties,
        }
    }

    pub fn slide_id(&self) -> &str {
        &self.slide_id
    }

    /// Shared handle to the reader, for moving into blocking workers.
    pub fn reader(&self) -> Arc<R> {
        Arc::clone(&self.reader)
    }

    pub fn pyramid(&self) -> &PyramidDescriptor {
        &self.pyramid
    }

    pub fn properties(&self) -> &SlideProperties {
        &self.properties
    }

    /// Dimensions of the full-resolution image.
    pub fn dimensions(&self) -> (u32, u32) {
        self.reader.dimensions()
    }
}

// =============================================================================
// SlideRegistry
// =============================================================================

/// Registry for managing slide lifecycle and caching.
///
/// The registry:
/// - Opens slides on demand through its [`SlideSource`]
/// - Caches opened slides under the configured [`CachePolicy`]
/// - Uses singleflight so concurrent first requests share one open
/// - Never caches failed opens
pub struct SlideRegistry<S: SlideSource> {
    /// The source for opening slides
    source: Arc<S>,

    /// Opened slides indexed by slide ID
    slides: SingleFlightCache<CachedSlide<S::Reader>, SlideError>,

    /// Tile geometry applied to every slide
    pyramid_config: PyramidConfig,
}

impl<S: SlideSource> SlideRegistry<S> {
    /// Create a registry with default tile geometry that never evicts.
    pub fn new(source: S) -> Self {
        Self::with_policy(source, PyramidConfig::default(), CachePolicy::Unbounded)
    }

    /// Create a registry with custom tile geometry and eviction policy.
    pub fn with_policy(source: S, pyramid_config: PyramidConfig, policy: CachePolicy) -> Self {
        Self {
            source: Arc::new(source),
            slides: SingleFlightCache::new(policy),
            pyramid_config,
        }
    }

    /// Get a slide, opening it if not already cached.
    ///
    /// Opening runs on a blocking worker. Concurrent callers for the same
    /// identifier wait for a single open and receive the same handle; if it
    /// fails they all receive the error and nothing is cached.
    pub async fn acquire(&self, slide_id: &str) -> Result<Arc<CachedSlide<S::Reader>>, SlideError> {
        let source = Arc::clone(&self.source);
        let config = self.pyramid_config;
        self.slides
            .get_or_try_insert_with(slide_id, || {
                open_slide(source, slide_id.to_string(), config)
            })
            .await
    }

    /// Remove a slide from the cache.
    ///
    /// This can be useful for forcing a reload after the file changed.
    pub async fn invalidate(&self, slide_id: &str) {
        debug!(slide_id = slide_id, "Invalidating slide");
        self.slides.invalidate(slide_id).await;
    }

    /// Clear all cached slides.
    pub async fn clear(&self) {
        self.slides.clear().await;
    }

    /// Get the number of cached slides.
    pub async fn cached_count(&self) -> usize {
        self.slides.len().await
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Owned handle to the source, for moving into blocking workers.
    pub fn shared_source(&self) -> Arc<S> {
        Arc::clone(&self.source)
    }

    pub fn pyramid_config(&self) -> PyramidConfig {
        self.pyramid_config
    }
}

/// Open a slide without caching.
///
/// Takes owned handles so the open can outlive the request that started it.
async fn open_slide<S: SlideSource>(
    source: Arc<S>,
    slide_id: String,
    config: PyramidConfig,
) -> Result<CachedSlide<S::Reader>, SlideError> {
    let id = slide_id.clone();
    let slide = tokio::task::spawn_blocking(move || {
        let reader = source.open(&id)?;
        Ok::<_, SlideError>(CachedSlide::new(id, reader, config))
    })
    .await
    .map_err(|err| SlideError::decode(format!("open worker failed: {err}")))??;

    let (width, height) = slide.dimensions();
    info!(
        slide_id = %slide_id,
        width = width,
        height = height,
        levels = slide.pyramid().level_count(),
        "Opened slide"
    );
    Ok(slide)
}

// =============================================================================
// Tests
// =============================================================================
