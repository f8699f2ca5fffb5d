//! Heatmap service: compute once, serve from memory.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::cache::{CachePolicy, SingleFlightCache};
use crate::error::{HeatmapError, SlideError};
use crate::slide::{SlideReader, SlideRegistry, SlideSource};

use super::analysis::{analyze, HeatmapParams};
use super::HeatmapGrid;

/// Computes and caches one heatmap per slide.
///
/// Concurrent first requests for a slide share a single computation. A
/// cached heatmap is returned without touching the slide at all; failures
/// are reported to every waiter and never cached.
pub struct HeatmapService<S: SlideSource> {
    registry: Arc<SlideRegistry<S>>,

    /// Completed heatmaps, kept for the lifetime of the process
    heatmaps: SingleFlightCache<HeatmapGrid, HeatmapError>,

    params: HeatmapParams,
}

impl<S: SlideSource> HeatmapService<S> {
    pub fn new(registry: Arc<SlideRegistry<S>>) -> Self {
        Self::with_params(registry, HeatmapParams::default())
    }

    pub fn with_params(registry: Arc<SlideRegistry<S>>, params: HeatmapParams) -> Self {
        Self {
            registry,
            heatmaps: SingleFlightCache::new(CachePolicy::Unbounded),
            params,
        }
    }

    pub fn params(&self) -> HeatmapParams {
        self.params
    }

    /// Return the slide's heatmap, computing it on first request.
    ///
    /// Errors are `NotFound` for unknown slides and `Analysis` for anything
    /// that goes wrong opening or analysing a slide that exists.
    pub async fn compute_or_fetch(&self, slide_id: &str) -> Result<Arc<HeatmapGrid>, HeatmapError> {
        let registry = Arc::clone(&self.registry);
        let params = self.params;
        self.heatmaps
            .get_or_try_insert_with(slide_id, || {
                compute(registry, slide_id.to_string(), params)
            })
            .await
    }

    /// Number of heatmaps held in memory.
    pub async fn cached_count(&self) -> usize {
        self.heatmaps.len().await
    }
}

async fn compute<S: SlideSource>(
    registry: Arc<SlideRegistry<S>>,
    slide_id: String,
    params: HeatmapParams,
) -> Result<HeatmapGrid, HeatmapError> {
    let slide = registry
        .acquire(&slide_id)
        .await
        .map_err(|err| match err {
            SlideError::NotFound { .. } => HeatmapError::Slide(err),
            other => HeatmapError::analysis(format!("slide open failed: {other}")),
        })?;
    let reader = slide.reader();
    let started = Instant::now();

    let result = tokio::task::spawn_blocking(move || {
        let (width, height) = reader.dimensions();
        let thumbnail = reader
            .thumbnail(params.thumbnail_size, params.thumbnail_size)
            .map_err(|err| HeatmapError::analysis(format!("thumbnail fetch failed: {err}")))?;
        let grid = analyze(&thumbnail, &params)?;
        Ok::<_, HeatmapError>(HeatmapGrid {
            grid,
            grid_dims: [params.rows, params.cols],
            base_dims: [width, height],
        })
    })
    .await
    .map_err(|err| HeatmapError::analysis(format!("analysis worker failed: {err}")))?;

    match &result {
        Ok(_) => info!(
            slide_id = %slide_id,
            rows = params.rows,
            cols = params.cols,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Computed heatmap"
        ),
        Err(err) => warn!(slide_id = %slide_id, error = %err, "Heatmap computation failed"),
    }
    result
}

// =============================================================================
// Tests
// =============================================================================
