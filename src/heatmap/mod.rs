//! Tissue heatmap engine.
//!
//! Summarizes a slide as a coarse grid of tissue-content scores, computed
//! once per slide from a low-resolution thumbnail and then served from
//! memory.
//!
//! # Components
//!
//! - [`analysis`]: pure pixel classification and grid operations
//! - [`HeatmapService`]: single-flight cache and orchestration

pub mod analysis;
mod service;

use serde::Serialize;

pub use analysis::{
    HeatmapParams, DEFAULT_GRID_COLS, DEFAULT_GRID_ROWS, DEFAULT_THUMBNAIL_SIZE,
};
pub use service::HeatmapService;

/// A slide's heatmap, immutable once computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapGrid {
    /// `rows` x `cols` scores in `[0, 1]`, top row first
    pub grid: Vec<Vec<f64>>,

    /// `[rows, cols]`
    pub grid_dims: [usize; 2],

    /// `[width, height]` of the full-resolution slide
    pub base_dims: [u32; 2],
}

impl HeatmapGrid {
    pub fn rows(&self) -> usize {
        self.grid_dims[0]
    }

    pub fn cols(&self) -> usize {
        self.grid_dims[1]
    }
}
