//! Stain-based tissue scoring.
//!
//! A heuristic, not a trained classifier: every pixel of a low-resolution
//! thumbnail is classified by simple colour thresholds tuned for H&E
//! staining, and each grid cell is scored by how much tissue, nuclear
//! (haematoxylin) and eosin staining it contains.
//!
//! ```text
//!   thumbnail ──► R x C cells ──► score ──► 3x3 box blur ──► min/max normalise
//! ```
//!
//! All functions here are pure and synchronous.

use image::RgbImage;

use crate::error::HeatmapError;

/// Default bound on the thumbnail's longer side.
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 256;

/// Default grid rows.
pub const DEFAULT_GRID_ROWS: usize = 32;

/// Default grid columns.
pub const DEFAULT_GRID_COLS: usize = 32;

/// Pixels brighter than this are glass.
const BACKGROUND_BRIGHTNESS: f64 = 218.0;

/// Nuclear pixels are darker than this.
const NUCLEAR_MAX_BRIGHTNESS: f64 = 160.0;

/// Nuclear pixels have blue above this fraction of red.
const NUCLEAR_BLUE_RATIO: f64 = 0.85;

/// Eosin pixels have red exceeding both green and blue by more than this.
const EOSIN_RED_MARGIN: f64 = 10.0;

const EOSIN_MIN_BRIGHTNESS: f64 = 100.0;
const EOSIN_MAX_BRIGHTNESS: f64 = 220.0;

const TISSUE_WEIGHT: f64 = 0.35;
const NUCLEAR_WEIGHT: f64 = 0.50;
const EOSIN_WEIGHT: f64 = 0.15;

/// Nuclear fraction at which the nuclear term saturates is `1 / NUCLEAR_GAIN`.
const NUCLEAR_GAIN: f64 = 6.0;
const EOSIN_GAIN: f64 = 2.0;

// =============================================================================
// Parameters
// =============================================================================

/// Heatmap resolution settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeatmapParams {
    /// Thumbnail is fetched bounded by `thumbnail_size` x `thumbnail_size`
    pub thumbnail_size: u32,

    /// Grid rows
    pub rows: usize,

    /// Grid columns
    pub cols: usize,
}

impl Default for HeatmapParams {
    fn default() -> Self {
        Self {
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
            rows: DEFAULT_GRID_ROWS,
            cols: DEFAULT_GRID_COLS,
        }
    }
}

// =============================================================================
// Per-cell Composition
// =============================================================================

/// Fractions of a cell's pixels in each stain class.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CellComposition {
    /// Non-background pixels
    pub tissue: f64,

    /// Dark bluish-purple pixels
    pub nuclear: f64,

    /// Pink-red pixels of moderate brightness
    pub eosin: f64,
}

impl CellComposition {
    /// Classify every pixel of `image` inside the half-open rectangle.
    pub fn measure(image: &RgbImage, x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        let mut total = 0u64;
        let mut background = 0u64;
        let mut nuclear = 0u64;
        let mut eosin = 0u64;

        for y in y0..y1 {
            for x in x0..x1 {
                let [r, g, b] = image.get_pixel(x, y).0;
                let (r, g, b) = (r as f64, g as f64, b as f64);
                let brightness = (r + g + b) / 3.0;
                total += 1;

                if brightness > BACKGROUND_BRIGHTNESS {
                    background += 1;
                    continue;
                }
                if brightness < NUCLEAR_MAX_BRIGHTNESS && b > r * NUCLEAR_BLUE_RATIO {
                    nuclear += 1;
                }
                if r > g + EOSIN_RED_MARGIN
                    && r > b + EOSIN_RED_MARGIN
                    && brightness > EOSIN_MIN_BRIGHTNESS
                    && brightness < EOSIN_MAX_BRIGHTNESS
                {
                    eosin += 1;
                }
            }
        }

        if total == 0 {
            return Self::default();
        }
        let total = total as f64;
        Self {
            tissue: 1.0 - background as f64 / total,
            nuclear: nuclear as f64 / total,
            eosin: eosin as f64 / total,
        }
    }

    /// Weighted score in `[0, 1]`, rounded to four decimals.
    pub fn score(&self) -> f64 {
        let raw = TISSUE_WEIGHT * self.tissue
            + NUCLEAR_WEIGHT * (NUCLEAR_GAIN * self.nuclear).min(1.0)
            + EOSIN_WEIGHT * (EOSIN_GAIN * self.eosin).min(1.0);
        round4(raw.clamp(0.0, 1.0))
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

// =============================================================================
// Grid Operations
// =============================================================================

/// Half-open span of cell `index` along an axis of `extent` pixels.
///
/// The last cell extends to the edge so no pixels are dropped.
fn cell_span(index: usize, count: usize, extent: u32) -> (u32, u32) {
    let cell = (extent as usize / count).max(1);
    let start = (index * cell).min(extent as usize);
    // Leftover rows/columns (extent not divisible by count) go to the last
    // cell instead of being left unscored
    let end = if index + 1 == count {
        extent as usize
    } else {
        (start + cell).min(extent as usize)
    };
    (start as u32, end as u32)
}

/// Raw per-cell scores of a thumbnail, `rows` x `cols`.
///
/// Cells with no pixels (thumbnail smaller than the grid) score 0.
pub fn score_grid(image: &RgbImage, rows: usize, cols: usize) -> Vec<Vec<f64>> {
    let (width, height) = image.dimensions();
    (0..rows)
        .map(|row| {
            let (y0, y1) = cell_span(row, rows, height);
            (0..cols)
                .map(|col| {
                    let (x0, x1) = cell_span(col, cols, width);
                    if y1 <= y0 || x1 <= x0 {
                        return 0.0;
                    }
                    CellComposition::measure(image, x0, y0, x1, y1).score()
                })
                .collect()
        })
        .collect()
}

/// Mirror an out-of-range index back into `0..n`, repeating the edge cell.
pub fn reflect(index: isize, n: usize) -> usize {
    let n = n as isize;
    let mirrored = if index < 0 {
        -index - 1
    } else if index >= n {
        2 * n - index - 1
    } else {
        index
    };
    mirrored.clamp(0, n - 1) as usize
}

/// 3x3 box average with reflected borders.
///
/// Reflection is edge-inclusive (index -1 reads 0, `n` reads `n - 1`), so a
/// border cell counts itself twice: an isolated hot corner keeps 4/9 of its
/// value rather than 1/9.
pub fn box_smooth(grid: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let rows = grid.len();
    (0..rows)
        .map(|row| {
            let cols = grid[row].len();
            (0..cols)
                .map(|col| {
                    let mut sum = 0.0;
                    for dr in -1isize..=1 {
                        let r = reflect(row as isize + dr, rows);
                        for dc in -1isize..=1 {
                            let c = reflect(col as isize + dc, cols);
                            sum += grid[r][c];
                        }
                    }
                    sum / 9.0
                })
                .collect()
        })
        .collect()
}

/// Stretch values to `[0, 1]`; a constant grid is left unchanged.
pub fn normalize(grid: &mut [Vec<f64>]) {
    let values = grid.iter().flatten().copied();
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if max <= min {
        return;
    }
    let range = max - min;
    for value in grid.iter_mut().flatten() {
        *value = (*value - min) / range;
    }
}

/// Full analysis of a thumbnail: score, smooth, normalise.
pub fn analyze(thumbnail: &RgbImage, params: &HeatmapParams) -> Result<Vec<Vec<f64>>, HeatmapError> {
    if params.rows == 0 || params.cols == 0 {
        return Err(HeatmapError::analysis(format!(
            "grid must be non-empty, got {}x{}",
            params.rows, params.cols
        )));
    }
    if thumbnail.width() == 0 || thumbnail.height() == 0 {
        return Err(HeatmapError::analysis("thumbnail has no pixels"));
    }

    let raw = score_grid(thumbnail, params.rows, params.cols);
    let mut smoothed = box_smooth(&raw);
    normalize(&mut smoothed);
    Ok(smoothed)
}

// =============================================================================
// Tests
// =============================================================================
