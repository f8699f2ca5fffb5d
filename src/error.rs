use thiserror::Error;

use crate::cache::InitAborted;

/// Coarse classification shared by every error type in the crate.
///
/// Callers (most notably the HTTP layer) match on this instead of on the
/// individual variants, so new variants only need to pick a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unknown identifier or an underlying file that cannot be opened
    NotFound,
    /// The image decoder failed on the underlying data
    Decode,
    /// Tile address outside the pyramid bounds
    OutOfRange,
    /// Malformed request parameters
    InvalidArgument,
    /// Heatmap computation failed
    Analysis,
    /// Encoding or worker failures that are not the caller's fault
    Internal,
}

/// Errors reported by slide sources and readers (the decoding collaborator).
#[derive(Debug, Clone, Error)]
pub enum SlideError {
    /// No image exists for the identifier, or it could not be opened
    #[error("Slide not found: {slide_id}")]
    NotFound { slide_id: String },

    /// The underlying format or codec failed
    #[error("Decode error: {message}")]
    Decode { message: String },
}

impl SlideError {
    pub fn not_found(slide_id: impl Into<String>) -> Self {
        SlideError::NotFound {
            slide_id: slide_id.into(),
        }
    }

    pub fn decode(message: impl ToString) -> Self {
        SlideError::Decode {
            message: message.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SlideError::NotFound { .. } => ErrorKind::NotFound,
            SlideError::Decode { .. } => ErrorKind::Decode,
        }
    }
}

impl From<InitAborted> for SlideError {
    fn from(err: InitAborted) -> Self {
        SlideError::decode(err)
    }
}

/// Errors from tile, thumbnail and region generation.
#[derive(Debug, Clone, Error)]
pub enum TileError {
    /// Opening or reading the slide failed
    #[error(transparent)]
    Slide(#[from] SlideError),

    /// Pyramid level does not exist
    #[error("Invalid level: {level} (pyramid has {level_count} levels)")]
    InvalidLevel { level: usize, level_count: usize },

    /// Column/row outside the level's tile grid
    #[error("Tile ({col}, {row}) at level {level} is out of bounds (grid is {cols}x{rows})")]
    TileOutOfBounds {
        level: usize,
        col: u32,
        row: u32,
        cols: u32,
        rows: u32,
    },

    /// Region or thumbnail parameters are unusable
    #[error("Invalid region: {reason}")]
    InvalidRegion { reason: String },

    /// JPEG quality outside 1-100
    #[error("Invalid quality: {quality} (must be 1-100)")]
    InvalidQuality { quality: u8 },

    /// Output image could not be encoded
    #[error("Failed to encode image: {message}")]
    EncodeError { message: String },

    /// Blocking worker panicked or was cancelled
    #[error("Worker failed: {message}")]
    Worker { message: String },
}

impl TileError {
    pub fn invalid_region(reason: impl Into<String>) -> Self {
        TileError::InvalidRegion {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TileError::Slide(err) => err.kind(),
            TileError::InvalidLevel { .. } | TileError::TileOutOfBounds { .. } => {
                ErrorKind::OutOfRange
            }
            TileError::InvalidRegion { .. } | TileError::InvalidQuality { .. } => {
                ErrorKind::InvalidArgument
            }
            TileError::EncodeError { .. } | TileError::Worker { .. } => ErrorKind::Internal,
        }
    }
}

/// Errors from the heatmap engine.
#[derive(Debug, Clone, Error)]
pub enum HeatmapError {
    /// The slide could not be acquired
    #[error(transparent)]
    Slide(#[from] SlideError),

    /// Thumbnail fetch or grid computation failed
    #[error("Heatmap analysis failed: {message}")]
    Analysis { message: String },
}

impl HeatmapError {
    pub fn analysis(message: impl ToString) -> Self {
        HeatmapError::Analysis {
            message: message.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            HeatmapError::Slide(err) => err.kind(),
            HeatmapError::Analysis { .. } => ErrorKind::Analysis,
        }
    }
}

impl From<InitAborted> for HeatmapError {
    fn from(err: InitAborted) -> Self {
        HeatmapError::analysis(err)
    }
}
