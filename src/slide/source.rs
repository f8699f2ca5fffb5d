//! SlideSource trait for resolving identifiers into opened slides.
//!
//! This abstraction allows the registry to work with different storage
//! backends and decoders (a local directory, a proprietary decoder, an
//! in-memory fixture) without being tied to a specific implementation.

use serde::Serialize;

use crate::error::SlideError;

use super::reader::SlideReader;

/// One slide available from a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlideEntry {
    /// Identifier accepted by [`SlideSource::open`]
    pub slide_id: String,

    /// Size of the underlying file in bytes
    pub size: u64,
}

/// Opens slides by identifier and enumerates what is available.
///
/// Both methods block; the registry and services call them from blocking
/// worker threads.
pub trait SlideSource: Send + Sync + 'static {
    /// The type of reader this source produces.
    type Reader: SlideReader + 'static;

    /// Open the slide named `slide_id`.
    ///
    /// Returns [`SlideError::NotFound`] when no such slide exists or it
    /// cannot be opened, and [`SlideError::Decode`] when it exists but its
    /// contents cannot be decoded.
    fn open(&self, slide_id: &str) -> Result<Self::Reader, SlideError>;

    /// List every slide this source can open.
    fn list(&self) -> Result<Vec<SlideEntry>, SlideError>;
}
