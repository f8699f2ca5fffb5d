//! HTTP request handlers for the WSI viewer API.
//!
//! This module contains the Axum handlers for serving slides, tiles and
//! heatmaps, plus the mapping from crate errors to HTTP responses.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check endpoint
//! - `GET /api/slides` - List slides
//! - `GET /api/slide/{slide_id}/metadata` - Slide and pyramid metadata
//! - `GET /api/slide/{slide_id}/thumbnail` - Whole-slide thumbnail
//! - `GET /api/slide/{slide_id}/tile/{level}/{col}/{row}.jpg` - Deep-zoom tile
//! - `GET /api/slide/{slide_id}/region` - Raw region of a native level
//! - `GET /api/slide/{slide_id}/heatmap` - Tissue heatmap

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::{ErrorKind, HeatmapError, SlideError, TileError};
use crate::heatmap::HeatmapService;
use crate::slide::{SlideEntry, SlideSource};
use crate::tile::{RegionRequest, SlideMetadata, TileRequest, TileResponse, TileService};

/// Header carrying the JPEG quality of an encoded image.
const QUALITY_HEADER: HeaderName = HeaderName::from_static("x-tile-quality");

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the services.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<S: SlideSource> {
    /// Tiles, thumbnails, regions and metadata
    pub tile_service: Arc<TileService<S>>,

    /// Heatmaps
    pub heatmap_service: Arc<HeatmapService<S>>,

    /// Cache control max-age in seconds for image responses
    pub cache_max_age: u32,
}

impl<S: SlideSource> AppState<S> {
    /// Create a new application state with a one hour cache max-age.
    pub fn new(tile_service: Arc<TileService<S>>, heatmap_service: Arc<HeatmapService<S>>) -> Self {
        Self::with_cache_max_age(tile_service, heatmap_service, 3600)
    }

    /// Create a new application state with custom cache max-age.
    pub fn with_cache_max_age(
        tile_service: Arc<TileService<S>>,
        heatmap_service: Arc<HeatmapService<S>>,
        cache_max_age: u32,
    ) -> Self {
        Self {
            tile_service,
            heatmap_service,
            cache_max_age,
        }
    }
}

impl<S: SlideSource> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            tile_service: Arc::clone(&self.tile_service),
            heatmap_service: Arc::clone(&self.heatmap_service),
            cache_max_age: self.cache_max_age,
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Path parameters for tile requests.
///
/// Extracted from: `/api/slide/{slide_id}/tile/{level}/{col}/{filename}`
/// where filename is `{row}` or `{row}.jpg`
#[derive(Debug, Deserialize)]
pub struct TilePathParams {
    /// Slide identifier
    pub slide_id: String,

    /// Pyramid level (0 = single tile)
    pub level: usize,

    /// Tile column
    pub col: u32,

    /// Tile row with optional .jpg extension (e.g., "0" or "0.jpg")
    pub filename: String,
}

impl TilePathParams {
    /// Parse the row from the filename, stripping any .jpg extension.
    pub fn row(&self) -> Result<u32, std::num::ParseIntError> {
        let row = self.filename.strip_suffix(".jpg").unwrap_or(&self.filename);
        row.parse()
    }
}

/// Query parameters for tile requests.
#[derive(Debug, Deserialize)]
pub struct TileQueryParams {
    /// JPEG quality (1-100, defaults to the server setting)
    #[serde(default)]
    pub quality: Option<u8>,
}

/// Query parameters for thumbnail requests.
#[derive(Debug, Deserialize)]
pub struct ThumbnailQueryParams {
    /// Maximum thumbnail width (default: 512)
    #[serde(default = "default_thumbnail_edge")]
    pub width: u32,

    /// Maximum thumbnail height (default: 512)
    #[serde(default = "default_thumbnail_edge")]
    pub height: u32,
}

fn default_thumbnail_edge() -> u32 {
    512
}

/// Query parameters for region requests.
#[derive(Debug, Deserialize)]
pub struct RegionQueryParams {
    /// Left edge in level 0 pixels (default: 0)
    #[serde(default)]
    pub x: u64,

    /// Top edge in level 0 pixels (default: 0)
    #[serde(default)]
    pub y: u64,

    /// Native level (default: 0)
    #[serde(default)]
    pub level: usize,

    /// Width in level pixels (default: 512)
    #[serde(default = "default_region_edge")]
    pub w: u32,

    /// Height in level pixels (default: 512)
    #[serde(default = "default_region_edge")]
    pub h: u32,
}

fn default_region_edge() -> u32 {
    512
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "invalid_argument")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    pub status: u16,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

/// Response from the slides list endpoint.
#[derive(Debug, Serialize)]
pub struct SlidesResponse {
    pub slides: Vec<SlideEntry>,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// HTTP status and error identifier for an error kind.
pub fn status_for(kind: ErrorKind) -> (StatusCode, &'static str) {
    match kind {
        ErrorKind::NotFound => (StatusCode::NOT_FOUND, "not_found"),
        ErrorKind::OutOfRange => (StatusCode::NOT_FOUND, "out_of_range"),
        ErrorKind::InvalidArgument => (StatusCode::BAD_REQUEST, "invalid_argument"),
        ErrorKind::Decode => (StatusCode::INTERNAL_SERVER_ERROR, "decode_error"),
        ErrorKind::Analysis => (StatusCode::INTERNAL_SERVER_ERROR, "analysis_error"),
        ErrorKind::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    }
}

/// Build the JSON error response, logging by severity:
/// - 5xx errors at ERROR level
/// - 404s at DEBUG level (common and expected)
/// - other 4xx errors at WARN level
fn error_response(kind: ErrorKind, message: String) -> Response {
    let (status, error_type) = status_for(kind);

    if status.is_server_error() {
        error!(
            error_type = error_type,
            status = status.as_u16(),
            "Server error: {}",
            message
        );
    } else if status == StatusCode::NOT_FOUND {
        debug!(
            error_type = error_type,
            status = status.as_u16(),
            "Resource not found: {}",
            message
        );
    } else {
        warn!(
            error_type = error_type,
            status = status.as_u16(),
            "Client error: {}",
            message
        );
    }

    let body = ErrorResponse {
        error: error_type.to_string(),
        message,
        status: status.as_u16(),
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for SlideError {
    fn into_response(self) -> Response {
        error_response(self.kind(), self.to_string())
    }
}

impl IntoResponse for TileError {
    fn into_response(self) -> Response {
        error_response(self.kind(), self.to_string())
    }
}

impl IntoResponse for HeatmapError {
    fn into_response(self) -> Response {
        error_response(self.kind(), self.to_string())
    }
}

/// Encoded image with content type and caching headers.
fn jpeg_response(image: TileResponse, cache_max_age: u32) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/jpeg".to_string()),
            (
                header::CACHE_CONTROL,
                format!("public, max-age={}", cache_max_age),
            ),
            (QUALITY_HEADER, image.quality.to_string()),
        ],
        image.data,
    )
        .into_response()
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle slides list requests.
///
/// # Endpoint
///
/// `GET /api/slides`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "slides": [{ "slide_id": "sample.tiff", "size": 104857600 }]
/// }
/// ```
pub async fn slides_handler<S: SlideSource>(
    State(state): State<AppState<S>>,
) -> Result<Json<SlidesResponse>, TileError> {
    let slides = state.tile_service.list_slides().await?;
    Ok(Json(SlidesResponse { slides }))
}

/// Handle slide metadata requests.
///
/// # Endpoint
///
/// `GET /api/slide/{slide_id}/metadata`
///
/// # Errors
///
/// - `404 Not Found`: Slide not found
/// - `500 Internal Server Error`: Slide could not be decoded
pub async fn slide_metadata_handler<S: SlideSource>(
    State(state): State<AppState<S>>,
    Path(slide_id): Path<String>,
) -> Result<Json<SlideMetadata>, SlideError> {
    let metadata = state.tile_service.slide_metadata(&slide_id).await?;
    Ok(Json(metadata))
}

/// Handle thumbnail requests.
///
/// # Endpoint
///
/// `GET /api/slide/{slide_id}/thumbnail?width=512&height=512`
///
/// # Errors
///
/// - `400 Bad Request`: Zero width or height
/// - `404 Not Found`: Slide not found
pub async fn thumbnail_handler<S: SlideSource>(
    State(state): State<AppState<S>>,
    Path(slide_id): Path<String>,
    Query(query): Query<ThumbnailQueryParams>,
) -> Result<Response, TileError> {
    let image = state
        .tile_service
        .get_thumbnail(&slide_id, query.width, query.height)
        .await?;
    Ok(jpeg_response(image, state.cache_max_age))
}

/// Handle tile requests.
///
/// # Endpoint
///
/// `GET /api/slide/{slide_id}/tile/{level}/{col}/{row}.jpg`
///
/// The `.jpg` suffix is optional.
///
/// # Query Parameters
///
/// - `quality`: JPEG quality 1-100 (default: server setting)
///
/// # Response
///
/// - `200 OK`: JPEG tile image with `Content-Type: image/jpeg`
/// - `400 Bad Request`: Malformed row or quality
/// - `404 Not Found`: Slide not found, or tile outside the pyramid
/// - `500 Internal Server Error`: Processing error
pub async fn tile_handler<S: SlideSource>(
    State(state): State<AppState<S>>,
    Path(params): Path<TilePathParams>,
    Query(query): Query<TileQueryParams>,
) -> Result<Response, TileError> {
    // Parse row from filename (handles both "0" and "0.jpg")
    let row = params.row().map_err(|_| {
        TileError::invalid_region(format!("invalid tile row: {}", params.filename))
    })?;

    let request = TileRequest {
        slide_id: params.slide_id,
        level: params.level,
        col: params.col,
        row,
        quality: query.quality,
    };

    let image = state.tile_service.get_tile(request).await?;
    Ok(jpeg_response(image, state.cache_max_age))
}

/// Handle region requests.
///
/// # Endpoint
///
/// `GET /api/slide/{slide_id}/region?x=0&y=0&level=0&w=512&h=512`
///
/// `x` and `y` are level 0 coordinates; `w` and `h` are in pixels of the
/// requested native level.
///
/// # Errors
///
/// - `400 Bad Request`: Empty or oversized region, unknown level, or a
///   region entirely outside the image
/// - `404 Not Found`: Slide not found
pub async fn region_handler<S: SlideSource>(
    State(state): State<AppState<S>>,
    Path(slide_id): Path<String>,
    Query(query): Query<RegionQueryParams>,
) -> Result<Response, TileError> {
    let request = RegionRequest {
        slide_id,
        x: query.x,
        y: query.y,
        level: query.level,
        width: query.w,
        height: query.h,
    };

    let image = state.tile_service.get_region(request).await?;
    Ok(jpeg_response(image, state.cache_max_age))
}

/// Handle heatmap requests.
///
/// # Endpoint
///
/// `GET /api/slide/{slide_id}/heatmap`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "grid": [[0.0, 0.12, ...], ...],
///   "grid_dims": [32, 32],
///   "base_dims": [46920, 33600]
/// }
/// ```
///
/// # Errors
///
/// - `404 Not Found`: Slide not found
/// - `500 Internal Server Error`: Analysis failed
pub async fn heatmap_handler<S: SlideSource>(
    State(state): State<AppState<S>>,
    Path(slide_id): Path<String>,
) -> Result<Response, HeatmapError> {
    let heatmap = state.heatmap_service.compute_or_fetch(&slide_id).await?;
    Ok(Json(heatmap.as_ref()).into_response())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::NotFound).0, StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::OutOfRange).0, StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(ErrorKind::InvalidArgument).0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(ErrorKind::Decode).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(ErrorKind::Analysis).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_tile_error_to_status_code() {
        let err = TileError::from(SlideError::not_found("test.png"));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);

        let err = TileError::InvalidLevel {
            level: 5,
            level_count: 3,
        };
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);

        let err = TileError::TileOutOfBounds {
            level: 0,
            col: 100,
            row: 100,
            cols: 1,
            rows: 1,
        };
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);

        let err = TileError::invalid_region("zero width");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

        let err = TileError::InvalidQuality { quality: 0 };
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

        let err = TileError::from(SlideError::decode("bad marker"));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let err = TileError::EncodeError {
            message: "boom".to_string(),
        };
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_heatmap_error_to_status_code() {
        let err = HeatmapError::from(SlideError::not_found("test.png"));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);

        let err = HeatmapError::analysis("empty thumbnail");
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_response_serialization() {
        let response = ErrorResponse {
            error: "not_found".to_string(),
            message: "Slide not found: a.png".to_string(),
            status: 404,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["error"], "not_found");
        assert_eq!(json["status"], 404);
    }

    #[test]
    fn test_tile_path_row_parsing() {
        let params = |filename: &str| TilePathParams {
            slide_id: "a.png".to_string(),
            level: 0,
            col: 0,
            filename: filename.to_string(),
        };
        assert_eq!(params("3").row().unwrap(), 3);
        assert_eq!(params("3.jpg").row().unwrap(), 3);
        assert!(params("x.jpg").row().is_err());
        assert!(params("3.png").row().is_err());
    }
}
