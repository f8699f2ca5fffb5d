//! Integration tests for the WSI viewer.
//!
//! These tests verify end-to-end functionality including:
//! - Slide listing and metadata
//! - Deep-zoom tile geometry as seen over HTTP
//! - Thumbnails and regions, with their error cases
//! - Heatmap computation and caching
//! - Slide sharing between the tile and heatmap services

mod integration {
    pub mod test_utils;

    pub mod api_tests;
    pub mod cache_tests;
    pub mod heatmap_tests;
    pub mod pyramid_tests;
}
