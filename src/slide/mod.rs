//! Slide abstraction layer.
//!
//! This module provides a unified interface for working with Whole Slide Images
//! regardless of their underlying format.
//!
//! # Architecture
//!
//! The slide abstraction layer sits between the image decoders and the
//! tile and heatmap services:
//!
//! ```text
//! ┌──────────────────┐   ┌──────────────────┐
//! │   TileService    │   │  HeatmapService  │
//! └────────┬─────────┘   └────────┬─────────┘
//!          └───────────┬──────────┘
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            SlideRegistry                │
//! │  (single-flight open, caches slides)    │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │       SlideSource / SlideReader         │
//! │  (format-agnostic slide interface)      │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//!          ┌───────────────────────┐
//!          │   LocalSlideSource    │
//!          │   (RasterSlide files) │
//!          └───────────────────────┘
//! ```

mod local;
mod reader;
mod registry;
mod source;

pub use local::{is_supported, LocalSlideSource, RasterSlide, SUPPORTED_EXTENSIONS};
pub use reader::{
    composite, fit_within, SlideProperties, SlideReader, BACKGROUND, PROPERTY_MPP_X,
    PROPERTY_MPP_Y, PROPERTY_OBJECTIVE_POWER, PROPERTY_VENDOR,
};
pub use registry::{CachedSlide, SlideRegistry};
pub use source::{SlideEntry, SlideSource};
