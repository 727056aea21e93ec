//! Blocktrack Core - Foundation types for block-matching point tracking
//!
//! This crate provides the types shared by the tracking engine and its hosts:
//! - Canonical and pixel geometry (Point, Rect, IRect)
//! - Read-only pixel access through the `ImageSampler` trait
//! - CIE L*a*b* conversion for perceptual matching
//! - The tracking error taxonomy

pub mod color;
pub mod error;
pub mod geometry;
pub mod image;

pub use color::{srgb_to_lab, LabSampler};
pub use error::{ImageFormat, ImageRole, Result, TrackError};
pub use geometry::{canonical_to_pixel, pixel_to_canonical, IRect, Point, Rect};
pub use image::{BitDepth, ImageSampler, Pixel, PixelImage, MAX_SCORED_COMPONENTS};

/// Frame index on the host timeline.
pub type Frame = i64;
