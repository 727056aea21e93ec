//! Error types for blocktrack.

use std::fmt;

use thiserror::Error;

use crate::image::BitDepth;
use crate::Frame;

/// Which of the two images of a tracking step an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRole {
    Reference,
    Search,
}

impl fmt::Display for ImageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reference => f.write_str("reference"),
            Self::Search => f.write_str("search"),
        }
    }
}

/// Main error type for tracking operations.
#[derive(Error, Debug)]
pub enum TrackError {
    /// The pattern has no usable pixel: fully masked or outside the image.
    #[error("Empty pattern: nothing to track")]
    EmptyPattern,

    #[error("Image fetch failed: no {role} image at frame {frame}")]
    ImageFetch { frame: Frame, role: ImageRole },

    #[error("Format mismatch: reference is {reference}, search is {search}")]
    FormatMismatch {
        reference: ImageFormat,
        search: ImageFormat,
    },

    #[error("No trajectory keyframe to start from at frame {frame}")]
    NoReferenceCenter { frame: Frame },

    /// The search window does not overlap the search image.
    #[error("No match: search window lies outside the image at frame {frame}")]
    NoMatch { frame: Frame },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TrackError {
    /// Whether the error only invalidates the current frame.
    ///
    /// Recoverable errors become keyframe deletions inside a tracking
    /// session; everything else aborts the session.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::EmptyPattern
                | Self::ImageFetch { .. }
                | Self::NoReferenceCenter { .. }
                | Self::NoMatch { .. }
        )
    }
}

/// Bit depth and component count of an image, as compared between the
/// reference and search images of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageFormat {
    pub depth: BitDepth,
    pub components: usize,
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x{}", self.depth, self.components)
    }
}

/// Result type alias for tracking operations.
pub type Result<T> = std::result::Result<T, TrackError>;
