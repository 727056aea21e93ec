//! Geometric primitives in canonical and pixel coordinates.
//!
//! Canonical coordinates are the host's resolution-independent space; pixel
//! coordinates differ only by the pixel aspect ratio on the x axis.

use glam::{DVec2, IVec2};
use serde::{Deserialize, Serialize};

/// 2D point in floating coordinates, used for centers and offsets.
pub type Point = DVec2;

/// Convert a canonical point to pixel coordinates.
#[inline]
pub fn canonical_to_pixel(p: Point, pixel_aspect_ratio: f64) -> Point {
    Point::new(p.x / pixel_aspect_ratio, p.y)
}

/// Convert a pixel point to canonical coordinates.
#[inline]
pub fn pixel_to_canonical(p: Point, pixel_aspect_ratio: f64) -> Point {
    Point::new(p.x * pixel_aspect_ratio, p.y)
}

/// Floating axis-aligned rectangle given by its corners.
///
/// Both edges are inclusive when the rectangle is used as a pixel footprint
/// (see [`Rect::pixel_span`]), so only `x2 < x1` or `y2 < y1` is empty and a
/// zero-size box still covers one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Rect {
    #[inline]
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Rectangle centered on the origin with the given half extents.
    pub fn centered(half_width: f64, half_height: f64) -> Self {
        Self::new(-half_width, -half_height, half_width, half_height)
    }

    #[inline]
    pub fn width(self) -> f64 {
        self.x2 - self.x1
    }

    #[inline]
    pub fn height(self) -> f64 {
        self.y2 - self.y1
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.x2 < self.x1 || self.y2 < self.y1
    }

    /// Whether `other` lies entirely inside this rectangle.
    pub fn contains_rect(self, other: Self) -> bool {
        other.x1 >= self.x1 && other.y1 >= self.y1 && other.x2 <= self.x2 && other.y2 <= self.y2
    }

    /// Translate by a vector.
    #[inline]
    pub fn offset(self, by: Point) -> Self {
        Self::new(self.x1 + by.x, self.y1 + by.y, self.x2 + by.x, self.y2 + by.y)
    }

    /// Convert a canonical rectangle to pixel coordinates.
    pub fn to_pixel(self, pixel_aspect_ratio: f64) -> Self {
        Self::new(
            self.x1 / pixel_aspect_ratio,
            self.y1,
            self.x2 / pixel_aspect_ratio,
            self.y2,
        )
    }

    /// Pixels covered by this box, both edges inclusive.
    ///
    /// A box centered on the origin yields a footprint symmetric about pixel
    /// `(0, 0)`: `centered(3.0, 2.0)` covers columns `-3..=3` and rows `-2..=2`.
    /// Coordinates beyond the `i32` range saturate.
    pub fn pixel_span(self) -> IRect {
        IRect::new(
            self.x1.floor() as i32,
            self.y1.floor() as i32,
            (self.x2.ceil() as i32).saturating_add(1),
            (self.y2.ceil() as i32).saturating_add(1),
        )
    }
}

/// Integer pixel rectangle, half-open: `x1 <= x < x2`, `y1 <= y < y2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct IRect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl IRect {
    #[inline]
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Rectangle covering a `width` x `height` image anchored at the origin.
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width as i32, height as i32)
    }

    #[inline]
    pub fn width(self) -> i32 {
        self.x2.saturating_sub(self.x1).max(0)
    }

    #[inline]
    pub fn height(self) -> i32 {
        self.y2.saturating_sub(self.y1).max(0)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.x2 <= self.x1 || self.y2 <= self.y1
    }

    /// Number of pixels covered.
    pub fn area(self) -> usize {
        self.width() as usize * self.height() as usize
    }

    #[inline]
    pub fn contains(self, x: i32, y: i32) -> bool {
        x >= self.x1 && x < self.x2 && y >= self.y1 && y < self.y2
    }

    /// Intersection with another rectangle; empty rectangles are kept as-is
    /// so callers can test `is_empty()`.
    pub fn intersect(self, other: Self) -> Self {
        Self::new(
            self.x1.max(other.x1),
            self.y1.max(other.y1),
            self.x2.min(other.x2),
            self.y2.min(other.y2),
        )
    }

    /// Translate by an integer vector, saturating at the `i32` range.
    #[inline]
    pub fn offset(self, by: IVec2) -> Self {
        Self::new(
            self.x1.saturating_add(by.x),
            self.y1.saturating_add(by.y),
            self.x2.saturating_add(by.x),
            self.y2.saturating_add(by.y),
        )
    }

    /// Clamp a coordinate to the nearest pixel inside the rectangle.
    ///
    /// Returns `None` for an empty rectangle.
    #[inline]
    pub fn clamp(self, x: i32, y: i32) -> Option<(i32, i32)> {
        if self.is_empty() {
            return None;
        }
        Some((x.clamp(self.x1, self.x2 - 1), y.clamp(self.y1, self.y2 - 1)))
    }
}
