//! Read-only pixel access for tracking.
//!
//! Hosts expose their images through [`ImageSampler`]; [`PixelImage`] is the
//! owned in-memory implementation used by the command-line tool and tests.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ImageFormat;
use crate::geometry::IRect;

/// Channel values of one pixel. Unused trailing components are zero.
pub type Pixel = [f32; 4];

/// Only color channels take part in scoring; a fourth (alpha) channel never does.
pub const MAX_SCORED_COMPONENTS: usize = 3;

/// Storage bit depth of the host image the samples came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BitDepth {
    /// 8-bit unsigned, values in [0, 255]
    #[default]
    U8,
    /// 16-bit unsigned, values in [0, 65535]
    U16,
    /// 32-bit float, nominal range [0, 1]
    F32,
}

impl BitDepth {
    /// Channel value corresponding to full intensity.
    pub fn max_value(self) -> f32 {
        match self {
            Self::U8 => 255.0,
            Self::U16 => 65535.0,
            Self::F32 => 1.0,
        }
    }
}

impl fmt::Display for BitDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::U8 => f.write_str("8-bit"),
            Self::U16 => f.write_str("16-bit"),
            Self::F32 => f.write_str("float"),
        }
    }
}

/// Random access to pixel channel values by integer coordinate.
///
/// `sample` returns `None` wherever the image is undefined, which always
/// includes every position outside [`ImageSampler::bounds`].
pub trait ImageSampler: Send + Sync {
    /// Pixel rectangle over which the image is defined.
    fn bounds(&self) -> IRect;

    /// Number of channels per pixel (1 to 4).
    fn components(&self) -> usize;

    fn bit_depth(&self) -> BitDepth;

    /// Width of a pixel relative to its height.
    fn pixel_aspect_ratio(&self) -> f64 {
        1.0
    }

    fn sample(&self, x: i32, y: i32) -> Option<Pixel>;

    /// Bit depth and component count, compared between paired images.
    fn format(&self) -> ImageFormat {
        ImageFormat {
            depth: self.bit_depth(),
            components: self.components(),
        }
    }

    /// Number of leading channels compared when scoring.
    fn scored_components(&self) -> usize {
        self.components().min(MAX_SCORED_COMPONENTS)
    }
}

impl<T: ImageSampler + ?Sized> ImageSampler for &T {
    fn bounds(&self) -> IRect {
        (**self).bounds()
    }
    fn components(&self) -> usize {
        (**self).components()
    }
    fn bit_depth(&self) -> BitDepth {
        (**self).bit_depth()
    }
    fn pixel_aspect_ratio(&self) -> f64 {
        (**self).pixel_aspect_ratio()
    }
    fn sample(&self, x: i32, y: i32) -> Option<Pixel> {
        (**self).sample(x, y)
    }
}

impl<T: ImageSampler + ?Sized> ImageSampler for Arc<T> {
    fn bounds(&self) -> IRect {
        (**self).bounds()
    }
    fn components(&self) -> usize {
        (**self).components()
    }
    fn bit_depth(&self) -> BitDepth {
        (**self).bit_depth()
    }
    fn pixel_aspect_ratio(&self) -> f64 {
        (**self).pixel_aspect_ratio()
    }
    fn sample(&self, x: i32, y: i32) -> Option<Pixel> {
        (**self).sample(x, y)
    }
}

/// An owned image with interleaved `f32` channels in row-major order.
///
/// Values keep the scale of their bit depth (0-255 for `U8`, and so on).
#[derive(Debug, Clone)]
pub struct PixelImage {
    pub data: Vec<f32>,
    pub bounds: IRect,
    pub components: usize,
    pub depth: BitDepth,
    pub pixel_aspect_ratio: f64,
}

impl PixelImage {
    /// Create a zero-filled image over `bounds`.
    pub fn new(bounds: IRect, components: usize, depth: BitDepth) -> Self {
        let components = components.clamp(1, 4);
        Self {
            data: vec![0.0; bounds.area() * components],
            bounds,
            components,
            depth,
            pixel_aspect_ratio: 1.0,
        }
    }

    /// Create an image by evaluating `f` at every pixel.
    pub fn from_fn<F>(bounds: IRect, components: usize, depth: BitDepth, mut f: F) -> Self
    where
        F: FnMut(i32, i32) -> Pixel,
    {
        let mut img = Self::new(bounds, components, depth);
        for y in bounds.y1..bounds.y2 {
            for x in bounds.x1..bounds.x2 {
                img.set(x, y, f(x, y));
            }
        }
        img
    }

    /// Set the pixel aspect ratio reported to the tracker.
    pub fn with_pixel_aspect_ratio(mut self, par: f64) -> Self {
        self.pixel_aspect_ratio = par;
        self
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if !self.bounds.contains(x, y) {
            return None;
        }
        let row = (y - self.bounds.y1) as usize;
        let col = (x - self.bounds.x1) as usize;
        Some((row * self.bounds.width() as usize + col) * self.components)
    }

    /// Write a pixel; out-of-bounds writes are ignored.
    #[inline]
    pub fn set(&mut self, x: i32, y: i32, value: Pixel) {
        if let Some(i) = self.index(x, y) {
            let n = self.components;
            self.data[i..i + n].copy_from_slice(&value[..n]);
        }
    }

    /// Apply `f` to every channel value.
    pub fn map_values<F: Fn(f32) -> f32>(&self, f: F) -> Self {
        Self {
            data: self.data.iter().map(|&v| f(v)).collect(),
            bounds: self.bounds,
            components: self.components,
            depth: self.depth,
            pixel_aspect_ratio: self.pixel_aspect_ratio,
        }
    }

    /// Copy of this image shifted by an integer translation.
    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        let mut out = Self::new(self.bounds, self.components, self.depth);
        out.pixel_aspect_ratio = self.pixel_aspect_ratio;
        let b = self.bounds;
        for y in b.y1..b.y2 {
            for x in b.x1..b.x2 {
                if let Some((sx, sy)) = b.clamp(x - dx, y - dy) {
                    if let Some(p) = self.sample(sx, sy) {
                        out.set(x, y, p);
                    }
                }
            }
        }
        out
    }
}

impl ImageSampler for PixelImage {
    fn bounds(&self) -> IRect {
        self.bounds
    }

    fn components(&self) -> usize {
        self.components
    }

    fn bit_depth(&self) -> BitDepth {
        self.depth
    }

    fn pixel_aspect_ratio(&self) -> f64 {
        self.pixel_aspect_ratio
    }

    #[inline]
    fn sample(&self, x: i32, y: i32) -> Option<Pixel> {
        let i = self.index(x, y)?;
        let mut px = [0.0; 4];
        px[..self.components].copy_from_slice(&self.data[i..i + self.components]);
        Some(px)
    }
}
