//! CIE L*a*b* conversion for perceptual matching.
//!
//! Differences in Lab space track perceived color differences more closely
//! than RGB differences, which makes the tracker less sensitive to noise in
//! dark regions. Input is assumed to be sRGB encoded with a D65 white point.
#![allow(clippy::excessive_precision)]

use crate::geometry::IRect;
use crate::image::{BitDepth, ImageSampler, Pixel};

/// sRGB (D65) to XYZ matrix.
const SRGB_TO_XYZ: [[f32; 3]; 3] = [
    [0.4124564, 0.3575761, 0.1804375],
    [0.2126729, 0.7151522, 0.0721750],
    [0.0193339, 0.1191920, 0.9503041],
];

/// D65 reference white in XYZ.
const WHITE_D65: [f32; 3] = [0.95047, 1.0, 1.08883];

const LAB_EPSILON: f32 = 216.0 / 24389.0;
const LAB_KAPPA: f32 = 24389.0 / 27.0;

/// Decode an sRGB-encoded value to linear light.
#[inline]
fn srgb_to_linear(v: f32) -> f32 {
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

#[inline]
fn lab_f(t: f32) -> f32 {
    if t > LAB_EPSILON {
        t.cbrt()
    } else {
        (LAB_KAPPA * t + 16.0) / 116.0
    }
}

/// Convert a normalized sRGB triplet to (L*, a*, b*).
///
/// L* is in [0, 100] for in-gamut input.
pub fn srgb_to_lab(rgb: [f32; 3]) -> [f32; 3] {
    let lin = rgb.map(srgb_to_linear);
    let m = &SRGB_TO_XYZ;
    let xyz = [
        m[0][0] * lin[0] + m[0][1] * lin[1] + m[0][2] * lin[2],
        m[1][0] * lin[0] + m[1][1] * lin[1] + m[1][2] * lin[2],
        m[2][0] * lin[0] + m[2][1] * lin[1] + m[2][2] * lin[2],
    ];
    let fx = lab_f(xyz[0] / WHITE_D65[0]);
    let fy = lab_f(xyz[1] / WHITE_D65[1]);
    let fz = lab_f(xyz[2] / WHITE_D65[2]);
    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

/// Sampler adapter that converts every sample to L*a*b*.
///
/// Single-channel images are treated as gray (R = G = B). The alpha channel,
/// if any, is passed through normalized to [0, 1].
#[derive(Debug, Clone, Copy)]
pub struct LabSampler<S> {
    inner: S,
}

impl<S: ImageSampler> LabSampler<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: ImageSampler> ImageSampler for LabSampler<S> {
    fn bounds(&self) -> IRect {
        self.inner.bounds()
    }

    fn components(&self) -> usize {
        self.inner.components()
    }

    fn bit_depth(&self) -> BitDepth {
        self.inner.bit_depth()
    }

    fn pixel_aspect_ratio(&self) -> f64 {
        self.inner.pixel_aspect_ratio()
    }

    fn sample(&self, x: i32, y: i32) -> Option<Pixel> {
        let px = self.inner.sample(x, y)?;
        let scale = 1.0 / self.inner.bit_depth().max_value();
        let rgb = match self.inner.components() {
            1 | 2 => [px[0] * scale; 3],
            _ => [px[0] * scale, px[1] * scale, px[2] * scale],
        };
        let [l, a, b] = srgb_to_lab(rgb);
        let alpha = match self.inner.components() {
            4 => px[3] * scale,
            _ => 0.0,
        };
        Some([l, a, b, alpha])
    }
}
