//! Reference patch extraction.
//!
//! A [`Pattern`] holds the reference pixels around a tracked center together
//! with a per-pixel confidence weight. Pixels that are undefined in the
//! reference image, or masked out, get weight 0 and never influence a score.

use blocktrack_core::{IRect, ImageSampler, Pixel, Point, Rect, Result, TrackError};
use glam::IVec2;

/// Immutable reference patch, sampled relative to its own integer center.
#[derive(Debug, Clone)]
pub struct Pattern {
    center: IVec2,
    /// Footprint relative to `center`, already clipped to the reference bounds.
    rect: IRect,
    samples: Vec<Pixel>,
    weights: Vec<f32>,
    total_weight: f64,
    components: usize,
    means: [f64; 3],
}

impl Pattern {
    /// Extract the patch covering `pattern_rect` (relative to `center`) from
    /// `reference`, optionally weighted by `mask`.
    ///
    /// Both edges of `pattern_rect` are inclusive, so a centered box gives a
    /// footprint symmetric about the center pixel. `center` is rounded to the
    /// nearest pixel. Fails with [`TrackError::EmptyPattern`] when the
    /// footprint misses the image or every pixel ends up with zero weight.
    pub fn extract<R>(
        reference: &R,
        center: Point,
        pattern_rect: Rect,
        mask: Option<&dyn ImageSampler>,
    ) -> Result<Self>
    where
        R: ImageSampler + ?Sized,
    {
        let center = center.round().as_ivec2();
        let absolute = pattern_rect
            .pixel_span()
            .offset(center)
            .intersect(reference.bounds());
        if absolute.is_empty() {
            return Err(TrackError::EmptyPattern);
        }

        let components = reference.scored_components();
        let mask_scale = mask.map(|m| 1.0 / m.bit_depth().max_value());
        let mut samples = Vec::with_capacity(absolute.area());
        let mut weights = Vec::with_capacity(absolute.area());
        let mut total_weight = 0.0f64;
        let mut sums = [0.0f64; 3];

        for y in absolute.y1..absolute.y2 {
            for x in absolute.x1..absolute.x2 {
                let (sample, weight) = match reference.sample(x, y) {
                    None => ([0.0; 4], 0.0),
                    Some(px) => {
                        let weight = match (mask, mask_scale) {
                            (Some(m), Some(scale)) => m
                                .sample(x, y)
                                .map(|mp| mask_weight(&mp, m.components(), scale))
                                .unwrap_or(0.0),
                            _ => 1.0,
                        };
                        (px, weight)
                    }
                };
                total_weight += weight as f64;
                for (c, sum) in sums.iter_mut().enumerate().take(components) {
                    *sum += weight as f64 * sample[c] as f64;
                }
                samples.push(sample);
                weights.push(weight);
            }
        }

        if total_weight <= 0.0 {
            return Err(TrackError::EmptyPattern);
        }

        Ok(Self {
            center,
            rect: absolute.offset(-center),
            samples,
            weights,
            total_weight,
            components,
            means: sums.map(|s| s / total_weight),
        })
    }

    /// Integer pixel center the pattern was extracted around.
    pub fn center(&self) -> IVec2 {
        self.center
    }

    /// Footprint relative to the center.
    pub fn rect(&self) -> IRect {
        self.rect
    }

    /// Row-major samples over [`Pattern::rect`].
    pub fn samples(&self) -> &[Pixel] {
        &self.samples
    }

    /// Row-major weights in [0, 1], parallel to [`Pattern::samples`].
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Number of leading channels that take part in scoring.
    pub fn components(&self) -> usize {
        self.components
    }

    /// Weighted per-channel means of the samples.
    pub fn means(&self) -> [f64; 3] {
        self.means
    }

    /// Visit every pixel with a non-zero weight as `(dx, dy, sample, weight)`,
    /// in row-major order.
    #[inline]
    pub fn for_each_texel<F>(&self, mut f: F)
    where
        F: FnMut(i32, i32, &Pixel, f64),
    {
        let width = self.rect.width() as usize;
        for (row, (samples, weights)) in self
            .samples
            .chunks_exact(width)
            .zip(self.weights.chunks_exact(width))
            .enumerate()
        {
            let dy = self.rect.y1 + row as i32;
            for (col, (sample, &weight)) in samples.iter().zip(weights).enumerate() {
                if weight > 0.0 {
                    f(self.rect.x1 + col as i32, dy, sample, weight as f64);
                }
            }
        }
    }
}

/// Mask confidence normalized to [0, 1]: alpha for gray-alpha and RGBA masks,
/// channel 0 for everything else.
#[inline]
fn mask_weight(px: &Pixel, components: usize, scale: f32) -> f32 {
    let channel = match components {
        2 => 1,
        4 => 3,
        _ => 0,
    };
    (px[channel] * scale).clamp(0.0, 1.0)
}
