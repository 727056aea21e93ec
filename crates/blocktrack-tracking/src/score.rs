//! Patch dissimilarity metrics.
//!
//! All metrics share one patch-iteration loop and differ only in how the
//! per-pixel terms are aggregated. Lower scores are better. Sampling outside
//! the candidate image extends its border pixels instead of reading zeros.

use blocktrack_core::{ImageSampler, Pixel};
use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::pattern::Pattern;

/// Similarity metric used to compare the pattern with a candidate window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreKind {
    /// Sum of squared differences
    #[default]
    Ssd,
    /// Sum of absolute differences
    Sad,
    /// Normalized cross-correlation
    Ncc,
    /// Zero-mean normalized cross-correlation
    Zncc,
}

impl ScoreKind {
    pub const ALL: [Self; 4] = [Self::Ssd, Self::Sad, Self::Ncc, Self::Zncc];

    pub fn name(self) -> &'static str {
        match self {
            Self::Ssd => "SSD",
            Self::Sad => "SAD",
            Self::Ncc => "NCC",
            Self::Zncc => "ZNCC",
        }
    }
}

/// A metric specialised at compile time, so the hot loop is monomorphised
/// once per kind instead of branching per pixel.
pub trait Metric {
    const KIND: ScoreKind;

    /// Score the pattern against `other` with the pattern center at `at`.
    fn score<S: ImageSampler + ?Sized>(pattern: &Pattern, other: &S, at: IVec2) -> f64;
}

pub struct Ssd;
pub struct Sad;
pub struct Ncc;
pub struct Zncc;

/// Score with a metric chosen at runtime.
pub fn score<S: ImageSampler + ?Sized>(
    kind: ScoreKind,
    pattern: &Pattern,
    other: &S,
    at: IVec2,
) -> f64 {
    match kind {
        ScoreKind::Ssd => Ssd::score(pattern, other, at),
        ScoreKind::Sad => Sad::score(pattern, other, at),
        ScoreKind::Ncc => Ncc::score(pattern, other, at),
        ScoreKind::Zncc => Zncc::score(pattern, other, at),
    }
}

/// Walk the weighted pattern pixels together with the matching pixels of
/// `other`, clamping coordinates into `other`'s bounds.
///
/// Returns `false` when `other` has no defined pixel at all.
#[inline(always)]
fn for_each_pair<S, F>(pattern: &Pattern, other: &S, at: IVec2, mut f: F) -> bool
where
    S: ImageSampler + ?Sized,
    F: FnMut(f64, &Pixel, &Pixel),
{
    let bounds = other.bounds();
    if bounds.is_empty() {
        return false;
    }
    pattern.for_each_texel(|dx, dy, reference, weight| {
        if let Some((x, y)) = bounds.clamp(at.x + dx, at.y + dy) {
            if let Some(candidate) = other.sample(x, y) {
                f(weight, reference, &candidate);
            }
        }
    });
    true
}

#[inline]
fn channels<S: ImageSampler + ?Sized>(pattern: &Pattern, other: &S) -> usize {
    pattern.components().min(other.scored_components())
}

impl Metric for Ssd {
    const KIND: ScoreKind = ScoreKind::Ssd;

    fn score<S: ImageSampler + ?Sized>(pattern: &Pattern, other: &S, at: IVec2) -> f64 {
        let n = channels(pattern, other);
        let mut sum = 0.0;
        // Weight is applied squared, unlike the other metrics.
        let sampled = for_each_pair(pattern, other, at, |w, r, o| {
            let mut d2 = 0.0;
            for c in 0..n {
                let d = (r[c] - o[c]) as f64;
                d2 += d * d;
            }
            sum += w * w * d2;
        });
        if sampled {
            sum
        } else {
            f64::INFINITY
        }
    }
}

impl Metric for Sad {
    const KIND: ScoreKind = ScoreKind::Sad;

    fn score<S: ImageSampler + ?Sized>(pattern: &Pattern, other: &S, at: IVec2) -> f64 {
        let n = channels(pattern, other);
        let mut sum = 0.0;
        let sampled = for_each_pair(pattern, other, at, |w, r, o| {
            let mut d = 0.0;
            for c in 0..n {
                d += ((r[c] - o[c]) as f64).abs();
            }
            sum += w * d;
        });
        if sampled {
            sum
        } else {
            f64::INFINITY
        }
    }
}

impl Metric for Ncc {
    const KIND: ScoreKind = ScoreKind::Ncc;

    fn score<S: ImageSampler + ?Sized>(pattern: &Pattern, other: &S, at: IVec2) -> f64 {
        let n = channels(pattern, other);
        let mut cross = 0.0;
        let mut energy = 0.0;
        for_each_pair(pattern, other, at, |w, r, o| {
            for c in 0..n {
                let (rv, ov) = (r[c] as f64, o[c] as f64);
                cross += w * -(rv * ov);
                energy += w * ov * ov;
            }
        });
        normalize(cross, energy)
    }
}

impl Metric for Zncc {
    const KIND: ScoreKind = ScoreKind::Zncc;

    fn score<S: ImageSampler + ?Sized>(pattern: &Pattern, other: &S, at: IVec2) -> f64 {
        let n = channels(pattern, other);
        let ref_mean = pattern.means();

        let mut weight_sum = 0.0;
        let mut sums = [0.0f64; 3];
        for_each_pair(pattern, other, at, |w, _, o| {
            weight_sum += w;
            for c in 0..n {
                sums[c] += w * o[c] as f64;
            }
        });
        if weight_sum <= 0.0 {
            return f64::INFINITY;
        }
        let other_mean = sums.map(|s| s / weight_sum);

        let mut cross = 0.0;
        let mut energy = 0.0;
        for_each_pair(pattern, other, at, |w, r, o| {
            for c in 0..n {
                let rv = r[c] as f64 - ref_mean[c];
                let ov = o[c] as f64 - other_mean[c];
                cross += w * -(rv * ov);
                energy += w * ov * ov;
            }
        });
        normalize(cross, energy)
    }
}

/// Divide a correlation sum by the candidate's weighted energy.
#[inline]
fn normalize(cross: f64, energy: f64) -> f64 {
    let denom = energy.max(0.0).sqrt();
    if denom == 0.0 {
        f64::INFINITY
    } else {
        cross / denom
    }
}
