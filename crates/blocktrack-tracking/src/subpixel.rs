//! Sub-pixel refinement of an integer match by per-axis parabolic fitting.

use glam::DVec2;

use crate::search::Candidate;

/// Fits a parabola through the scores at the best position and its two
/// neighbours on each axis, and returns the offset of the vertex.
///
/// Each component of the result lies in `(-0.5, 0.5]`. An axis stays at 0
/// when the best score is not a strict local minimum along it or the fit
/// is degenerate.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubpixelRefiner;

impl SubpixelRefiner {
    /// Refine `best`, scoring neighbours through `score_at(dx, dy)`, which
    /// evaluates the pattern at `best.position + (dx, dy)`.
    pub fn refine<F>(&self, best: &Candidate, mut score_at: F) -> DVec2
    where
        F: FnMut(i32, i32) -> f64,
    {
        if !best.is_found() {
            return DVec2::ZERO;
        }
        let s0 = best.score;
        let dx = vertex(score_at(-1, 0), s0, score_at(1, 0));
        let dy = vertex(score_at(0, -1), s0, score_at(0, 1));
        DVec2::new(dx, dy)
    }
}

/// Vertex offset of the parabola through `(-1, sm)`, `(0, s0)`, `(1, sp)`.
fn vertex(sm: f64, s0: f64, sp: f64) -> f64 {
    if !(s0 < sm && s0 <= sp) {
        return 0.0;
    }
    let denom = (s0 - sp) + (s0 - sm);
    if denom == 0.0 {
        return 0.0;
    }
    let d = 0.5 * (sp - sm) / denom;
    if !d.is_finite() {
        return 0.0;
    }
    if d <= -0.5 {
        // Keep within (-0.5, 0.5]
        -0.5 + f64::EPSILON
    } else {
        d.min(0.5)
    }
}
