//! Parallel exhaustive search for the best-matching pattern position.
//!
//! The search window is split into row blocks that run on a bounded worker
//! pool. Each worker keeps a local best and merges it into a shared
//! [`ReductionCell`] once its block is done. Ties between workers resolve in
//! whatever order the workers finish, so equal-score positions are not
//! chosen deterministically.

use blocktrack_core::{IRect, ImageSampler, Result, TrackError};
use glam::{DVec2, IVec2};
use rayon::prelude::*;
use tracing::trace;

use crate::config::EngineConfig;
use crate::host::CancellationToken;
use crate::pattern::Pattern;
use crate::reduce::ReductionCell;
use crate::score::{Metric, Ncc, Sad, ScoreKind, Ssd, Zncc};

/// A scored integer position of the pattern center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub position: IVec2,
    pub score: f64,
}

impl Candidate {
    /// Placeholder for "nothing evaluated yet"; loses against any finite score.
    pub const NONE: Self = Self {
        position: IVec2::ZERO,
        score: f64::INFINITY,
    };

    #[inline]
    pub fn new(position: IVec2, score: f64) -> Self {
        Self { position, score }
    }

    /// Whether a real position was scored.
    pub fn is_found(&self) -> bool {
        self.score.is_finite()
    }

    /// Reduction cell keeping the lowest score, replacing only on strict `<`.
    pub fn lowest_score_cell() -> ReductionCell<Self, fn(&Self, &Self) -> bool> {
        ReductionCell::new(Self::NONE, |a, b| a.score < b.score)
    }
}

/// Outcome of one search: the best integer match and, when refinement ran,
/// its fractional correction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackResult {
    pub best: Candidate,
    pub correction: Option<DVec2>,
}

impl TrackResult {
    /// Matched pattern center in pixel coordinates.
    pub fn position(&self) -> DVec2 {
        self.best.position.as_dvec2() + self.correction.unwrap_or(DVec2::ZERO)
    }
}

/// Runs the exhaustive search on a dedicated worker pool.
pub struct SearchReducer {
    pool: rayon::ThreadPool,
    rows_per_task: usize,
}

impl SearchReducer {
    /// Build the worker pool described by `config`.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.thread_count())
            .thread_name(|i| format!("blocktrack-search-{i}"))
            .build()
            .map_err(|e| TrackError::Internal(format!("Failed to build search pool: {e}")))?;
        Ok(Self {
            pool,
            rows_per_task: config.rows_per_task.max(1),
        })
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Find the lowest-scoring pattern center inside `window`.
    ///
    /// `window` holds candidate center positions and is clipped to the
    /// bounds of `other`. Returns [`Candidate::NONE`] if nothing was scored,
    /// either because the window is empty or because cancellation arrived
    /// before any row finished.
    pub fn reduce<S>(
        &self,
        pattern: &Pattern,
        other: &S,
        window: IRect,
        kind: ScoreKind,
        cancel: &dyn CancellationToken,
    ) -> Candidate
    where
        S: ImageSampler + ?Sized,
    {
        match kind {
            ScoreKind::Ssd => self.reduce_with::<Ssd, S>(pattern, other, window, cancel),
            ScoreKind::Sad => self.reduce_with::<Sad, S>(pattern, other, window, cancel),
            ScoreKind::Ncc => self.reduce_with::<Ncc, S>(pattern, other, window, cancel),
            ScoreKind::Zncc => self.reduce_with::<Zncc, S>(pattern, other, window, cancel),
        }
    }

    fn reduce_with<M, S>(
        &self,
        pattern: &Pattern,
        other: &S,
        window: IRect,
        cancel: &dyn CancellationToken,
    ) -> Candidate
    where
        M: Metric,
        S: ImageSampler + ?Sized,
    {
        let window = window.intersect(other.bounds());
        if window.is_empty() {
            return Candidate::NONE;
        }

        // Bounded by the window height, so the row arithmetic stays in i32
        let rows_per_task = i32::try_from(self.rows_per_task)
            .unwrap_or(i32::MAX)
            .clamp(1, window.height());
        let blocks = (window.height() as usize).div_ceil(rows_per_task as usize);
        let best = Candidate::lowest_score_cell();

        self.pool.install(|| {
            (0..blocks).into_par_iter().for_each(|block| {
                let y_start = window.y1.saturating_add(block as i32 * rows_per_task);
                let y_end = y_start.saturating_add(rows_per_task).min(window.y2);
                let mut local = Candidate::NONE;
                for y in y_start..y_end {
                    if cancel.is_requested() {
                        break;
                    }
                    for x in window.x1..window.x2 {
                        let position = IVec2::new(x, y);
                        let score = M::score(pattern, other, position);
                        if score < local.score {
                            local = Candidate::new(position, score);
                        }
                    }
                }
                if local.is_found() {
                    best.offer(local);
                }
            });
        });

        let best = best.into_inner();
        trace!(
            metric = M::KIND.name(),
            positions = window.area(),
            x = best.position.x,
            y = best.position.y,
            score = best.score,
            "Search reduced"
        );
        best
    }
}
