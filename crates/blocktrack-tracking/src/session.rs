//! Tracking session: steps a point through a frame range.
//!
//! Steps run strictly in sequence because each one starts from the center
//! the previous step wrote. Per-frame failures leave a gap in the trajectory
//! and the session moves on; a format mismatch between paired images aborts
//! the whole session.

use blocktrack_core::{
    canonical_to_pixel, pixel_to_canonical, Frame, IRect, ImageRole, ImageSampler, LabSampler,
    Point, Result, TrackError,
};
use glam::IVec2;
use tracing::{debug, error, info, warn};

use crate::host::{CancellationToken, ImageProvider, NoProgress, ProgressSink};
use crate::params::{ParameterStore, TrackColorSpace};
use crate::pattern::Pattern;
use crate::score;
use crate::search::{SearchReducer, TrackResult};
use crate::subpixel::SubpixelRefiner;
use crate::trajectory::TrajectoryStore;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// Tracking into `frame`.
    Stepping { frame: Frame },
    /// Reached the last frame of the range.
    Done,
    /// Stopped early by the caller; written keyframes are kept.
    Cancelled,
    /// Aborted on a host contract violation.
    Fatal,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled | Self::Fatal)
    }
}

/// Direction of travel through the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackDirection {
    Forward,
    Backward,
}

impl TrackDirection {
    /// Forward when `last >= first`.
    pub fn between(first: Frame, last: Frame) -> Self {
        if last >= first {
            Self::Forward
        } else {
            Self::Backward
        }
    }

    /// Frame increment of one step.
    pub fn step(self) -> Frame {
        match self {
            Self::Forward => 1,
            Self::Backward => -1,
        }
    }
}

/// Summary of a finished (or stopped) session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOutcome {
    pub state: SessionState,
    /// Keyframes written.
    pub tracked: usize,
    /// Frames whose keyframe was deleted after a per-frame failure.
    pub lost: usize,
}

/// Result of one step that ran to completion.
enum StepOutcome {
    Matched { center: Point, score: f64 },
    /// Cancellation arrived during the search; nothing is written.
    Interrupted,
}

/// Drives tracking of one point over frame ranges.
pub struct TrackSession<P> {
    params: P,
    reducer: SearchReducer,
    refiner: SubpixelRefiner,
    state: SessionState,
}

impl<P: ParameterStore> TrackSession<P> {
    pub fn new(params: P, reducer: SearchReducer) -> Self {
        Self {
            params,
            reducer,
            refiner: SubpixelRefiner,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn params(&self) -> &P {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut P {
        &mut self.params
    }

    /// Track from `first` to `last`, writing a keyframe at every frame after
    /// `first`. Runs backward when `last < first`.
    ///
    /// Returns `Err` only for fatal errors; per-frame failures show up as
    /// deleted keyframes and in [`SessionOutcome::lost`].
    pub fn track_range<I, T>(
        &mut self,
        provider: &I,
        trajectory: &mut T,
        first: Frame,
        last: Frame,
        progress: &mut dyn ProgressSink,
        cancel: &dyn CancellationToken,
    ) -> Result<SessionOutcome>
    where
        I: ImageProvider + ?Sized,
        T: TrajectoryStore + ?Sized,
    {
        let direction = TrackDirection::between(first, last);
        let total = first.abs_diff(last);
        let mut outcome = SessionOutcome {
            state: SessionState::Idle,
            tracked: 0,
            lost: 0,
        };
        self.state = SessionState::Idle;
        info!(first, last, direction = ?direction, "Tracking session started");

        let mut t = first;
        let mut completed = 0u64;
        while t != last {
            if cancel.is_requested() {
                self.state = SessionState::Cancelled;
                break;
            }
            let next = t + direction.step();
            self.state = SessionState::Stepping { frame: next };

            match self.step(provider, &*trajectory, t, next, direction, cancel) {
                Ok(StepOutcome::Matched { center, score }) => {
                    trajectory.set_at(next, center, score);
                    outcome.tracked += 1;
                    debug!(frame = next, x = center.x, y = center.y, score, "Frame tracked");
                }
                Ok(StepOutcome::Interrupted) => {
                    self.state = SessionState::Cancelled;
                    break;
                }
                Err(e) if e.is_recoverable() => {
                    trajectory.delete_at(next);
                    outcome.lost += 1;
                    warn!(frame = next, error = %e, "Frame lost, keyframe removed");
                }
                Err(e) => {
                    self.state = SessionState::Fatal;
                    error!(frame = next, error = %e, "Tracking session aborted");
                    return Err(e);
                }
            }

            completed += 1;
            t = next;
            if !progress.report(completed as f64 / total as f64) && t != last {
                self.state = SessionState::Cancelled;
                break;
            }
        }

        if !self.state.is_terminal() {
            self.state = SessionState::Done;
        }
        outcome.state = self.state;
        info!(
            state = ?outcome.state,
            tracked = outcome.tracked,
            lost = outcome.lost,
            "Tracking session finished"
        );
        Ok(outcome)
    }

    /// Track one frame forward from `frame`.
    pub fn track_next<I, T>(
        &mut self,
        provider: &I,
        trajectory: &mut T,
        frame: Frame,
        cancel: &dyn CancellationToken,
    ) -> Result<SessionOutcome>
    where
        I: ImageProvider + ?Sized,
        T: TrajectoryStore + ?Sized,
    {
        self.track_range(provider, trajectory, frame, frame + 1, &mut NoProgress, cancel)
    }

    /// Track one frame backward from `frame`.
    pub fn track_previous<I, T>(
        &mut self,
        provider: &I,
        trajectory: &mut T,
        frame: Frame,
        cancel: &dyn CancellationToken,
    ) -> Result<SessionOutcome>
    where
        I: ImageProvider + ?Sized,
        T: TrajectoryStore + ?Sized,
    {
        self.track_range(provider, trajectory, frame, frame - 1, &mut NoProgress, cancel)
    }

    /// Match the point from `t` into `next`.
    fn step<I, T>(
        &self,
        provider: &I,
        trajectory: &T,
        t: Frame,
        next: Frame,
        direction: TrackDirection,
        cancel: &dyn CancellationToken,
    ) -> Result<StepOutcome>
    where
        I: ImageProvider + ?Sized,
        T: TrajectoryStore + ?Sized,
    {
        let r = self.params.reference_frame(t).unwrap_or(t);

        let reference = provider.fetch(r).ok_or(TrackError::ImageFetch {
            frame: r,
            role: ImageRole::Reference,
        })?;
        let search = provider.fetch(next).ok_or(TrackError::ImageFetch {
            frame: next,
            role: ImageRole::Search,
        })?;
        let (reference_format, search_format) = (reference.format(), search.format());
        if reference_format != search_format {
            return Err(TrackError::FormatMismatch {
                reference: reference_format,
                search: search_format,
            });
        }

        let center = match direction {
            TrackDirection::Forward => trajectory.get_at_or_before(r),
            TrackDirection::Backward => trajectory.get_at_or_after(r),
        }
        .ok_or(TrackError::NoReferenceCenter { frame: r })?;

        let mask = provider.fetch_mask(r);
        let mask = mask.as_ref().map(|m| m as &dyn ImageSampler);

        match self.params.color_space(t) {
            TrackColorSpace::Rgb => self.locate(&reference, &search, mask, center, t, next, cancel),
            TrackColorSpace::Lab => self.locate(
                &LabSampler::new(&reference),
                &LabSampler::new(&search),
                mask,
                center,
                t,
                next,
                cancel,
            ),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn locate<R, S>(
        &self,
        reference: &R,
        search: &S,
        mask: Option<&dyn ImageSampler>,
        center: Point,
        t: Frame,
        next: Frame,
        cancel: &dyn CancellationToken,
    ) -> Result<StepOutcome>
    where
        R: ImageSampler + ?Sized,
        S: ImageSampler + ?Sized,
    {
        let par = reference.pixel_aspect_ratio();
        let offset = self.params.offset(t);

        // Match around the nearest pixel and carry the fraction over.
        let pixel_center = canonical_to_pixel(center + offset, par);
        let rounded = pixel_center.round();
        let fraction = pixel_center - rounded;

        let pattern_box = self.params.pattern_box(t).to_pixel(par);
        let pattern = Pattern::extract(reference, rounded, pattern_box, mask)?;

        let p = pattern_box.pixel_span();
        let s = self.params.search_box(t).to_pixel(par).pixel_span();
        // Candidate centers keeping the pattern footprint inside the search box
        let window = IRect::new(
            s.x1.saturating_sub(p.x1),
            s.y1.saturating_sub(p.y1),
            s.x2.saturating_sub(p.x2).saturating_add(1),
            s.y2.saturating_sub(p.y2).saturating_add(1),
        )
        .offset(rounded.as_ivec2());

        let kind = self.params.score_kind(t);
        let best = self.reducer.reduce(&pattern, search, window, kind, cancel);
        if cancel.is_requested() {
            return Ok(StepOutcome::Interrupted);
        }
        if !best.is_found() {
            return Err(TrackError::NoMatch { frame: next });
        }

        let correction = self.params.subpixel(t).then(|| {
            self.refiner.refine(&best, |dx, dy| {
                score::score(kind, &pattern, search, best.position + IVec2::new(dx, dy))
            })
        });
        let result = TrackResult { best, correction };

        let matched = pixel_to_canonical(result.position() + fraction, par) - offset;
        Ok(StepOutcome::Matched {
            center: matched,
            score: result.best.score,
        })
    }
}
