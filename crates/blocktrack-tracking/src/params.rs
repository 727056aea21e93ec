//! Tracker parameters read by the session at each step.

use blocktrack_core::{Frame, Point, Rect, Result, TrackError};
use serde::{Deserialize, Serialize};

use crate::score::ScoreKind;

/// Color representation the pattern is compared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackColorSpace {
    /// Channel values as delivered by the host.
    #[default]
    Rgb,
    /// CIE L*a*b*, less sensitive to lighting than raw RGB.
    Lab,
}

/// Read-only tracker parameters, keyed by frame so hosts can animate them.
///
/// Boxes are relative to the tracked center, in canonical coordinates.
pub trait ParameterStore {
    fn pattern_box(&self, frame: Frame) -> Rect;

    fn search_box(&self, frame: Frame) -> Rect;

    fn score_kind(&self, frame: Frame) -> ScoreKind;

    /// Fixed reference frame, if one is enabled. Otherwise each step matches
    /// against the frame it starts from.
    fn reference_frame(&self, frame: Frame) -> Option<Frame>;

    /// Constant offset added to the tracked center before extracting the
    /// pattern.
    fn offset(&self, _frame: Frame) -> Point {
        Point::ZERO
    }

    fn color_space(&self, _frame: Frame) -> TrackColorSpace {
        TrackColorSpace::Rgb
    }

    fn subpixel(&self, _frame: Frame) -> bool {
        true
    }
}

/// Largest box coordinate accepted by [`TrackerParams::validate`], in
/// canonical units.
pub const MAX_BOX_EXTENT: f64 = 65_536.0;

/// Constant parameters for a whole session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerParams {
    pub pattern_box: Rect,
    pub search_box: Rect,
    pub score: ScoreKind,
    pub color_space: TrackColorSpace,
    pub reference_frame: Frame,
    pub reference_frame_enabled: bool,
    pub offset: Point,
    pub subpixel: bool,
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self {
            pattern_box: Rect::centered(15.0, 15.0),
            search_box: Rect::centered(25.0, 25.0),
            score: ScoreKind::default(),
            color_space: TrackColorSpace::default(),
            reference_frame: 0,
            reference_frame_enabled: false,
            offset: Point::ZERO,
            subpixel: true,
        }
    }
}

impl TrackerParams {
    /// Enable a fixed reference frame.
    pub fn with_reference_frame(mut self, frame: Frame) -> Self {
        self.reference_frame = frame;
        self.reference_frame_enabled = true;
        self
    }

    /// Check that the boxes describe a usable search.
    pub fn validate(&self) -> Result<()> {
        for (name, rect) in [("pattern", self.pattern_box), ("search", self.search_box)] {
            let within = [rect.x1, rect.y1, rect.x2, rect.y2]
                .iter()
                .all(|v| v.abs() <= MAX_BOX_EXTENT);
            if !within {
                return Err(TrackError::InvalidParameter(format!(
                    "{name} box {rect:?} exceeds +/-{MAX_BOX_EXTENT}"
                )));
            }
        }
        if self.pattern_box.is_empty() {
            return Err(TrackError::InvalidParameter(format!(
                "pattern box {:?} is empty",
                self.pattern_box
            )));
        }
        if self.search_box.is_empty() {
            return Err(TrackError::InvalidParameter(format!(
                "search box {:?} is empty",
                self.search_box
            )));
        }
        if !self.search_box.contains_rect(self.pattern_box) {
            return Err(TrackError::InvalidParameter(
                "search box must contain the pattern box".into(),
            ));
        }
        if !self.offset.is_finite() {
            return Err(TrackError::InvalidParameter(
                "offset must be finite".into(),
            ));
        }
        Ok(())
    }
}

impl ParameterStore for TrackerParams {
    fn pattern_box(&self, _frame: Frame) -> Rect {
        self.pattern_box
    }

    fn search_box(&self, _frame: Frame) -> Rect {
        self.search_box
    }

    fn score_kind(&self, _frame: Frame) -> ScoreKind {
        self.score
    }

    fn reference_frame(&self, _frame: Frame) -> Option<Frame> {
        self.reference_frame_enabled.then_some(self.reference_frame)
    }

    fn offset(&self, _frame: Frame) -> Point {
        self.offset
    }

    fn color_space(&self, _frame: Frame) -> TrackColorSpace {
        self.color_space
    }

    fn subpixel(&self, _frame: Frame) -> bool {
        self.subpixel
    }
}
