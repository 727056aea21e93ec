//! Tracked centers keyed by frame, plus JSON persistence.
//!
//! A missing keyframe is the explicit "lost track" state: failed frames are
//! removed, never zeroed.

use std::path::Path;

use blocktrack_core::{Frame, Point, Result, TrackError};
use serde::{Deserialize, Serialize};

/// Current trajectory file schema version.
pub const TRAJECTORY_VERSION: u32 = 1;

/// One tracked center at a frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackKeyframe {
    pub frame: Frame,
    /// Center in canonical coordinates.
    pub center: Point,
    /// Score of the winning match; 0 for user-placed keyframes.
    pub score: f64,
}

/// Keyframe storage the session reads reference centers from and writes
/// results to.
pub trait TrajectoryStore {
    /// Center of the latest keyframe at or before `frame`.
    fn get_at_or_before(&self, frame: Frame) -> Option<Point>;

    /// Center of the earliest keyframe at or after `frame`.
    fn get_at_or_after(&self, frame: Frame) -> Option<Point>;

    /// Insert or overwrite the keyframe at `frame`.
    fn set_at(&mut self, frame: Frame, center: Point, score: f64);

    /// Remove the keyframe at `frame`, if any.
    fn delete_at(&mut self, frame: Frame);
}

/// In-memory trajectory with keyframes kept sorted by frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    /// Name of the tracked point.
    pub name: String,
    keyframes: Vec<TrackKeyframe>,
}

impl Trajectory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keyframes: Vec::new(),
        }
    }

    /// Trajectory seeded with a single user-placed center.
    pub fn starting_at(name: impl Into<String>, frame: Frame, center: Point) -> Self {
        let mut trajectory = Self::new(name);
        trajectory.set(frame, center, 0.0);
        trajectory
    }

    /// Insert or update a keyframe. Maintains sorted order.
    pub fn set(&mut self, frame: Frame, center: Point, score: f64) {
        let keyframe = TrackKeyframe {
            frame,
            center,
            score,
        };
        match self.keyframes.binary_search_by(|kf| kf.frame.cmp(&frame)) {
            Ok(pos) => self.keyframes[pos] = keyframe,
            Err(pos) => self.keyframes.insert(pos, keyframe),
        }
    }

    /// Remove the keyframe at `frame`. Returns whether one existed.
    pub fn remove(&mut self, frame: Frame) -> bool {
        match self.keyframes.binary_search_by(|kf| kf.frame.cmp(&frame)) {
            Ok(pos) => {
                self.keyframes.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    pub fn get(&self, frame: Frame) -> Option<&TrackKeyframe> {
        self.keyframes
            .binary_search_by(|kf| kf.frame.cmp(&frame))
            .ok()
            .map(|pos| &self.keyframes[pos])
    }

    /// Latest keyframe at or before `frame`.
    pub fn at_or_before(&self, frame: Frame) -> Option<&TrackKeyframe> {
        let end = self.keyframes.partition_point(|kf| kf.frame <= frame);
        end.checked_sub(1).map(|pos| &self.keyframes[pos])
    }

    /// Earliest keyframe at or after `frame`.
    pub fn at_or_after(&self, frame: Frame) -> Option<&TrackKeyframe> {
        let start = self.keyframes.partition_point(|kf| kf.frame < frame);
        self.keyframes.get(start)
    }

    pub fn keyframes(&self) -> &[TrackKeyframe] {
        &self.keyframes
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Serialize to pretty JSON inside a versioned envelope.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        let file = TrajectoryFile {
            version: TRAJECTORY_VERSION,
            trajectory: self.clone(),
        };
        serde_json::to_vec_pretty(&file).map_err(|e| {
            TrackError::Serialization(format!("Failed to serialize trajectory: {}", e))
        })
    }

    /// Deserialize from JSON. A bare trajectory without an envelope is
    /// accepted as version 0.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_slice(data)
            .map_err(|e| TrackError::Serialization(format!("Invalid JSON: {}", e)))?;

        let version = raw.get("version").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
        if version > TRAJECTORY_VERSION {
            return Err(TrackError::Serialization(format!(
                "Trajectory file version {} is newer than supported version {}",
                version, TRAJECTORY_VERSION
            )));
        }

        let raw = if version == 0 {
            serde_json::json!({ "version": TRAJECTORY_VERSION, "trajectory": raw })
        } else {
            raw
        };
        let file: TrajectoryFile = serde_json::from_value(raw)
            .map_err(|e| TrackError::Serialization(format!("Failed to parse trajectory: {}", e)))?;

        let mut trajectory = file.trajectory;
        // Hand-edited files may be unsorted; later duplicates win.
        trajectory.keyframes.reverse();
        trajectory.keyframes.sort_by_key(|kf| kf.frame);
        trajectory.keyframes.dedup_by_key(|kf| kf.frame);
        Ok(trajectory)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }
}

impl TrajectoryStore for Trajectory {
    fn get_at_or_before(&self, frame: Frame) -> Option<Point> {
        self.at_or_before(frame).map(|kf| kf.center)
    }

    fn get_at_or_after(&self, frame: Frame) -> Option<Point> {
        self.at_or_after(frame).map(|kf| kf.center)
    }

    fn set_at(&mut self, frame: Frame, center: Point, score: f64) {
        self.set(frame, center, score);
    }

    fn delete_at(&mut self, frame: Frame) {
        self.remove(frame);
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TrajectoryFile {
    version: u32,
    trajectory: Trajectory,
}
