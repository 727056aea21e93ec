//! Blocktrack Tracking - Block-matching point tracking engine.
//!
//! A [`TrackSession`] follows a point through a frame range. Each step
//! extracts a weighted [`Pattern`] around the current center, scores every
//! candidate position of the search window in parallel ([`SearchReducer`]),
//! refines the winner to sub-pixel precision ([`SubpixelRefiner`]) and writes
//! the result to a [`TrajectoryStore`].

pub mod config;
pub mod host;
pub mod params;
pub mod pattern;
pub mod reduce;
pub mod score;
pub mod search;
pub mod session;
pub mod subpixel;
pub mod trajectory;

pub use config::{EngineConfig, TrackerConfig};
pub use host::{CancellationToken, ImageProvider, NeverCancel, NoProgress, ProgressSink, TrackCancel};
pub use params::{ParameterStore, TrackColorSpace, TrackerParams, MAX_BOX_EXTENT};
pub use pattern::Pattern;
pub use reduce::ReductionCell;
pub use score::{score, Metric, ScoreKind};
pub use search::{Candidate, SearchReducer, TrackResult};
pub use session::{SessionOutcome, SessionState, TrackDirection, TrackSession};
pub use subpixel::SubpixelRefiner;
pub use trajectory::{TrackKeyframe, Trajectory, TrajectoryStore, TRAJECTORY_VERSION};
