//! Blocktrack - command-line point tracker
//!
//! Tracks one point through a directory of numbered frames and stores the
//! result as a trajectory file.

mod cli;
mod sequence;

use std::path::Path;

use anyhow::{bail, Context, Result};
use blocktrack_tracking::{
    NeverCancel, SearchReducer, SessionState, TrackSession, TrackerConfig, Trajectory,
};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::cli::CliArgs;
use crate::sequence::FrameSequence;

fn main() -> Result<()> {
    let args = CliArgs::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = load_config(args.config.as_deref())?;
    args.apply(&mut config);
    config.params.validate().context("invalid tracker parameters")?;
    config.engine.validate().context("invalid engine settings")?;

    let mut frames = FrameSequence::open(&args.frames)?;
    if let Some(masks) = &args.masks {
        frames = frames.with_masks(masks)?;
    }
    let (seq_first, seq_last) = frames.range();
    let first = args.first.unwrap_or(seq_first);
    let last = args.last.unwrap_or(seq_last);
    info!(
        frames = frames.frame_count(),
        first,
        last,
        metric = config.params.score.name(),
        "Blocktrack starting"
    );

    let mut trajectory = match &args.output {
        Some(path) if path.exists() => Trajectory::load(path)
            .with_context(|| format!("loading trajectory {}", path.display()))?,
        _ => Trajectory::new(args.name.clone()),
    };
    if let Some(center) = args.center {
        trajectory.set(first, center, 0.0);
    } else if trajectory.get(first).is_none() {
        bail!("no keyframe at frame {first}; pass --center X,Y");
    }

    let reducer = SearchReducer::new(&config.engine)?;
    info!(threads = reducer.threads(), "Search pool ready");
    let mut session = TrackSession::new(config.params, reducer);

    let mut last_reported = 0u32;
    let mut progress = |fraction: f64| {
        let percent = (fraction * 100.0) as u32;
        if percent >= last_reported + 10 || fraction >= 1.0 {
            last_reported = percent;
            info!(percent, "Tracking");
        }
        true
    };
    let outcome = session.track_range(
        &frames,
        &mut trajectory,
        first,
        last,
        &mut progress,
        &NeverCancel,
    )?;

    match &args.output {
        Some(path) => {
            trajectory
                .save(path)
                .with_context(|| format!("writing trajectory {}", path.display()))?;
            info!(path = %path.display(), keyframes = trajectory.len(), "Trajectory saved");
        }
        None => {
            let json = trajectory.to_json()?;
            println!("{}", String::from_utf8_lossy(&json));
        }
    }

    if outcome.state != SessionState::Done {
        bail!("tracking stopped early: {:?}", outcome.state);
    }
    info!(
        tracked = outcome.tracked,
        lost = outcome.lost,
        "Blocktrack finished"
    );
    Ok(())
}

/// Read the JSON configuration, or fall back to the defaults.
fn load_config(path: Option<&Path>) -> Result<TrackerConfig> {
    match path {
        Some(path) => TrackerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(TrackerConfig::default()),
    }
}
