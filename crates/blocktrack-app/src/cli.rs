use std::path::PathBuf;

use blocktrack_core::{Point, Rect};
use blocktrack_tracking::{ScoreKind, TrackColorSpace, TrackerConfig};
use clap::{Parser, ValueEnum};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum MetricArg {
    Ssd,
    Sad,
    Ncc,
    Zncc,
}

impl From<MetricArg> for ScoreKind {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::Ssd => ScoreKind::Ssd,
            MetricArg::Sad => ScoreKind::Sad,
            MetricArg::Ncc => ScoreKind::Ncc,
            MetricArg::Zncc => ScoreKind::Zncc,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ColorSpaceArg {
    Rgb,
    Lab,
}

impl From<ColorSpaceArg> for TrackColorSpace {
    fn from(arg: ColorSpaceArg) -> Self {
        match arg {
            ColorSpaceArg::Rgb => TrackColorSpace::Rgb,
            ColorSpaceArg::Lab => TrackColorSpace::Lab,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "blocktrack",
    about = "Track a point through a sequence of numbered image files",
    disable_help_subcommand = true
)]
pub struct CliArgs {
    /// Directory of frames named with a trailing frame number (shot.0001.png)
    #[arg(long = "frames", value_name = "DIR")]
    pub frames: PathBuf,

    /// Directory of pattern masks, numbered like the frames
    #[arg(long = "masks", value_name = "DIR")]
    pub masks: Option<PathBuf>,

    /// Frame to start tracking from (defaults to the first frame found)
    #[arg(long = "first", allow_negative_numbers = true)]
    pub first: Option<i64>,

    /// Frame to track to; lower than --first tracks backward
    #[arg(long = "last", allow_negative_numbers = true)]
    pub last: Option<i64>,

    /// Starting center "x,y" at the first frame
    #[arg(long = "center", value_name = "X,Y", value_parser = parse_point)]
    pub center: Option<Point>,

    /// Tracker and engine configuration (JSON)
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Trajectory file; existing keyframes are loaded and updated in place
    #[arg(long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Name stored with a new trajectory
    #[arg(long = "name", default_value = "track")]
    pub name: String,

    /// Similarity metric
    #[arg(long = "metric", value_enum)]
    pub metric: Option<MetricArg>,

    /// Color space the pattern is compared in
    #[arg(long = "color-space", value_enum)]
    pub color_space: Option<ColorSpaceArg>,

    /// Always match against this frame instead of the previous one
    #[arg(long = "reference-frame", allow_negative_numbers = true)]
    pub reference_frame: Option<i64>,

    /// Half size of the pattern box in pixels
    #[arg(long = "pattern-size", value_name = "PX")]
    pub pattern_size: Option<f64>,

    /// Half size of the search box in pixels
    #[arg(long = "search-size", value_name = "PX")]
    pub search_size: Option<f64>,

    /// Keep integer matches only
    #[arg(long = "no-subpixel")]
    pub no_subpixel: bool,

    /// Worker threads for the search (0 = one per CPU)
    #[arg(long = "threads")]
    pub threads: Option<usize>,

    /// Enable debug logging
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl CliArgs {
    /// Apply command-line overrides on top of a loaded configuration.
    pub fn apply(&self, config: &mut TrackerConfig) {
        let params = &mut config.params;
        if let Some(metric) = self.metric {
            params.score = metric.into();
        }
        if let Some(space) = self.color_space {
            params.color_space = space.into();
        }
        if let Some(frame) = self.reference_frame {
            params.reference_frame = frame;
            params.reference_frame_enabled = true;
        }
        if let Some(half) = self.pattern_size {
            params.pattern_box = Rect::centered(half, half);
        }
        if let Some(half) = self.search_size {
            params.search_box = Rect::centered(half, half);
        }
        if self.no_subpixel {
            params.subpixel = false;
        }
        if let Some(threads) = self.threads {
            config.engine.threads = threads;
        }
    }
}

fn parse_point(value: &str) -> Result<Point, String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got {value:?}"))?;
    let x: f64 = x.trim().parse().map_err(|e| format!("bad x: {e}"))?;
    let y: f64 = y.trim().parse().map_err(|e| format!("bad y: {e}"))?;
    Ok(Point::new(x, y))
}
