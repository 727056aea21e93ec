//! Integration tests for tracking sessions.
//!
//! Drives `TrackSession` over fake hosts and checks the trajectory it
//! leaves behind.

use blocktrack_core::{BitDepth, Frame, IRect, PixelImage, Point, Rect, TrackError};
use blocktrack_tracking::{
    NeverCancel, NoProgress, ScoreKind, SessionState, TrackCancel, TrackColorSpace, TrackSession,
    TrackerParams, Trajectory,
};

use crate::fixtures::{blob, ramp, reducer, textured, textured_u8, FakeHost};

// ── Helpers ────────────────────────────────────────────────────

const START: Point = Point::new(40.0, 44.0);

/// Integer-only tracking with boxes small enough for the test images.
fn params() -> TrackerParams {
    TrackerParams {
        pattern_box: Rect::centered(7.0, 7.0),
        search_box: Rect::centered(15.0, 15.0),
        subpixel: false,
        ..Default::default()
    }
}

fn session(params: TrackerParams) -> TrackSession<TrackerParams> {
    TrackSession::new(params, reducer())
}

/// Texture moving right by two pixels per frame.
fn moving_host(range: std::ops::RangeInclusive<Frame>) -> FakeHost {
    let base = textured();
    FakeHost::new().with_frames(range, move |f| base.translated(2 * f as i32, 0))
}

fn center_at(trajectory: &Trajectory, frame: Frame) -> Point {
    trajectory
        .get(frame)
        .unwrap_or_else(|| panic!("no keyframe at {frame}"))
        .center
}

fn track(
    session: &mut TrackSession<TrackerParams>,
    host: &FakeHost,
    trajectory: &mut Trajectory,
    first: Frame,
    last: Frame,
) -> blocktrack_core::Result<blocktrack_tracking::SessionOutcome> {
    session.track_range(host, trajectory, first, last, &mut NoProgress, &NeverCancel)
}

// ── Tracking ───────────────────────────────────────────────────

#[test]
fn forward_range_follows_motion() {
    let host = moving_host(0..=5);
    let mut trajectory = Trajectory::starting_at("p", 0, START);
    let outcome = track(&mut session(params()), &host, &mut trajectory, 0, 5).unwrap();

    assert_eq!(outcome.state, SessionState::Done);
    assert_eq!(outcome.tracked, 5);
    assert_eq!(outcome.lost, 0);
    for f in 1..=5 {
        assert_eq!(center_at(&trajectory, f), START + Point::new(2.0 * f as f64, 0.0));
        assert_eq!(trajectory.get(f).unwrap().score, 0.0);
    }
}

#[test]
fn backward_range_follows_motion() {
    let host = moving_host(0..=4);
    let mut trajectory = Trajectory::starting_at("p", 4, START + Point::new(8.0, 0.0));
    let outcome = track(&mut session(params()), &host, &mut trajectory, 4, 0).unwrap();

    assert_eq!(outcome.state, SessionState::Done);
    assert_eq!(outcome.tracked, 4);
    for f in 0..4 {
        assert_eq!(center_at(&trajectory, f), START + Point::new(2.0 * f as f64, 0.0));
    }
}

#[test]
fn track_previous_uses_later_keyframe() {
    let host = moving_host(0..=3);
    // Keyframes on both sides: backward steps start from the later one
    let mut trajectory = Trajectory::starting_at("p", 0, Point::new(10.0, 10.0));
    trajectory.set(3, START + Point::new(6.0, 0.0), 0.0);
    let mut session = session(params());
    session
        .track_previous(&host, &mut trajectory, 3, &NeverCancel)
        .unwrap();
    assert_eq!(center_at(&trajectory, 2), START + Point::new(4.0, 0.0));
    assert_eq!(session.state(), SessionState::Done);
}

#[test]
fn fixed_reference_frame_matches_against_it() {
    let host = moving_host(0..=4);
    let mut trajectory = Trajectory::starting_at("p", 0, START);
    let params = TrackerParams {
        search_box: Rect::centered(20.0, 20.0),
        ..params()
    }
    .with_reference_frame(0);
    let outcome = track(&mut session(params), &host, &mut trajectory, 0, 4).unwrap();

    assert_eq!(outcome.tracked, 4);
    for f in 1..=4 {
        assert_eq!(center_at(&trajectory, f), START + Point::new(2.0 * f as f64, 0.0));
    }
    // Every step fetched frame 0 as its reference
    let fetched = host.fetched();
    assert_eq!(fetched.iter().filter(|&&f| f == 0).count(), 4);
}

#[test]
fn exact_translation_keeps_fractional_center() {
    let base = blob(40, 44);
    let host = FakeHost::new()
        .with_frame(0, base.clone())
        .with_frame(1, base.translated(3, -2));
    let start = Point::new(40.25, 43.75);
    let mut trajectory = Trajectory::starting_at("p", 0, start);
    let params = TrackerParams {
        subpixel: true,
        ..params()
    };
    track(&mut session(params), &host, &mut trajectory, 0, 1).unwrap();

    let tracked = center_at(&trajectory, 1);
    assert!((tracked - (start + Point::new(3.0, -2.0))).length() < 1e-6, "{tracked:?}");
}

#[test]
fn fractional_motion_is_refined() {
    let host = FakeHost::new()
        .with_frame(0, ramp(0.0, 0.0))
        .with_frame(1, ramp(0.4, 0.25));
    let mut trajectory = Trajectory::starting_at("p", 0, Point::new(48.0, 48.0));
    let params = TrackerParams {
        subpixel: true,
        ..params()
    };
    track(&mut session(params), &host, &mut trajectory, 0, 1).unwrap();

    let tracked = center_at(&trajectory, 1);
    assert!((tracked.x - 48.4).abs() < 0.05, "{tracked:?}");
    assert!((tracked.y - 48.25).abs() < 0.05, "{tracked:?}");
}

#[test]
fn pixel_aspect_ratio_converts_canonical_centers() {
    let base = textured().with_pixel_aspect_ratio(2.0);
    let host = FakeHost::new()
        .with_frame(0, base.clone())
        .with_frame(1, base.translated(3, 1).with_pixel_aspect_ratio(2.0));
    // Canonical x is twice the pixel column
    let mut trajectory = Trajectory::starting_at("p", 0, Point::new(80.0, 40.0));
    let params = TrackerParams {
        pattern_box: Rect::centered(14.0, 7.0),
        search_box: Rect::centered(30.0, 15.0),
        ..params()
    };
    track(&mut session(params), &host, &mut trajectory, 0, 1).unwrap();
    assert_eq!(center_at(&trajectory, 1), Point::new(86.0, 41.0));
}

#[test]
fn offset_moves_pattern_but_not_result() {
    let host = moving_host(0..=1);
    let mut trajectory = Trajectory::starting_at("p", 0, START);
    let params = TrackerParams {
        offset: Point::new(5.0, -3.0),
        ..params()
    };
    track(&mut session(params), &host, &mut trajectory, 0, 1).unwrap();
    assert_eq!(center_at(&trajectory, 1), START + Point::new(2.0, 0.0));
}

#[test]
fn zncc_tracks_through_lighting_change() {
    let base = textured();
    let host = FakeHost::new()
        .with_frame(0, base.clone())
        .with_frame(1, base.translated(4, 3).map_values(|v| 0.6 * v + 0.3));
    let mut trajectory = Trajectory::starting_at("p", 0, START);
    let params = TrackerParams {
        score: ScoreKind::Zncc,
        ..params()
    };
    track(&mut session(params), &host, &mut trajectory, 0, 1).unwrap();
    assert_eq!(center_at(&trajectory, 1), START + Point::new(4.0, 3.0));
}

#[test]
fn lab_color_space_tracks_eight_bit_frames() {
    let base = textured_u8();
    let host = FakeHost::new()
        .with_frame(0, base.clone())
        .with_frame(1, base.translated(-2, 3));
    let mut trajectory = Trajectory::starting_at("p", 0, START);
    let params = TrackerParams {
        color_space: TrackColorSpace::Lab,
        ..params()
    };
    track(&mut session(params), &host, &mut trajectory, 0, 1).unwrap();
    assert_eq!(center_at(&trajectory, 1), START + Point::new(-2.0, 3.0));
}

// ── Failures and gaps ──────────────────────────────────────────

#[test]
fn fetch_failure_leaves_gap_and_tracking_continues() {
    let host = moving_host(0..=6).failing(3);
    let mut trajectory = Trajectory::starting_at("p", 0, START);
    // Stale keyframe from an earlier run must be removed
    trajectory.set(3, Point::new(1.0, 1.0), 0.0);
    let outcome = track(&mut session(params()), &host, &mut trajectory, 0, 6).unwrap();

    assert_eq!(outcome.state, SessionState::Done);
    assert!(trajectory.get(3).is_none());
    // Frame 3 is also the reference for the step into 4
    assert!(trajectory.get(4).is_none());
    assert_eq!(outcome.lost, 2);
    assert_eq!(outcome.tracked, 4);

    // Later frames continue from the last written keyframe (frame 2)
    let last_good = center_at(&trajectory, 2);
    assert_eq!(center_at(&trajectory, 5), last_good + Point::new(2.0, 0.0));
    assert_eq!(center_at(&trajectory, 6), last_good + Point::new(4.0, 0.0));
}

#[test]
fn fully_masked_pattern_removes_keyframe() {
    let mask = PixelImage::new(IRect::from_size(96, 96), 1, BitDepth::F32);
    let host = moving_host(0..=1).with_mask(0, mask);
    let mut trajectory = Trajectory::starting_at("p", 0, START);
    trajectory.set(1, Point::new(7.0, 7.0), 0.1);
    let outcome = track(&mut session(params()), &host, &mut trajectory, 0, 1).unwrap();

    assert_eq!(outcome.state, SessionState::Done);
    assert_eq!(outcome.lost, 1);
    assert!(trajectory.get(1).is_none());
    assert_eq!(trajectory.len(), 1);
}

#[test]
fn partial_mask_still_tracks() {
    // Only the left half of the pattern is trusted
    let mask = PixelImage::from_fn(IRect::from_size(96, 96), 1, BitDepth::U8, |x, _| {
        [if x < 40 { 255.0 } else { 0.0 }, 0.0, 0.0, 0.0]
    });
    let host = moving_host(0..=1).with_mask(0, mask);
    let mut trajectory = Trajectory::starting_at("p", 0, START);
    track(&mut session(params()), &host, &mut trajectory, 0, 1).unwrap();
    assert_eq!(center_at(&trajectory, 1), START + Point::new(2.0, 0.0));
}

#[test]
fn pattern_outside_image_is_recoverable() {
    let host = moving_host(0..=2);
    let mut trajectory = Trajectory::starting_at("p", 0, Point::new(500.0, 500.0));
    let outcome = track(&mut session(params()), &host, &mut trajectory, 0, 2).unwrap();
    assert_eq!(outcome.state, SessionState::Done);
    assert_eq!(outcome.lost, 2);
    assert_eq!(trajectory.len(), 1);
}

#[test]
fn format_mismatch_aborts_session() {
    let base = textured();
    let host = FakeHost::new()
        .with_frame(0, base.clone())
        .with_frame(1, base.translated(2, 0))
        .with_frame(2, textured_u8())
        .with_frame(3, base.clone());
    let mut trajectory = Trajectory::starting_at("p", 0, START);
    let mut session = session(params());
    let err = track(&mut session, &host, &mut trajectory, 0, 3).unwrap_err();

    assert!(matches!(err, TrackError::FormatMismatch { .. }));
    assert!(!err.is_recoverable());
    assert_eq!(session.state(), SessionState::Fatal);
    // Keyframes written before the mismatch survive; nothing after it
    assert!(trajectory.get(1).is_some());
    assert!(trajectory.get(2).is_none());
    assert!(trajectory.get(3).is_none());
}

// ── Cancellation and progress ──────────────────────────────────

#[test]
fn cancellation_mid_range_keeps_completed_frames() {
    let cancel = TrackCancel::new();
    let host = moving_host(0..=6).cancelling_at(4, cancel.clone());
    let mut trajectory = Trajectory::starting_at("p", 0, START);
    let mut session = session(params());
    let outcome = session
        .track_range(&host, &mut trajectory, 0, 6, &mut NoProgress, &cancel)
        .unwrap();

    assert_eq!(outcome.state, SessionState::Cancelled);
    assert_eq!(session.state(), SessionState::Cancelled);
    let frames: Vec<_> = trajectory.keyframes().iter().map(|kf| kf.frame).collect();
    assert_eq!(frames, vec![0, 1, 2, 3]);
    assert_eq!(outcome.tracked, 3);
}

#[test]
fn progress_reports_every_step() {
    let host = moving_host(0..=4);
    let mut trajectory = Trajectory::starting_at("p", 0, START);
    let mut reports = Vec::new();
    let mut sink = |fraction: f64| {
        reports.push(fraction);
        true
    };
    let outcome = session(params())
        .track_range(&host, &mut trajectory, 0, 4, &mut sink, &NeverCancel)
        .unwrap();
    assert_eq!(outcome.state, SessionState::Done);
    assert_eq!(reports, vec![0.25, 0.5, 0.75, 1.0]);
}

#[test]
fn trajectory_survives_save_and_reload() {
    let host = moving_host(0..=3);
    let mut trajectory = Trajectory::starting_at("corner", 0, START);
    track(&mut session(params()), &host, &mut trajectory, 0, 3).unwrap();

    let json = trajectory.to_json().unwrap();
    let mut reloaded = Trajectory::from_json(&json).unwrap();
    assert_eq!(reloaded, trajectory);

    // Re-tracking part of the range updates it in place
    let host = moving_host(0..=5);
    track(&mut session(params()), &host, &mut reloaded, 3, 5).unwrap();
    assert_eq!(reloaded.len(), 6);
    assert_eq!(center_at(&reloaded, 5), START + Point::new(10.0, 0.0));
}
