//! Integration tests for pattern matching.
//!
//! Exercises blocktrack-core images through the pattern, score, search and
//! sub-pixel stages of blocktrack-tracking.

use blocktrack_core::{IRect, LabSampler, Point, Rect, TrackError};
use blocktrack_tracking::score::{Metric, Zncc};
use blocktrack_tracking::{score, NeverCancel, Pattern, ScoreKind, SubpixelRefiner, TrackCancel};
use glam::IVec2;

use crate::fixtures::{blob, ramp, reducer, textured, textured_u8};

fn window_around(x: i32, y: i32, half: i32) -> IRect {
    IRect::new(x - half, y - half, x + half + 1, y + half + 1)
}

// ── Identity and translation ───────────────────────────────────

#[test]
fn identity_match_scores_zero_with_no_correction() {
    let img = blob(48, 48);
    let pattern =
        Pattern::extract(&img, Point::new(48.0, 48.0), Rect::centered(8.0, 8.0), None).unwrap();
    for kind in [ScoreKind::Ssd, ScoreKind::Sad] {
        let best = reducer().reduce(&pattern, &img, window_around(48, 48, 6), kind, &NeverCancel);
        assert_eq!(best.position, IVec2::new(48, 48));
        assert_eq!(best.score, 0.0);

        let d = SubpixelRefiner
            .refine(&best, |dx, dy| score(kind, &pattern, &img, best.position + IVec2::new(dx, dy)));
        assert!(d.length() < 1e-6, "{}: {d:?}", kind.name());
    }
}

#[test]
fn translation_is_recovered_by_every_metric() {
    let reference = textured();
    let moved = reference.translated(5, -4);
    let pattern = Pattern::extract(
        &reference,
        Point::new(40.0, 44.0),
        Rect::centered(7.0, 7.0),
        None,
    )
    .unwrap();
    for kind in ScoreKind::ALL {
        let best = reducer().reduce(
            &pattern,
            &moved,
            window_around(40, 44, 8),
            kind,
            &NeverCancel,
        );
        assert_eq!(best.position, IVec2::new(45, 40), "{}", kind.name());
    }
}

#[test]
fn runtime_dispatch_matches_static_metric() {
    let img = textured();
    let pattern =
        Pattern::extract(&img, Point::new(30.0, 30.0), Rect::centered(5.0, 5.0), None).unwrap();
    for (x, y) in [(30, 30), (28, 33), (0, 95)] {
        let at = IVec2::new(x, y);
        assert_eq!(
            Zncc::score(&pattern, &img, at),
            score(ScoreKind::Zncc, &pattern, &img, at)
        );
    }
}

// ── Sub-pixel ──────────────────────────────────────────────────

#[test]
fn fractional_shift_of_ramp_is_recovered() {
    let reference = ramp(0.0, 0.0);
    let (tx, ty) = (0.3, -0.2);
    let shifted = ramp(tx as f32, ty as f32);
    let pattern = Pattern::extract(
        &reference,
        Point::new(48.0, 48.0),
        Rect::centered(6.0, 6.0),
        None,
    )
    .unwrap();
    let best = reducer().reduce(
        &pattern,
        &shifted,
        window_around(48, 48, 5),
        ScoreKind::Ssd,
        &NeverCancel,
    );
    assert_eq!(best.position, IVec2::new(48, 48));

    let d = SubpixelRefiner.refine(&best, |dx, dy| {
        score(ScoreKind::Ssd, &pattern, &shifted, best.position + IVec2::new(dx, dy))
    });
    assert!((d.x - tx).abs() < 0.05, "dx = {}", d.x);
    assert!((d.y - ty).abs() < 0.05, "dy = {}", d.y);
}

// ── Illumination ───────────────────────────────────────────────

#[test]
fn zncc_ranking_survives_gain_and_offset() {
    let img = textured();
    let lit = img.map_values(|v| 1.8 * v + 0.15);
    let pattern =
        Pattern::extract(&img, Point::new(50.0, 50.0), Rect::centered(6.0, 6.0), None).unwrap();

    let window = window_around(50, 50, 3);
    let mut base = Vec::new();
    let mut changed = Vec::new();
    for y in window.y1..window.y2 {
        for x in window.x1..window.x2 {
            let at = IVec2::new(x, y);
            base.push(score(ScoreKind::Zncc, &pattern, &img, at));
            changed.push(score(ScoreKind::Zncc, &pattern, &lit, at));
        }
    }
    for i in 0..base.len() {
        for j in 0..base.len() {
            if (base[i] - base[j]).abs() > 1e-3 {
                assert_eq!(base[i] < base[j], changed[i] < changed[j]);
            }
        }
    }

    let at = IVec2::new(50, 50);
    assert!(
        (score(ScoreKind::Ncc, &pattern, &img, at) - score(ScoreKind::Ncc, &pattern, &lit, at))
            .abs()
            > 1e-3
    );
    let best = reducer().reduce(&pattern, &lit, window, ScoreKind::Zncc, &NeverCancel);
    assert_eq!(best.position, at);
}

#[test]
fn lab_matching_finds_translation() {
    let reference = textured_u8();
    let moved = reference.translated(-3, 2);
    let lab_reference = LabSampler::new(&reference);
    let lab_moved = LabSampler::new(&moved);
    let pattern = Pattern::extract(
        &lab_reference,
        Point::new(40.0, 40.0),
        Rect::centered(6.0, 6.0),
        None,
    )
    .unwrap();
    let best = reducer().reduce(
        &pattern,
        &lab_moved,
        window_around(40, 40, 6),
        ScoreKind::Ssd,
        &NeverCancel,
    );
    assert_eq!(best.position, IVec2::new(37, 42));
    assert_eq!(best.score, 0.0);
}

// ── Masking and cancellation ───────────────────────────────────

#[test]
fn fully_masked_pattern_is_empty() {
    let img = textured();
    let mask = img.map_values(|_| 0.0);
    let err = Pattern::extract(
        &img,
        Point::new(40.0, 40.0),
        Rect::centered(6.0, 6.0),
        Some(&mask),
    )
    .unwrap_err();
    assert!(matches!(err, TrackError::EmptyPattern));
    assert!(err.is_recoverable());
}

#[test]
fn cancelled_search_returns_no_candidate() {
    let img = textured();
    let pattern =
        Pattern::extract(&img, Point::new(40.0, 40.0), Rect::centered(6.0, 6.0), None).unwrap();
    let cancel = TrackCancel::new();
    cancel.cancel();
    let best = reducer().reduce(
        &pattern,
        &img,
        window_around(40, 40, 10),
        ScoreKind::Sad,
        &cancel,
    );
    assert!(!best.is_found());
}
