//! Collaborator interfaces supplied by the host application.
//!
//! The engine fetches images, reports progress and polls for cancellation
//! only through these traits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use blocktrack_core::{Frame, ImageSampler};

/// Source of reference, search and mask images by frame.
pub trait ImageProvider {
    type Image: ImageSampler;

    /// Image at `frame`, or `None` if it cannot be produced.
    fn fetch(&self, frame: Frame) -> Option<Self::Image>;

    /// Optional confidence mask for the pattern at `frame`.
    fn fetch_mask(&self, _frame: Frame) -> Option<Self::Image> {
        None
    }
}

/// Receives session progress. Returning `false` requests cancellation.
pub trait ProgressSink {
    fn report(&mut self, fraction: f64) -> bool;
}

impl<F: FnMut(f64) -> bool> ProgressSink for F {
    fn report(&mut self, fraction: f64) -> bool {
        self(fraction)
    }
}

/// Progress sink that ignores reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _fraction: f64) -> bool {
        true
    }
}

/// Cooperative cancellation flag, polled by the session and search workers.
pub trait CancellationToken: Sync {
    fn is_requested(&self) -> bool;
}

/// Handle for cancelling an in-progress tracking session.
#[derive(Debug, Clone)]
pub struct TrackCancel(Arc<AtomicBool>);

impl TrackCancel {
    /// Create a new cancel handle.
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Signal cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Check if cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for TrackCancel {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken for TrackCancel {
    fn is_requested(&self) -> bool {
        self.is_cancelled()
    }
}

/// Token that never requests cancellation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancel;

impl CancellationToken for NeverCancel {
    fn is_requested(&self) -> bool {
        false
    }
}
