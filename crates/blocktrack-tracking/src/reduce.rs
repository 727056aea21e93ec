//! Thread-safe reduction cell shared by parallel search workers.

use parking_lot::Mutex;

/// Holds the best value offered so far by any worker.
///
/// `better(candidate, current)` decides whether an offered value replaces the
/// current one. The lock is held only for that comparison, so workers keep
/// their own running best and offer it once they are done.
pub struct ReductionCell<T, F> {
    best: Mutex<T>,
    better: F,
}

impl<T, F> ReductionCell<T, F>
where
    T: Clone,
    F: Fn(&T, &T) -> bool,
{
    pub fn new(initial: T, better: F) -> Self {
        Self {
            best: Mutex::new(initial),
            better,
        }
    }

    /// Replace the current value if `candidate` is better. Returns whether it
    /// was taken.
    pub fn offer(&self, candidate: T) -> bool {
        let mut best = self.best.lock();
        if (self.better)(&candidate, &best) {
            *best = candidate;
            true
        } else {
            false
        }
    }

    /// Snapshot of the current best value.
    pub fn get(&self) -> T {
        self.best.lock().clone()
    }

    pub fn into_inner(self) -> T {
        self.best.into_inner()
    }
}
