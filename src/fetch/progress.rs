// src/fetch/progress.rs
//! Progress counting for a running batch.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Callback receiving `(completed, total)` after each task finishes.
///
/// Called from worker tasks, possibly concurrently.
pub type ProgressSink = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Point-in-time view of a batch's progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub total: usize,
    pub completed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl ProgressSnapshot {
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.completed)
    }

    /// Completion ratio in `0.0..=1.0`; an empty batch counts as done.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} done ({} ok, {} failed)",
            self.completed, self.total, self.succeeded, self.failed
        )
    }
}

/// Tracks terminal transitions of the tasks in one batch.
pub struct ProgressTracker {
    total: usize,
    completed: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    sink: Option<ProgressSink>,
}

impl ProgressTracker {
    pub fn new(total: usize, sink: Option<ProgressSink>) -> Self {
        Self {
            total,
            completed: AtomicUsize::new(0),
            succeeded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            sink,
        }
    }

    /// Records one task reaching `Succeeded` or `Failed` and notifies the
    /// sink. Must be called exactly once per task.
    pub fn record(&self, succeeded: bool) {
        if succeeded {
            self.succeeded.fetch_add(1, Ordering::SeqCst);
        } else {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(sink) = &self.sink {
            sink(completed, self.total);
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            total: self.total,
            completed: self.completed.load(Ordering::SeqCst),
            succeeded: self.succeeded.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_record_counts_and_notifies() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let tracker = ProgressTracker::new(
            3,
            Some(Arc::new(move |done, total| log.lock().push((done, total)))),
        );

        tracker.record(true);
        tracker.record(false);
        tracker.record(true);

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.completed, 3);
        assert_eq!(snapshot.succeeded, 2);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.remaining(), 0);
        assert_eq!(*seen.lock(), vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[test]
    fn test_empty_batch_is_done() {
        let tracker = ProgressTracker::new(0, None);
        assert_eq!(tracker.snapshot().fraction(), 1.0);
    }
}
