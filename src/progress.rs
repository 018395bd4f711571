use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub completed: usize,
    pub planned: usize,
}

impl ProgressSnapshot {
    pub fn ratio(&self) -> f64 {
        if self.planned == 0 {
            return 0.0;
        }
        (self.completed as f64 / self.planned as f64).min(1.0)
    }

    pub fn is_finished(&self) -> bool {
        self.completed == self.planned
    }
}

/// Batch counters shared between the scheduler's workers and whoever polls
/// for progress. `completed` never exceeds `planned`.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    planned: AtomicUsize,
    completed: AtomicUsize,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new batch. Must not be called while a batch is running.
    pub fn begin(&self, planned: usize) {
        self.completed.store(0, Ordering::SeqCst);
        self.planned.store(planned, Ordering::SeqCst);
    }

    /// Marks one task as finished, whatever its outcome.
    pub fn record(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        // completed first: a concurrent begin() can only make planned larger
        let completed = self.completed.load(Ordering::SeqCst);
        let planned = self.planned.load(Ordering::SeqCst);
        ProgressSnapshot {
            completed: completed.min(planned),
            planned,
        }
    }
}
