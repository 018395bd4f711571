//! Bounded worker pool for a batch of download tasks.
//!
//! `run` is a barrier: it spawns at most `limit` scoped workers that drain
//! the task list and only returns once every task has been attempted.
//! There is no retry and no cancellation; a failing task only affects its
//! own outcome.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::ConcurrencyLimit;
use crate::error::ScryError;
use crate::planner::DownloadTask;
use crate::progress::ProgressTracker;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub succeeded: usize,
    pub completed: usize,
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    limit: ConcurrencyLimit,
    tracker: Arc<ProgressTracker>,
}

impl Scheduler {
    pub fn new(limit: ConcurrencyLimit, tracker: Arc<ProgressTracker>) -> Self {
        Self { limit, tracker }
    }

    pub fn limit(&self) -> ConcurrencyLimit {
        self.limit
    }

    pub fn tracker(&self) -> Arc<ProgressTracker> {
        self.tracker.clone()
    }

    pub fn run<F>(&self, tasks: &[DownloadTask], execute: F) -> BatchOutcome
    where
        F: Fn(&DownloadTask) -> Result<(), ScryError> + Sync,
    {
        self.tracker.begin(tasks.len());
        if tasks.is_empty() {
            return BatchOutcome::default();
        }

        let workers = self.limit.get().min(tasks.len());
        let next = AtomicUsize::new(0);
        let succeeded = AtomicUsize::new(0);
        let completed = AtomicUsize::new(0);
        debug!(tasks = tasks.len(), workers, "starting batch");

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    loop {
                        let index = next.fetch_add(1, Ordering::SeqCst);
                        let Some(task) = tasks.get(index) else {
                            break;
                        };
                        let success = execute_isolated(&execute, task);
                        if success {
                            succeeded.fetch_add(1, Ordering::SeqCst);
                        }
                        completed.fetch_add(1, Ordering::SeqCst);
                        self.tracker.record();
                    }
                });
            }
        });

        let outcome = BatchOutcome {
            succeeded: succeeded.into_inner(),
            completed: completed.into_inner(),
        };
        debug!(
            succeeded = outcome.succeeded,
            completed = outcome.completed,
            "batch finished"
        );
        outcome
    }
}

fn execute_isolated<F>(execute: &F, task: &DownloadTask) -> bool
where
    F: Fn(&DownloadTask) -> Result<(), ScryError>,
{
    match panic::catch_unwind(AssertUnwindSafe(|| execute(task))) {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            warn!(name = %task.name, set = %task.set_code, "image task failed: {err}");
            false
        }
        Err(_) => {
            warn!(name = %task.name, set = %task.set_code, "image task panicked");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(name: &str) -> DownloadTask {
        DownloadTask {
            name: name.to_string(),
            url: format!("https://img.example/{name}.jpg"),
            set_code: "dom".to_string(),
        }
    }

    #[test]
    fn empty_batch_returns_immediately() {
        let scheduler = Scheduler::new(ConcurrencyLimit::default(), Arc::default());
        let outcome = scheduler.run(&[], |_| Ok(()));
        assert_eq!(outcome, BatchOutcome::default());
        assert_eq!(scheduler.tracker().snapshot().planned, 0);
    }

    #[test]
    fn failures_and_panics_still_complete() {
        let scheduler = Scheduler::new(ConcurrencyLimit::try_from(3).unwrap(), Arc::default());
        let tasks = vec![task("ok"), task("fail"), task("panic"), task("ok2")];

        let outcome = scheduler.run(&tasks, |task| match task.name.as_str() {
            "fail" => Err(ScryError::Network("boom".to_string())),
            "panic" => panic!("worker blew up"),
            _ => Ok(()),
        });

        assert_eq!(outcome.completed, 4);
        assert_eq!(outcome.succeeded, 2);
        assert!(scheduler.tracker().snapshot().is_finished());
    }
}
