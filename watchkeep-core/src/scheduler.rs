//! Schedulers for work deferred off the load path.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;
use tracing::debug;
use watchkeep_contracts::scheduler::{DeferredFuture, TaskScheduler};

/// Spawns deferred work on a Tokio runtime.
///
/// Every task yields once before its body runs, so a host that schedules work
/// while building its first frame gets that frame out first. Spawned tasks
/// are tracked; [`drain`](Self::drain) lets a host wait for them on
/// shutdown.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
    tracker: TaskTracker,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            tracker: TaskTracker::new(),
        }
    }

    /// Scheduler bound to the runtime of the calling context, if any.
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }

    /// Number of spawned tasks that have not finished.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Wait for every spawned task to finish. The scheduler accepts new work
    /// again afterwards.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

impl TaskScheduler for TokioScheduler {
    fn schedule(&self, task: DeferredFuture) {
        debug!(target: "watchkeep::scheduler", "spawning deferred task");
        self.tracker.spawn_on(
            async move {
                tokio::task::yield_now().await;
                task.await;
            },
            &self.handle,
        );
    }
}

/// Holds deferred work until the host explicitly runs it.
///
/// Useful for hosts with their own frame loop and for deterministic tests.
#[derive(Clone, Default)]
pub struct QueuedScheduler {
    queue: Arc<Mutex<VecDeque<DeferredFuture>>>,
}

impl QueuedScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Run queued tasks to completion, one after another, including tasks
    /// queued while running. Returns how many ran.
    pub async fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.lock().pop_front();
            let Some(task) = next else {
                return ran;
            };
            task.await;
            ran += 1;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<DeferredFuture>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for QueuedScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

impl TaskScheduler for QueuedScheduler {
    fn schedule(&self, task: DeferredFuture) {
        self.lock().push_back(task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn queued_tasks_wait_for_explicit_run() {
        let scheduler = QueuedScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let counter = Arc::clone(&counter);
            scheduler.schedule(
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
                .boxed(),
            );
        }

        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.run_pending().await, 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn tokio_tasks_start_after_the_caller_yields() {
        let scheduler =
            TokioScheduler::try_current().expect("inside a runtime");
        let counter = Arc::new(AtomicUsize::new(0));

        let task_counter = Arc::clone(&counter);
        scheduler.schedule(
            async move {
                task_counter.fetch_add(1, Ordering::SeqCst);
            }
            .boxed(),
        );

        assert_eq!(counter.load(Ordering::SeqCst), 0);
        scheduler.drain().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending(), 0);
    }
}
