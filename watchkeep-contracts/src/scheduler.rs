use futures::future::BoxFuture;

/// Work handed off the load path.
pub type DeferredFuture = BoxFuture<'static, ()>;

/// Host-provided scheduler for deferred tasks.
///
/// Implementations must not poll `task` before `schedule` returns; the task
/// starts only after the host has yielded at least once. Scheduled work is not
/// awaited by the caller and is never cancelled once started.
pub trait TaskScheduler: Send + Sync {
    /// Take ownership of `task` and start it later.
    fn schedule(&self, task: DeferredFuture);
}
