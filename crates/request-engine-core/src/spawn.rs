//! Task-spawning abstraction used for the queue's background processing loop
//! and the cache's periodic persistence task.
//!
//! Kept as a trait (rather than calling `tokio::spawn` directly) so the
//! engine's internals stay testable under `tokio::test` with a single
//! current-thread runtime, matching the pattern used throughout this
//! codebase for injecting runtime dependencies.

use std::future::Future;
use std::pin::Pin;

/// A spawned background task handle. Dropping it does not cancel the task;
/// call [`TaskHandle::abort`] explicitly.
pub struct TaskHandle {
    inner: tokio::task::JoinHandle<()>,
}

impl TaskHandle {
    pub fn abort(&self) {
        self.inner.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Awaits task completion, swallowing a panic inside the task (logged by
    /// the caller if it cares) rather than propagating it to the joiner.
    pub async fn join(self) {
        let _ = self.inner.await;
    }
}

/// Spawns futures onto an async runtime. Implemented by [`TokioSpawner`] for
/// production use.
pub trait Spawner: Send + Sync {
    fn spawn(&self, future: Pin<Box<dyn Future<Output = ()> + Send>>) -> TaskHandle;
}

/// [`Spawner`] backed by `tokio::spawn`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSpawner;

impl Spawner for TokioSpawner {
    fn spawn(&self, future: Pin<Box<dyn Future<Output = ()> + Send>>) -> TaskHandle {
        TaskHandle {
            inner: tokio::spawn(future),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn tokio_spawner_runs_future() {
        let flag = Arc::new(AtomicBool::new(false));
        let flag_clone = Arc::clone(&flag);

        let spawner = TokioSpawner;
        let handle = spawner.spawn(Box::pin(async move {
            flag_clone.store(true, Ordering::SeqCst);
        }));

        while !handle.is_finished() {
            tokio::task::yield_now().await;
        }

        assert!(flag.load(Ordering::SeqCst));
    }
}
