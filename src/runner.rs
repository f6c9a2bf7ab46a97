//! Task runner contract and implementations.
//!
//! The coordinator hands the wrapped unit of work to a [`TaskRunner`] and
//! gets back an optional [`RunnerHandle`]. Three implementations cover the
//! deployment spectrum:
//!
//! - [`ThreadTaskRunner`] - one worker thread per submission (the default)
//! - [`TokioTaskRunner`] - `spawn_blocking` on the ambient tokio runtime
//! - [`SyncTaskRunner`] - runs inline on the submitting thread, for tests
//!   and fully synchronous hosts

use std::fmt;
use tracing::error;

/// A wrapped unit of work ready for execution. Runs exactly once.
pub type UnitOfWork = Box<dyn FnOnce() + Send + 'static>;

/// Executes submitted units of work.
pub trait TaskRunner: Send + Sync {
    /// Submits a unit of work for execution.
    ///
    /// Returns a handle when the runner can cancel the work best-effort,
    /// `None` otherwise.
    fn submit(&self, work: UnitOfWork) -> Option<RunnerHandle>;

    /// Returns the runner name for logging.
    fn name(&self) -> &str;
}

/// Handle to submitted work with an optional best-effort cancel hook.
///
/// Cancellation never interrupts work that is already running; it only
/// prevents work that has not started yet (e.g. a queued `spawn_blocking`
/// task) from starting.
pub struct RunnerHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl RunnerHandle {
    /// Creates a handle with a cancel hook.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Creates a handle that cannot cancel its work.
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    /// Requests best-effort cancellation of the work.
    pub fn cancel(self) {
        if let Some(cancel) = self.cancel {
            cancel();
        }
    }
}

impl fmt::Debug for RunnerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnerHandle")
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

/// Thread-per-task runner: each submission gets its own worker thread.
///
/// This is the coordinator default. Threads are detached; there is no
/// cancel hook.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadTaskRunner;

impl ThreadTaskRunner {
    /// Creates a new thread-per-task runner.
    pub fn new() -> Self {
        Self
    }
}

impl TaskRunner for ThreadTaskRunner {
    fn submit(&self, work: UnitOfWork) -> Option<RunnerHandle> {
        if let Err(err) = std::thread::Builder::new()
            .name("holdover-work".into())
            .spawn(work)
        {
            // The work is lost; the cycle resolves via its timeout, if any.
            error!(error = %err, "failed to spawn worker thread for submitted work");
        }
        None
    }

    fn name(&self) -> &str {
        "thread-per-task"
    }
}

/// Tokio-backed runner: submits work via `spawn_blocking` on the runtime
/// that is current at submission time.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioTaskRunner;

impl TokioTaskRunner {
    /// Creates a new tokio-backed runner.
    pub fn new() -> Self {
        Self
    }
}

impl TaskRunner for TokioTaskRunner {
    fn submit(&self, work: UnitOfWork) -> Option<RunnerHandle> {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            error!("no tokio runtime available, dropping submitted work");
            return None;
        };
        let handle = runtime.spawn_blocking(work);
        Some(RunnerHandle::new(move || handle.abort()))
    }

    fn name(&self) -> &str {
        "tokio-spawn-blocking"
    }
}

/// Synchronous runner: executes the work inline on the submitting thread.
///
/// Useful for tests and for hosts that dispatch from their own worker
/// threads already.
#[derive(Clone, Copy, Debug, Default)]
pub struct SyncTaskRunner;

impl SyncTaskRunner {
    /// Creates a new synchronous runner.
    pub fn new() -> Self {
        Self
    }
}

impl TaskRunner for SyncTaskRunner {
    fn submit(&self, work: UnitOfWork) -> Option<RunnerHandle> {
        work();
        None
    }

    fn name(&self) -> &str {
        "sync"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Arc};
    use std::time::Duration;

    #[test]
    fn test_sync_runner_executes_inline() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let handle = SyncTaskRunner::new().submit(Box::new(move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(handle.is_none());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_thread_runner_executes_on_worker_thread() {
        let (tx, rx) = mpsc::channel();

        let handle = ThreadTaskRunner::new().submit(Box::new(move || {
            let name = std::thread::current()
                .name()
                .unwrap_or_default()
                .to_string();
            tx.send(name).unwrap();
        }));

        assert!(handle.is_none());
        let name = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(name, "holdover-work");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_tokio_runner_executes_work() {
        let (tx, rx) = mpsc::channel();

        let handle = TokioTaskRunner::new().submit(Box::new(move || {
            tx.send(42).unwrap();
        }));

        assert!(handle.is_some());
        let value = tokio::task::spawn_blocking(move || rx.recv_timeout(Duration::from_secs(2)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_tokio_runner_without_runtime_returns_none() {
        let handle = TokioTaskRunner::new().submit(Box::new(|| {}));
        assert!(handle.is_none());
    }

    #[test]
    fn test_detached_handle_cancel_is_a_no_op() {
        RunnerHandle::detached().cancel();
    }

    #[test]
    fn test_handle_cancel_invokes_hook() {
        let cancelled = Arc::new(AtomicUsize::new(0));
        let cancelled_clone = Arc::clone(&cancelled);

        let handle = RunnerHandle::new(move || {
            cancelled_clone.fetch_add(1, Ordering::SeqCst);
        });
        handle.cancel();

        assert_eq!(cancelled.load(Ordering::SeqCst), 1);
    }
}
