//! Task submission descriptor.
//!
//! An [`AsyncTask`] pairs a unit of work with an optional timeout and an
//! optional runner override. The descriptor is immutable once submitted to
//! [`crate::AsyncCoordinator::start_callable_processing`].

use crate::result::{ResultValue, TaskFailure};
use crate::runner::TaskRunner;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Type-erased unit of work carried by a descriptor.
pub(crate) type WorkUnit = Box<dyn FnOnce() -> Result<ResultValue, TaskFailure> + Send + 'static>;

/// A unit of work submitted for concurrent handling.
///
/// # Example
///
/// ```ignore
/// use holdover::AsyncTask;
/// use std::time::Duration;
///
/// let task = AsyncTask::with_timeout(Duration::from_secs(5), || Ok(load_report()?));
/// coordinator.start_callable_processing(task)?;
/// ```
pub struct AsyncTask {
    pub(crate) work: Option<WorkUnit>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) runner: Option<Arc<dyn TaskRunner>>,
}

impl AsyncTask {
    /// Creates a descriptor for the given work unit, with no timeout and
    /// the coordinator-default runner.
    pub fn new<T, F>(work: F) -> Self
    where
        F: FnOnce() -> Result<T, TaskFailure> + Send + 'static,
        T: Send + Sync + 'static,
    {
        Self::builder().work(work).build()
    }

    /// Creates a descriptor with a timeout.
    pub fn with_timeout<T, F>(timeout: Duration, work: F) -> Self
    where
        F: FnOnce() -> Result<T, TaskFailure> + Send + 'static,
        T: Send + Sync + 'static,
    {
        Self::builder().work(work).timeout(timeout).build()
    }

    /// Returns a builder for assembling a descriptor piecewise.
    pub fn builder() -> AsyncTaskBuilder {
        AsyncTaskBuilder::default()
    }

    /// Returns the descriptor timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Whether the descriptor carries a work unit.
    ///
    /// A builder-produced descriptor without one is rejected at submission.
    pub fn has_work(&self) -> bool {
        self.work.is_some()
    }
}

impl fmt::Debug for AsyncTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncTask")
            .field("has_work", &self.work.is_some())
            .field("timeout", &self.timeout)
            .field("runner_override", &self.runner.as_ref().map(|r| r.name()))
            .finish()
    }
}

/// Builder for [`AsyncTask`].
#[derive(Default)]
pub struct AsyncTaskBuilder {
    work: Option<WorkUnit>,
    timeout: Option<Duration>,
    runner: Option<Arc<dyn TaskRunner>>,
}

impl AsyncTaskBuilder {
    /// Sets the unit of work.
    pub fn work<T, F>(mut self, work: F) -> Self
    where
        F: FnOnce() -> Result<T, TaskFailure> + Send + 'static,
        T: Send + Sync + 'static,
    {
        self.work = Some(Box::new(move || {
            work().map(|value| Box::new(value) as ResultValue)
        }));
        self
    }

    /// Sets the timeout propagated to the async web request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Overrides the runner used for this submission.
    pub fn runner(mut self, runner: Arc<dyn TaskRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Builds the descriptor. A missing work unit is not an error here;
    /// the coordinator rejects it at submission time.
    pub fn build(self) -> AsyncTask {
        AsyncTask {
            work: self.work,
            timeout: self.timeout,
            runner: self.runner,
        }
    }
}
