//! Per-request exchange state.
//!
//! One [`ExchangeState`] exists per coordinator (and therefore per logical
//! request). It is the only mutable state shared between the request
//! thread, the worker, and the host's timeout/completion callbacks.

use crate::adapter::AsyncWebRequest;
use crate::interceptor::{CallableInterceptor, DeferredResultInterceptor};
use crate::result::ConcurrentResult;
use crate::runner::{RunnerHandle, TaskRunner, ThreadTaskRunner};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Locks a mutex, recovering from poisoning.
///
/// A panic inside an interceptor or work unit must not wedge the exchange;
/// the state remains usable for the timeout/completion paths.
pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mutable per-request record guarded by the coordinator's mutex.
pub(crate) struct ExchangeState {
    /// The host-runtime adapter for the current exchange, if installed.
    pub(crate) adapter: Option<Arc<dyn AsyncWebRequest>>,

    /// The captured outcome of the current async cycle.
    ///
    /// Written at most once per cycle; the write doubles as the
    /// "finalization happened" guard.
    pub(crate) result: Option<Arc<ConcurrentResult>>,

    /// Callable interceptors in registration order.
    pub(crate) callable_interceptors: Vec<(String, Arc<dyn CallableInterceptor>)>,

    /// Deferred-result interceptors in registration order.
    pub(crate) deferred_interceptors: Vec<(String, Arc<dyn DeferredResultInterceptor>)>,

    /// Runner used when a descriptor carries no override.
    pub(crate) runner: Arc<dyn TaskRunner>,

    /// Handle to in-flight work, cancelled by a competing finalization.
    pub(crate) runner_handle: Option<RunnerHandle>,
}

impl ExchangeState {
    pub(crate) fn new() -> Self {
        Self {
            adapter: None,
            result: None,
            callable_interceptors: Vec::new(),
            deferred_interceptors: Vec::new(),
            runner: Arc::new(ThreadTaskRunner::new()),
            runner_handle: None,
        }
    }
}
