//! Async coordinator core - struct, registration, and queries.
//!
//! This module contains the [`AsyncCoordinator`] struct and its state
//! management methods. Processing entry points are implemented in separate
//! modules:
//! - `callable`: submitted work unit processing
//! - `deferred`: deferred-result processing
//! - `dispatch`: the single finalize-and-resume path

use crate::adapter::AsyncWebRequest;
use crate::error::StartError;
use crate::interceptor::{CallableInterceptor, DeferredResultInterceptor};
use crate::result::ConcurrentResult;
use crate::runner::TaskRunner;
use crate::state::{lock_unpoisoned, ExchangeState};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Per-request coordinator for asynchronous exchange handling.
///
/// The coordinator suspends the exchange, hands the work to a task runner,
/// captures the single outcome, and triggers resumption exactly once - no
/// matter whether the work completes, fails, panics, or times out.
///
/// It is not a threading primitive: every method runs on whichever thread
/// the host runtime or task runner calls from. Clones share the same
/// underlying exchange state.
///
/// # Example
///
/// ```ignore
/// use holdover::{AsyncCoordinator, AsyncTask};
///
/// let coordinator = AsyncCoordinator::new();
/// coordinator.set_async_web_request(adapter)?;
/// coordinator.start_callable_processing(AsyncTask::new(|| Ok(load_report()?)))?;
/// // ...the host re-invokes the handler chain after dispatch:
/// let result = coordinator.get_concurrent_result();
/// ```
#[derive(Clone)]
pub struct AsyncCoordinator {
    pub(crate) state: Arc<Mutex<ExchangeState>>,
}

impl AsyncCoordinator {
    /// Creates a coordinator with no adapter and the default runner.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ExchangeState::new())),
        }
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, ExchangeState> {
        lock_unpoisoned(&self.state)
    }

    /// Installs the adapter for the current exchange.
    ///
    /// Fails with [`StartError::InvalidArgument`] while a previously
    /// installed adapter reports async handling in progress - replacing it
    /// then would orphan the in-flight suspend.
    ///
    /// Installing an adapter also registers a completion handler that
    /// clears the per-cycle state, so the same coordinator can serve
    /// re-entrant async chains on one logical request.
    pub fn set_async_web_request(
        &self,
        adapter: Arc<dyn AsyncWebRequest>,
    ) -> Result<(), StartError> {
        {
            let mut state = self.lock_state();
            if let Some(current) = &state.adapter {
                if current.is_async_started() {
                    return Err(StartError::InvalidArgument(
                        "AsyncWebRequest must not be replaced during concurrent handling",
                    ));
                }
            }
            state.adapter = Some(Arc::clone(&adapter));
        }

        let coordinator = self.clone();
        adapter.add_completion_handler(Box::new(move || {
            debug!("async request completed, clearing exchange state");
            coordinator.clear_concurrent_result();
        }));
        Ok(())
    }

    /// Replaces the coordinator-default task runner.
    pub fn set_task_runner(&self, runner: Arc<dyn TaskRunner>) {
        self.lock_state().runner = runner;
    }

    /// Registers a callable interceptor under the given key.
    ///
    /// Interceptors run in registration order; re-registering an existing
    /// key replaces the interceptor in place, keeping its position.
    pub fn register_callable_interceptor(
        &self,
        key: impl Into<String>,
        interceptor: Arc<dyn CallableInterceptor>,
    ) {
        let key = key.into();
        let mut state = self.lock_state();
        if let Some(slot) = state
            .callable_interceptors
            .iter_mut()
            .find(|(existing, _)| *existing == key)
        {
            slot.1 = interceptor;
        } else {
            state.callable_interceptors.push((key, interceptor));
        }
    }

    /// Registers a deferred-result interceptor under the given key.
    ///
    /// Same ordering and replacement rules as
    /// [`register_callable_interceptor`](Self::register_callable_interceptor).
    pub fn register_deferred_result_interceptor(
        &self,
        key: impl Into<String>,
        interceptor: Arc<dyn DeferredResultInterceptor>,
    ) {
        let key = key.into();
        let mut state = self.lock_state();
        if let Some(slot) = state
            .deferred_interceptors
            .iter_mut()
            .find(|(existing, _)| *existing == key)
        {
            slot.1 = interceptor;
        } else {
            state.deferred_interceptors.push((key, interceptor));
        }
    }

    /// Whether concurrent handling has started on the current exchange.
    ///
    /// Delegates to the adapter's own flag; `false` when no adapter is
    /// installed.
    pub fn is_concurrent_handling_started(&self) -> bool {
        self.lock_state()
            .adapter
            .as_ref()
            .map(|adapter| adapter.is_async_started())
            .unwrap_or(false)
    }

    /// Whether an outcome has been captured for the current cycle.
    pub fn has_concurrent_result(&self) -> bool {
        self.lock_state().result.is_some()
    }

    /// Returns the captured outcome of the current cycle, if any.
    pub fn get_concurrent_result(&self) -> Option<Arc<ConcurrentResult>> {
        self.lock_state().result.clone()
    }

    /// Clears the per-cycle state (captured result and in-flight work
    /// handle), preparing the coordinator for another async cycle.
    pub fn clear_concurrent_result(&self) {
        let stale_handle = {
            let mut state = self.lock_state();
            state.result = None;
            state.runner_handle.take()
        };
        if let Some(handle) = stale_handle {
            handle.cancel();
        }
    }
}

impl Default for AsyncCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AsyncCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock_state();
        f.debug_struct("AsyncCoordinator")
            .field("has_adapter", &state.adapter.is_some())
            .field("has_concurrent_result", &state.result.is_some())
            .field("callable_interceptors", &state.callable_interceptors.len())
            .field("deferred_interceptors", &state.deferred_interceptors.len())
            .finish()
    }
}
