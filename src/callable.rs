//! Callable processing - the submitted-work-unit path.
//!
//! The request thread validates the descriptor, wires the host callbacks,
//! runs pre-process hooks, suspends the exchange, and submits the work.
//! The worker thread runs the work, the post-process chain, and the single
//! finalize-and-dispatch.

use crate::core::AsyncCoordinator;
use crate::error::StartError;
use crate::interceptor::CallableChain;
use crate::result::{ConcurrentResult, TaskFailure};
use crate::task::AsyncTask;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

impl AsyncCoordinator {
    /// Starts concurrent handling of the given work descriptor.
    ///
    /// On success the exchange is suspended and the work is running (or
    /// queued) on the task runner; the outcome - value, failure, caught
    /// panic, or timeout substitute - is recorded as the concurrent result
    /// and the exchange is resumed exactly once.
    ///
    /// A failing pre-process interceptor is not an error of this method:
    /// the failure becomes the concurrent result, the work is never
    /// submitted, and the exchange is resumed immediately.
    ///
    /// # Errors
    ///
    /// - [`StartError::InvalidArgument`] when the descriptor carries no
    ///   work unit (checked before the adapter is touched).
    /// - [`StartError::IllegalState`] when no async web request is
    ///   installed.
    pub fn start_callable_processing(&self, task: AsyncTask) -> Result<(), StartError> {
        let AsyncTask {
            work,
            timeout,
            runner,
        } = task;
        let Some(work) = work else {
            return Err(StartError::InvalidArgument("work unit must not be null"));
        };

        let (adapter, runner, chain) = {
            let state = self.lock_state();
            let Some(adapter) = state.adapter.clone() else {
                return Err(StartError::IllegalState("AsyncWebRequest must not be null"));
            };
            let runner = runner.unwrap_or_else(|| Arc::clone(&state.runner));
            let chain = CallableChain::new(
                state
                    .callable_interceptors
                    .iter()
                    .map(|(_, interceptor)| Arc::clone(interceptor))
                    .collect(),
            );
            (adapter, runner, chain)
        };

        if let Some(timeout) = timeout {
            debug!(
                timeout_ms = timeout.as_millis() as u64,
                "propagating task timeout to async request"
            );
            adapter.set_timeout(timeout);
        }

        let coordinator = self.clone();
        let timeout_adapter = Arc::clone(&adapter);
        let timeout_chain = chain.clone();
        adapter.set_timeout_handler(Box::new(move || {
            if coordinator.has_concurrent_result() {
                return;
            }
            warn!("async request timed out before the work unit completed");
            let outcome = timeout_chain.apply_timeout(timeout_adapter.as_ref());
            coordinator.finalize_and_dispatch(outcome);
        }));

        let completion_adapter = Arc::clone(&adapter);
        let completion_chain = chain.clone();
        adapter.add_completion_handler(Box::new(move || {
            completion_chain.trigger_completion(completion_adapter.as_ref());
        }));

        // Pre-process runs on the request thread, before suspension. The
        // exchange is suspended regardless: a pre-process failure still
        // travels to the handler chain via dispatch.
        let pre = chain.apply_pre_process(adapter.as_ref());
        adapter.start_async();
        debug!(runner = runner.name(), "concurrent handling started");

        if let Err(failure) = pre {
            warn!(error = %failure, "pre-process interceptor failed, aborting submission");
            self.finalize_and_dispatch(ConcurrentResult::Failure(failure));
            return Ok(());
        }

        let coordinator = self.clone();
        let work_adapter = Arc::clone(&adapter);
        let work_chain = chain;
        let handle = runner.submit(Box::new(move || {
            let outcome = match catch_unwind(AssertUnwindSafe(work)) {
                Ok(Ok(value)) => ConcurrentResult::Value(value),
                Ok(Err(failure)) => ConcurrentResult::Failure(failure),
                Err(payload) => {
                    ConcurrentResult::Failure(TaskFailure::panic(panic_message(payload.as_ref())))
                }
            };
            if let ConcurrentResult::Failure(failure) = &outcome {
                work_chain.notify_error(work_adapter.as_ref(), failure);
            }
            let outcome = work_chain.apply_post_process(work_adapter.as_ref(), outcome);
            coordinator.finalize_and_dispatch(outcome);
        }));
        if let Some(handle) = handle {
            self.lock_state().runner_handle = Some(handle);
        }
        Ok(())
    }
}

/// Extracts a readable message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("work unit panicked")
    }
}
