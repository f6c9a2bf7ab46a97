//! Deferred results - producer-settled outcomes.
//!
//! A [`DeferredResult`] is handed to the coordinator instead of a work
//! unit when the result will be produced elsewhere: another thread, a
//! message listener, a downstream service callback. The handle is settable
//! exactly once, from any thread, and becomes connected to the exchange
//! only after pre-process interceptors have run and the exchange is
//! suspended - settling early is safe, delivery waits for the connection.

use crate::core::AsyncCoordinator;
use crate::error::StartError;
use crate::interceptor::DeferredChain;
use crate::result::{ConcurrentResult, TaskFailure};
use crate::state::lock_unpoisoned;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

type ResultSink = Box<dyn FnOnce(ConcurrentResult) + Send>;
type TimeoutCallback = Box<dyn FnOnce() + Send>;

struct DeferredState {
    settled: bool,
    expired: bool,
    claimed: bool,
    /// Outcome settled before the coordinator connected the sink.
    pending: Option<ConcurrentResult>,
    sink: Option<ResultSink>,
    timeout_callback: Option<TimeoutCallback>,
}

/// A future-like handle settable exactly once by arbitrary producer code.
///
/// Clones share the same underlying slot. The type parameter is the value
/// type accepted by [`set_result`](Self::set_result); the handle itself is
/// freely sendable regardless of `T`.
///
/// # Example
///
/// ```ignore
/// use holdover::DeferredResult;
/// use std::time::Duration;
///
/// let deferred = DeferredResult::with_timeout(Duration::from_secs(5));
/// coordinator.start_deferred_result_processing(&deferred)?;
///
/// let producer = deferred.clone();
/// std::thread::spawn(move || {
///     producer.set_result("abc");
/// });
/// ```
pub struct DeferredResult<T> {
    inner: Arc<Mutex<DeferredState>>,
    timeout: Option<Duration>,
    _marker: PhantomData<fn(T)>,
}

impl<T> Clone for DeferredResult<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            timeout: self.timeout,
            _marker: PhantomData,
        }
    }
}

impl<T> Default for DeferredResult<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DeferredResult<T> {
    /// Creates a handle with no timeout.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Creates a handle whose exchange times out after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::build(Some(timeout))
    }

    fn build(timeout: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(DeferredState {
                settled: false,
                expired: false,
                claimed: false,
                pending: None,
                sink: None,
                timeout_callback: None,
            })),
            timeout,
            _marker: PhantomData,
        }
    }

    /// Returns the timeout carried by this handle, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Whether the handle has been settled (result or error).
    pub fn is_settled(&self) -> bool {
        lock_unpoisoned(&self.inner).settled
    }

    /// Settles the handle with a value.
    ///
    /// Returns `false` if the handle was already settled or the exchange
    /// has completed (expired handle).
    pub fn set_result(&self, value: T) -> bool
    where
        T: Send + Sync + 'static,
    {
        self.settle(ConcurrentResult::from_value(value))
    }

    /// Settles the handle with a failure.
    ///
    /// Same at-most-once semantics as [`set_result`](Self::set_result).
    pub fn set_error_result(&self, failure: TaskFailure) -> bool {
        self.settle(ConcurrentResult::Failure(failure))
    }

    /// Installs a producer callback invoked when the exchange times out
    /// before the handle is settled. The callback may settle the handle
    /// with a fallback value; if it does not, interceptor timeout hooks
    /// decide the outcome.
    pub fn on_timeout(&self, callback: impl FnOnce() + Send + 'static) {
        lock_unpoisoned(&self.inner).timeout_callback = Some(Box::new(callback));
    }

    fn settle(&self, outcome: ConcurrentResult) -> bool {
        let delivery = {
            let mut state = lock_unpoisoned(&self.inner);
            if state.settled || state.expired {
                return false;
            }
            state.settled = true;
            match state.sink.take() {
                Some(sink) => Some((sink, outcome)),
                None => {
                    state.pending = Some(outcome);
                    None
                }
            }
        };
        if let Some((sink, outcome)) = delivery {
            sink(outcome);
        }
        true
    }

    /// Claims the handle for one processing cycle.
    pub(crate) fn claim(&self) -> bool {
        let mut state = lock_unpoisoned(&self.inner);
        if state.claimed {
            return false;
        }
        state.claimed = true;
        true
    }

    /// Connects the result sink. An outcome settled before the connection
    /// is delivered immediately, on the connecting thread.
    pub(crate) fn connect(&self, sink: ResultSink) {
        let ready = {
            let mut state = lock_unpoisoned(&self.inner);
            match state.pending.take() {
                Some(outcome) => Some((sink, outcome)),
                None => {
                    state.sink = Some(sink);
                    None
                }
            }
        };
        if let Some((sink, outcome)) = ready {
            sink(outcome);
        }
    }

    /// Runs the producer timeout callback, if any. Returns `true` when the
    /// handle ended up settled (the callback supplied a fallback).
    pub(crate) fn fire_timeout_callback(&self) -> bool {
        let callback = lock_unpoisoned(&self.inner).timeout_callback.take();
        if let Some(callback) = callback {
            callback();
        }
        lock_unpoisoned(&self.inner).settled
    }

    /// Marks the handle expired; later settles are rejected.
    pub(crate) fn expire(&self) {
        lock_unpoisoned(&self.inner).expired = true;
    }
}

impl<T> std::fmt::Debug for DeferredResult<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock_unpoisoned(&self.inner);
        f.debug_struct("DeferredResult")
            .field("settled", &state.settled)
            .field("expired", &state.expired)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl AsyncCoordinator {
    /// Starts concurrent handling for a deferred result.
    ///
    /// On success the exchange is suspended and the handle is connected:
    /// whichever thread settles it runs the post-process chain, records the
    /// concurrent result, and resumes the exchange exactly once. Ordering
    /// is guaranteed even when the producer settles the handle before this
    /// method finishes - pre-process always precedes post-process.
    ///
    /// # Errors
    ///
    /// - [`StartError::IllegalState`] when no async web request is
    ///   installed.
    /// - [`StartError::InvalidArgument`] when the handle is already claimed
    ///   by a processing cycle.
    pub fn start_deferred_result_processing<T: 'static>(
        &self,
        deferred: &DeferredResult<T>,
    ) -> Result<(), StartError> {
        let (adapter, chain) = {
            let state = self.lock_state();
            let Some(adapter) = state.adapter.clone() else {
                return Err(StartError::IllegalState("AsyncWebRequest must not be null"));
            };
            let chain = DeferredChain::new(
                state
                    .deferred_interceptors
                    .iter()
                    .map(|(_, interceptor)| Arc::clone(interceptor))
                    .collect(),
            );
            (adapter, chain)
        };
        if !deferred.claim() {
            return Err(StartError::InvalidArgument("DeferredResult already in use"));
        }

        if let Some(timeout) = deferred.timeout() {
            debug!(
                timeout_ms = timeout.as_millis() as u64,
                "propagating deferred timeout to async request"
            );
            adapter.set_timeout(timeout);
        }

        let coordinator = self.clone();
        let timeout_adapter = Arc::clone(&adapter);
        let timeout_chain = chain.clone();
        let timeout_handle = deferred.clone();
        adapter.set_timeout_handler(Box::new(move || {
            if coordinator.has_concurrent_result() {
                return;
            }
            if timeout_handle.fire_timeout_callback() {
                debug!("deferred timeout callback settled the result");
                return;
            }
            warn!("async request timed out before the deferred result was set");
            let outcome = timeout_chain.apply_timeout(timeout_adapter.as_ref());
            coordinator.finalize_and_dispatch(outcome);
        }));

        let completion_adapter = Arc::clone(&adapter);
        let completion_chain = chain.clone();
        let completion_handle = deferred.clone();
        adapter.add_completion_handler(Box::new(move || {
            completion_chain.trigger_completion(completion_adapter.as_ref());
            completion_handle.expire();
        }));

        let pre = chain.apply_pre_process(adapter.as_ref());
        adapter.start_async();
        debug!("concurrent handling started for deferred result");

        if let Err(failure) = pre {
            warn!(error = %failure, "pre-process interceptor failed, deferred result not connected");
            self.finalize_and_dispatch(ConcurrentResult::Failure(failure));
            return Ok(());
        }

        let coordinator = self.clone();
        let sink_adapter = Arc::clone(&adapter);
        let sink_chain = chain;
        deferred.connect(Box::new(move |outcome| {
            let outcome = sink_chain.apply_post_process(sink_adapter.as_ref(), outcome);
            coordinator.finalize_and_dispatch(outcome);
        }));
        Ok(())
    }
}
