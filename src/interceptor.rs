//! Interceptor hooks invoked around the async lifecycle.
//!
//! Interceptors are pure policy injection points: security checks, request
//! attribute propagation, metrics. They are registered on the coordinator
//! under a string key and invoked in registration order for every hook -
//! pre-process, post-process, timeout, error, and completion alike.
//!
//! All hooks have defaulted no-op implementations; implement only what the
//! policy needs.

use crate::adapter::AsyncWebRequest;
use crate::result::{ConcurrentResult, ResultValue, TaskFailure, ASYNC_TIMEOUT_MESSAGE};
use std::sync::Arc;
use tracing::warn;

/// Hooks around callable (submitted work unit) processing.
pub trait CallableInterceptor: Send + Sync {
    /// Runs on the request thread before the exchange is suspended and the
    /// work is submitted. A failure aborts submission and becomes the
    /// concurrent result.
    fn pre_process(&self, _request: &dyn AsyncWebRequest) -> Result<(), TaskFailure> {
        Ok(())
    }

    /// Runs after the work unit finishes, with the captured outcome.
    /// A failure replaces the concurrent result and short-circuits the
    /// remaining post-process hooks.
    fn post_process(
        &self,
        _request: &dyn AsyncWebRequest,
        _outcome: &ConcurrentResult,
    ) -> Result<(), TaskFailure> {
        Ok(())
    }

    /// Runs when the exchange times out before the work completes.
    ///
    /// Return `Ok(Some(value))` to substitute a result, `Ok(None)` to let
    /// the next interceptor decide, or `Err` to record a failure. If every
    /// interceptor declines, a timeout failure is recorded.
    fn on_timeout(
        &self,
        _request: &dyn AsyncWebRequest,
    ) -> Result<Option<ResultValue>, TaskFailure> {
        Ok(None)
    }

    /// Notified when the work outcome is a failure (including a caught
    /// panic), before post-process hooks observe it.
    fn on_error(&self, _request: &dyn AsyncWebRequest, _failure: &TaskFailure) {}

    /// Runs when the exchange fully completes, after resume.
    fn on_completion(&self, _request: &dyn AsyncWebRequest) {}
}

/// Hooks around deferred-result processing.
pub trait DeferredResultInterceptor: Send + Sync {
    /// Runs on the request thread before the exchange is suspended and the
    /// handle becomes settable. A failure aborts processing and becomes the
    /// concurrent result.
    fn pre_process(&self, _request: &dyn AsyncWebRequest) -> Result<(), TaskFailure> {
        Ok(())
    }

    /// Runs after the handle is settled, with the settled outcome.
    /// A failure replaces the concurrent result and short-circuits the
    /// remaining post-process hooks.
    fn post_process(
        &self,
        _request: &dyn AsyncWebRequest,
        _outcome: &ConcurrentResult,
    ) -> Result<(), TaskFailure> {
        Ok(())
    }

    /// Runs when the exchange times out before the handle is settled,
    /// after the handle's own timeout callback declined to settle it.
    fn on_timeout(
        &self,
        _request: &dyn AsyncWebRequest,
    ) -> Result<Option<ResultValue>, TaskFailure> {
        Ok(None)
    }

    /// Runs when the exchange fully completes, after resume.
    fn on_completion(&self, _request: &dyn AsyncWebRequest) {}
}

/// Immutable snapshot of the callable interceptors registered at
/// submission time. Cheap to clone into the timeout/completion/worker
/// closures.
#[derive(Clone)]
pub(crate) struct CallableChain {
    interceptors: Arc<[Arc<dyn CallableInterceptor>]>,
}

impl CallableChain {
    pub(crate) fn new(interceptors: Vec<Arc<dyn CallableInterceptor>>) -> Self {
        Self {
            interceptors: interceptors.into(),
        }
    }

    /// Invokes pre-process hooks in registration order, stopping at the
    /// first failure.
    pub(crate) fn apply_pre_process(
        &self,
        request: &dyn AsyncWebRequest,
    ) -> Result<(), TaskFailure> {
        for interceptor in self.interceptors.iter() {
            interceptor.pre_process(request)?;
        }
        Ok(())
    }

    /// Invokes post-process hooks in registration order. A hook failure
    /// replaces the outcome and short-circuits the rest.
    pub(crate) fn apply_post_process(
        &self,
        request: &dyn AsyncWebRequest,
        outcome: ConcurrentResult,
    ) -> ConcurrentResult {
        for interceptor in self.interceptors.iter() {
            if let Err(failure) = interceptor.post_process(request, &outcome) {
                warn!(
                    error = %failure,
                    "post-process interceptor failed, replacing concurrent result"
                );
                return ConcurrentResult::Failure(failure);
            }
        }
        outcome
    }

    /// Invokes timeout hooks in registration order until one supplies a
    /// result or fails; exhaustion yields a timeout failure.
    pub(crate) fn apply_timeout(&self, request: &dyn AsyncWebRequest) -> ConcurrentResult {
        for interceptor in self.interceptors.iter() {
            match interceptor.on_timeout(request) {
                Ok(None) => continue,
                Ok(Some(value)) => return ConcurrentResult::Value(value),
                Err(failure) => return ConcurrentResult::Failure(failure),
            }
        }
        ConcurrentResult::Failure(TaskFailure::timeout(ASYNC_TIMEOUT_MESSAGE))
    }

    /// Notifies error hooks in registration order.
    pub(crate) fn notify_error(&self, request: &dyn AsyncWebRequest, failure: &TaskFailure) {
        for interceptor in self.interceptors.iter() {
            interceptor.on_error(request, failure);
        }
    }

    /// Triggers completion hooks in registration order.
    pub(crate) fn trigger_completion(&self, request: &dyn AsyncWebRequest) {
        for interceptor in self.interceptors.iter() {
            interceptor.on_completion(request);
        }
    }
}

/// Immutable snapshot of the deferred-result interceptors registered at
/// processing-start time.
#[derive(Clone)]
pub(crate) struct DeferredChain {
    interceptors: Arc<[Arc<dyn DeferredResultInterceptor>]>,
}

impl DeferredChain {
    pub(crate) fn new(interceptors: Vec<Arc<dyn DeferredResultInterceptor>>) -> Self {
        Self {
            interceptors: interceptors.into(),
        }
    }

    pub(crate) fn apply_pre_process(
        &self,
        request: &dyn AsyncWebRequest,
    ) -> Result<(), TaskFailure> {
        for interceptor in self.interceptors.iter() {
            interceptor.pre_process(request)?;
        }
        Ok(())
    }

    pub(crate) fn apply_post_process(
        &self,
        request: &dyn AsyncWebRequest,
        outcome: ConcurrentResult,
    ) -> ConcurrentResult {
        for interceptor in self.interceptors.iter() {
            if let Err(failure) = interceptor.post_process(request, &outcome) {
                warn!(
                    error = %failure,
                    "post-process interceptor failed, replacing concurrent result"
                );
                return ConcurrentResult::Failure(failure);
            }
        }
        outcome
    }

    pub(crate) fn apply_timeout(&self, request: &dyn AsyncWebRequest) -> ConcurrentResult {
        for interceptor in self.interceptors.iter() {
            match interceptor.on_timeout(request) {
                Ok(None) => continue,
                Ok(Some(value)) => return ConcurrentResult::Value(value),
                Err(failure) => return ConcurrentResult::Failure(failure),
            }
        }
        ConcurrentResult::Failure(TaskFailure::timeout(ASYNC_TIMEOUT_MESSAGE))
    }

    pub(crate) fn trigger_completion(&self, request: &dyn AsyncWebRequest) {
        for interceptor in self.interceptors.iter() {
            interceptor.on_completion(request);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::FailureKind;
    use crate::testutil::StubAsyncWebRequest;
    use std::sync::Mutex;

    struct RecordingInterceptor {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail_post: bool,
        timeout_value: Option<i32>,
    }

    impl RecordingInterceptor {
        fn new(name: &'static str, log: Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                name,
                log,
                fail_post: false,
                timeout_value: None,
            }
        }
    }

    impl CallableInterceptor for RecordingInterceptor {
        fn pre_process(&self, _request: &dyn AsyncWebRequest) -> Result<(), TaskFailure> {
            self.log.lock().unwrap().push(format!("{}:pre", self.name));
            Ok(())
        }

        fn post_process(
            &self,
            _request: &dyn AsyncWebRequest,
            _outcome: &ConcurrentResult,
        ) -> Result<(), TaskFailure> {
            self.log.lock().unwrap().push(format!("{}:post", self.name));
            if self.fail_post {
                return Err(TaskFailure::new("post failed"));
            }
            Ok(())
        }

        fn on_timeout(
            &self,
            _request: &dyn AsyncWebRequest,
        ) -> Result<Option<ResultValue>, TaskFailure> {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:timeout", self.name));
            Ok(self.timeout_value.map(|v| Box::new(v) as ResultValue))
        }
    }

    #[test]
    fn test_pre_and_post_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = CallableChain::new(vec![
            Arc::new(RecordingInterceptor::new("a", Arc::clone(&log))),
            Arc::new(RecordingInterceptor::new("b", Arc::clone(&log))),
        ]);
        let request = StubAsyncWebRequest::new();

        chain.apply_pre_process(request.as_ref()).unwrap();
        chain.apply_post_process(request.as_ref(), ConcurrentResult::from_value(1_i32));

        assert_eq!(
            *log.lock().unwrap(),
            vec!["a:pre", "b:pre", "a:post", "b:post"]
        );
    }

    #[test]
    fn test_post_process_failure_short_circuits() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut failing = RecordingInterceptor::new("a", Arc::clone(&log));
        failing.fail_post = true;
        let chain = CallableChain::new(vec![
            Arc::new(failing),
            Arc::new(RecordingInterceptor::new("b", Arc::clone(&log))),
        ]);
        let request = StubAsyncWebRequest::new();

        let outcome =
            chain.apply_post_process(request.as_ref(), ConcurrentResult::from_value(1_i32));

        assert_eq!(outcome.failure().map(TaskFailure::message), Some("post failed"));
        assert_eq!(*log.lock().unwrap(), vec!["a:post"]);
    }

    #[test]
    fn test_timeout_chain_first_value_wins() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut supplier = RecordingInterceptor::new("b", Arc::clone(&log));
        supplier.timeout_value = Some(42);
        let chain = CallableChain::new(vec![
            Arc::new(RecordingInterceptor::new("a", Arc::clone(&log))),
            Arc::new(supplier),
            Arc::new(RecordingInterceptor::new("c", Arc::clone(&log))),
        ]);
        let request = StubAsyncWebRequest::new();

        let outcome = chain.apply_timeout(request.as_ref());

        assert_eq!(outcome.value::<i32>(), Some(&42));
        // "c" never ran: the chain stops at the first supplied value.
        assert_eq!(*log.lock().unwrap(), vec!["a:timeout", "b:timeout"]);
    }

    #[test]
    fn test_timeout_chain_exhaustion_yields_timeout_failure() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = CallableChain::new(vec![Arc::new(RecordingInterceptor::new(
            "a",
            Arc::clone(&log),
        ))]);
        let request = StubAsyncWebRequest::new();

        let outcome = chain.apply_timeout(request.as_ref());

        let failure = outcome.failure().unwrap();
        assert_eq!(failure.kind(), FailureKind::Timeout);
    }

    #[test]
    fn test_empty_chain_is_a_no_op() {
        let chain = CallableChain::new(Vec::new());
        let request = StubAsyncWebRequest::new();

        chain.apply_pre_process(request.as_ref()).unwrap();
        let outcome =
            chain.apply_post_process(request.as_ref(), ConcurrentResult::from_value(7_i32));
        assert_eq!(outcome.value::<i32>(), Some(&7));
    }
}
