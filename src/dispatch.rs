//! Finalization and resume.
//!
//! Every path of an async cycle - worker completion, deferred settle,
//! pre-process failure, timeout - funnels into
//! [`AsyncCoordinator::finalize_and_dispatch`]. The concurrent-result write
//! under the state mutex is the exactly-once guard: the first writer wins
//! and is the only one that may trigger `dispatch` on the adapter.

use crate::core::AsyncCoordinator;
use crate::result::ConcurrentResult;
use tracing::{debug, warn};

impl AsyncCoordinator {
    /// Records the outcome and resumes the exchange.
    ///
    /// Returns `true` if this call performed the finalization. Late callers
    /// (a timeout racing the worker, or vice versa) find the result already
    /// set and return without dispatching. The outcome is recorded before
    /// `dispatch`, so the resumed handler chain always observes it.
    pub(crate) fn finalize_and_dispatch(&self, outcome: ConcurrentResult) -> bool {
        let (adapter, in_flight) = {
            let mut state = self.lock_state();
            if state.result.is_some() {
                debug!("concurrent result already set, dropping late outcome");
                return false;
            }
            state.result = Some(std::sync::Arc::new(outcome));
            (state.adapter.clone(), state.runner_handle.take())
        };

        // A competing path may still be running the work; cancellation is
        // best-effort and a no-op for work already executing.
        if let Some(handle) = in_flight {
            handle.cancel();
        }

        let Some(adapter) = adapter else {
            warn!("concurrent result recorded but no async web request to dispatch");
            return false;
        };
        if adapter.is_async_complete() {
            debug!("async request already completed, skipping dispatch");
            return false;
        }
        adapter.dispatch();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::TaskFailure;
    use crate::testutil::StubAsyncWebRequest;

    #[test]
    fn test_first_finalization_wins() {
        let coordinator = AsyncCoordinator::new();
        let request = StubAsyncWebRequest::new();
        coordinator
            .set_async_web_request(request.clone())
            .unwrap();

        assert!(coordinator.finalize_and_dispatch(ConcurrentResult::from_value(1_i32)));
        assert!(!coordinator.finalize_and_dispatch(ConcurrentResult::from_value(2_i32)));

        let result = coordinator.get_concurrent_result().unwrap();
        assert_eq!(result.value::<i32>(), Some(&1));
        assert_eq!(request.dispatch_count(), 1);
    }

    #[test]
    fn test_dispatch_skipped_when_already_complete() {
        let coordinator = AsyncCoordinator::new();
        let request = StubAsyncWebRequest::new();
        coordinator
            .set_async_web_request(request.clone())
            .unwrap();
        // Completing clears state; re-record through the normal path after.
        request.complete();

        let finalized =
            coordinator.finalize_and_dispatch(ConcurrentResult::Failure(TaskFailure::new("x")));

        assert!(!finalized);
        assert!(coordinator.has_concurrent_result());
        assert_eq!(request.dispatch_count(), 0);
    }

    #[test]
    fn test_finalize_without_adapter_records_result() {
        let coordinator = AsyncCoordinator::new();

        let finalized =
            coordinator.finalize_and_dispatch(ConcurrentResult::from_value("late"));

        assert!(!finalized);
        assert!(coordinator.has_concurrent_result());
    }
}
