//! Per-request exchange scope.
//!
//! Host glue creates one [`Exchange`] per inbound request and threads it by
//! reference through the handler chain; the coordinator is created lazily
//! on first access and survives re-entrant suspend/resume cycles on the
//! same logical request. There is no ambient or global coordinator state.

use crate::core::AsyncCoordinator;
use std::sync::OnceLock;

/// Request-scoped holder for the async coordinator.
#[derive(Debug, Default)]
pub struct Exchange {
    coordinator: OnceLock<AsyncCoordinator>,
}

impl Exchange {
    /// Creates an exchange scope with no coordinator yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the coordinator for this request, creating it on first
    /// access. Repeated calls return the same instance.
    pub fn coordinator(&self) -> &AsyncCoordinator {
        self.coordinator.get_or_init(AsyncCoordinator::new)
    }

    /// Whether a coordinator has been created for this request.
    pub fn has_coordinator(&self) -> bool {
        self.coordinator.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::StubAsyncWebRequest;

    #[test]
    fn test_coordinator_created_lazily() {
        let exchange = Exchange::new();
        assert!(!exchange.has_coordinator());
        exchange.coordinator();
        assert!(exchange.has_coordinator());
    }

    #[test]
    fn test_repeated_access_returns_same_instance() {
        let exchange = Exchange::new();
        let request = StubAsyncWebRequest::new();
        exchange
            .coordinator()
            .set_async_web_request(request)
            .unwrap();

        // Same underlying state: the adapter installed above is visible.
        assert!(exchange.coordinator().lock_state().adapter.is_some());
    }
}
