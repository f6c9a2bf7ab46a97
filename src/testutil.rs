//! Shared unit-test doubles.

use crate::adapter::{AsyncWebRequest, CompletionHandler, TimeoutHandler};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Recording stub for [`AsyncWebRequest`].
///
/// Records every adapter call in order, stores the installed handlers, and
/// lets tests fire the timeout or completion paths manually.
pub(crate) struct StubAsyncWebRequest {
    calls: Mutex<Vec<String>>,
    started: AtomicBool,
    completed: AtomicBool,
    dispatch_count: AtomicUsize,
    timeout_handler: Mutex<Option<Arc<dyn Fn() + Send + Sync>>>,
    completion_handlers: Mutex<Vec<CompletionHandler>>,
}

impl StubAsyncWebRequest {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
            completed: AtomicBool::new(false),
            dispatch_count: AtomicUsize::new(0),
            timeout_handler: Mutex::new(None),
            completion_handlers: Mutex::new(Vec::new()),
        })
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn dispatch_count(&self) -> usize {
        self.dispatch_count.load(Ordering::SeqCst)
    }

    /// Fires the installed timeout handler, as the host timer would.
    pub(crate) fn fire_timeout(&self) {
        let handler = self.timeout_handler.lock().unwrap().clone();
        if let Some(handler) = handler {
            handler();
        }
    }

    /// Completes the exchange and runs completion handlers in order.
    pub(crate) fn complete(&self) {
        self.completed.store(true, Ordering::SeqCst);
        let handlers = std::mem::take(&mut *self.completion_handlers.lock().unwrap());
        for handler in handlers {
            handler();
        }
    }

    /// Forces the started flag, simulating an exchange suspended elsewhere.
    pub(crate) fn force_started(&self) {
        self.started.store(true, Ordering::SeqCst);
    }
}

impl AsyncWebRequest for StubAsyncWebRequest {
    fn is_async_started(&self) -> bool {
        self.started.load(Ordering::SeqCst) && !self.completed.load(Ordering::SeqCst)
    }

    fn start_async(&self) {
        self.record("start_async");
        self.started.store(true, Ordering::SeqCst);
    }

    fn dispatch(&self) {
        self.record("dispatch");
        self.dispatch_count.fetch_add(1, Ordering::SeqCst);
    }

    fn set_timeout(&self, timeout: Duration) {
        self.record(format!("set_timeout({}ms)", timeout.as_millis()));
    }

    fn set_timeout_handler(&self, handler: TimeoutHandler) {
        self.record("set_timeout_handler");
        *self.timeout_handler.lock().unwrap() = Some(Arc::from(handler));
    }

    fn add_completion_handler(&self, handler: CompletionHandler) {
        self.record("add_completion_handler");
        self.completion_handlers.lock().unwrap().push(handler);
    }

    fn is_async_complete(&self) -> bool {
        self.record("is_async_complete");
        self.completed.load(Ordering::SeqCst)
    }
}
