//! In-process async web request adapter.
//!
//! [`LocalAsyncWebRequest`] implements [`AsyncWebRequest`] without a host
//! container: state flags are tracked atomically, handlers are stored and
//! fired in-process, and the timeout runs on a tokio timer that is
//! cancelled when the exchange completes. Embedded hosts use it directly;
//! the integration tests drive the coordinator through it end to end.
//!
//! One instance represents one exchange cycle; re-entrant chains get a
//! fresh instance per cycle, as a host container would provide.

use crate::adapter::{AsyncWebRequest, CompletionHandler, TimeoutHandler};
use crate::state::lock_unpoisoned;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

struct LocalState {
    started: AtomicBool,
    completed: AtomicBool,
    dispatch_count: AtomicUsize,
    timeout: Mutex<Option<Duration>>,
    timeout_handler: Mutex<Option<Arc<dyn Fn() + Send + Sync>>>,
    completion_handlers: Mutex<Vec<CompletionHandler>>,
    dispatch_listener: Mutex<Option<Arc<dyn Fn() + Send + Sync>>>,
    timer: Mutex<Option<CancellationToken>>,
}

/// Self-contained [`AsyncWebRequest`] implementation.
///
/// Clones share the same exchange; keep one clone to observe and complete
/// the exchange after handing an `Arc` of it to the coordinator.
#[derive(Clone)]
pub struct LocalAsyncWebRequest {
    inner: Arc<LocalState>,
}

impl LocalAsyncWebRequest {
    /// Creates a fresh, unsuspended exchange.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(LocalState {
                started: AtomicBool::new(false),
                completed: AtomicBool::new(false),
                dispatch_count: AtomicUsize::new(0),
                timeout: Mutex::new(None),
                timeout_handler: Mutex::new(None),
                completion_handlers: Mutex::new(Vec::new()),
                dispatch_listener: Mutex::new(None),
                timer: Mutex::new(None),
            }),
        }
    }

    /// Installs a listener invoked on every dispatch. Hosts use this to
    /// re-enter their handler chain.
    pub fn on_dispatch(&self, listener: impl Fn() + Send + Sync + 'static) {
        *lock_unpoisoned(&self.inner.dispatch_listener) = Some(Arc::new(listener));
    }

    /// Number of dispatches performed on this exchange.
    pub fn dispatch_count(&self) -> usize {
        self.inner.dispatch_count.load(Ordering::SeqCst)
    }

    /// Completes the exchange: cancels the timeout timer and runs the
    /// completion handlers in registration order. Idempotent.
    pub fn complete(&self) {
        if self.inner.completed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(token) = lock_unpoisoned(&self.inner.timer).take() {
            token.cancel();
        }
        let handlers = std::mem::take(&mut *lock_unpoisoned(&self.inner.completion_handlers));
        debug!(handlers = handlers.len(), "completing local async request");
        for handler in handlers {
            handler();
        }
    }

    /// Fires the timeout handler immediately, regardless of the timer.
    ///
    /// Intended for hosts without a tokio runtime and for tests.
    pub fn fire_timeout(&self) {
        let handler = lock_unpoisoned(&self.inner.timeout_handler).clone();
        if let Some(handler) = handler {
            handler();
        }
    }

    fn spawn_timer(&self, duration: Duration) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(
                timeout_ms = duration.as_millis() as u64,
                "no tokio runtime available, timeout will not fire automatically"
            );
            return;
        };
        let token = CancellationToken::new();
        *lock_unpoisoned(&self.inner.timer) = Some(token.clone());
        let inner = Arc::clone(&self.inner);
        runtime.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(duration) => {
                    if inner.completed.load(Ordering::SeqCst) {
                        return;
                    }
                    debug!("local async request timed out");
                    let handler = lock_unpoisoned(&inner.timeout_handler).clone();
                    if let Some(handler) = handler {
                        handler();
                    }
                }
            }
        });
    }
}

impl Default for LocalAsyncWebRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl AsyncWebRequest for LocalAsyncWebRequest {
    fn is_async_started(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst) && !self.inner.completed.load(Ordering::SeqCst)
    }

    fn start_async(&self) {
        self.inner.started.store(true, Ordering::SeqCst);
        let timeout = *lock_unpoisoned(&self.inner.timeout);
        if let Some(duration) = timeout {
            self.spawn_timer(duration);
        }
    }

    fn dispatch(&self) {
        self.inner.dispatch_count.fetch_add(1, Ordering::SeqCst);
        let listener = lock_unpoisoned(&self.inner.dispatch_listener).clone();
        debug!(listener = listener.is_some(), "local async request dispatched");
        if let Some(listener) = listener {
            listener();
        }
    }

    fn set_timeout(&self, timeout: Duration) {
        *lock_unpoisoned(&self.inner.timeout) = Some(timeout);
    }

    fn set_timeout_handler(&self, handler: TimeoutHandler) {
        *lock_unpoisoned(&self.inner.timeout_handler) = Some(Arc::from(handler));
    }

    fn add_completion_handler(&self, handler: CompletionHandler) {
        lock_unpoisoned(&self.inner.completion_handlers).push(handler);
    }

    fn is_async_complete(&self) -> bool {
        self.inner.completed.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for LocalAsyncWebRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalAsyncWebRequest")
            .field("started", &self.inner.started.load(Ordering::SeqCst))
            .field("completed", &self.inner.completed.load(Ordering::SeqCst))
            .field("dispatch_count", &self.dispatch_count())
            .finish()
    }
}
