//! Host-runtime adapter contract for one suspended exchange.
//!
//! The host web server owns the network connection; the coordinator only
//! talks to it through [`AsyncWebRequest`]. Implementations wrap whatever
//! the host exposes (a servlet-style async context, an embedded event loop,
//! or the in-process [`crate::adapters::LocalAsyncWebRequest`]).

use std::time::Duration;

/// Handler invoked by the host when the async request times out.
pub type TimeoutHandler = Box<dyn Fn() + Send + Sync>;

/// Handler invoked by the host when the async request fully completes.
pub type CompletionHandler = Box<dyn Fn() + Send + Sync>;

/// One suspendable request/response exchange, as seen by the coordinator.
///
/// The coordinator calls these methods in a fixed order per cycle:
/// `set_timeout` (optional), `set_timeout_handler`, `add_completion_handler`,
/// `start_async`, and finally - from whichever thread finishes the work -
/// a single `dispatch`.
///
/// # Threading
///
/// `dispatch` and the registered handlers may be invoked from arbitrary
/// threads; implementations must be `Send + Sync`.
pub trait AsyncWebRequest: Send + Sync {
    /// Whether the exchange is currently suspended for async handling.
    ///
    /// Must return `false` again once the request has fully completed.
    fn is_async_started(&self) -> bool;

    /// Suspends the exchange, releasing the request-handling thread.
    fn start_async(&self);

    /// Resumes processing: the host re-invokes the handler chain, which
    /// reads the already-recorded concurrent result.
    fn dispatch(&self);

    /// Sets the timeout for the suspended exchange.
    fn set_timeout(&self, timeout: Duration);

    /// Installs the handler to run when the exchange times out.
    fn set_timeout_handler(&self, handler: TimeoutHandler);

    /// Adds a handler to run when the exchange fully completes.
    ///
    /// Handlers run in registration order.
    fn add_completion_handler(&self, handler: CompletionHandler);

    /// Whether the exchange has fully completed (response committed).
    fn is_async_complete(&self) -> bool;
}
