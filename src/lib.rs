//! Holdover - asynchronous web-request coordination
//!
//! This library lets a single inbound request be handled by a long-running
//! background computation while the originating connection is suspended and
//! later resumed, without blocking the thread that accepted it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     AsyncCoordinator                         │
//! │  Suspend the exchange, submit work, capture the outcome,    │
//! │  resume exactly once                                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │ Interceptor │  │ Task        │  │ Deferred            │  │
//! │  │ chains      │  │ runners     │  │ results             │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! ├─────────────────────────────────────────────────────────────┤
//! │                     AsyncWebRequest                          │
//! │  Host-runtime adapter: start_async / dispatch / timeout     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Core Concepts
//!
//! - **Exchange**: per-request scope; creates its coordinator lazily on
//!   first access.
//!
//! - **AsyncTask**: a unit of work plus optional timeout and runner
//!   override, submitted via `start_callable_processing`.
//!
//! - **DeferredResult**: a handle settable exactly once from any thread,
//!   submitted via `start_deferred_result_processing`.
//!
//! - **Concurrent result**: the single captured outcome (value or
//!   failure), recorded before the exchange is resumed and read by the
//!   re-invoked handler chain.
//!
//! - **Interceptors**: policy hooks around the lifecycle (pre-process,
//!   post-process, timeout, error, completion), invoked in registration
//!   order.
//!
//! # Example
//!
//! ```ignore
//! use holdover::{AsyncCoordinator, AsyncTask, LocalAsyncWebRequest};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let request = LocalAsyncWebRequest::new();
//! let coordinator = AsyncCoordinator::new();
//! coordinator.set_async_web_request(Arc::new(request.clone()))?;
//!
//! coordinator.start_callable_processing(AsyncTask::with_timeout(
//!     Duration::from_secs(5),
//!     || Ok(expensive_report()),
//! ))?;
//!
//! // ...after the host re-invokes the handler chain:
//! if let Some(result) = coordinator.get_concurrent_result() {
//!     let report = result.value::<Report>();
//! }
//! ```

pub mod adapter;
pub mod adapters;
mod callable;
mod core;
mod deferred;
mod dispatch;
pub mod error;
mod exchange;
pub mod interceptor;
pub mod logging;
pub mod result;
pub mod runner;
mod state;
mod task;
#[cfg(test)]
pub(crate) mod testutil;

pub use adapter::{AsyncWebRequest, CompletionHandler, TimeoutHandler};
pub use adapters::LocalAsyncWebRequest;
pub use crate::core::AsyncCoordinator;
pub use deferred::DeferredResult;
pub use error::StartError;
pub use exchange::Exchange;
pub use interceptor::{CallableInterceptor, DeferredResultInterceptor};
pub use result::{ConcurrentResult, FailureKind, ResultValue, TaskFailure};
pub use runner::{
    RunnerHandle, SyncTaskRunner, TaskRunner, ThreadTaskRunner, TokioTaskRunner, UnitOfWork,
};
pub use task::{AsyncTask, AsyncTaskBuilder};

/// Version of the holdover library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
