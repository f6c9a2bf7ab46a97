//! Synchronous rejection errors for processing entry points.
//!
//! These errors are returned before any coordinator state changes. Failures
//! that occur *during* asynchronous handling are never surfaced here; they
//! are captured as the concurrent result and travel to the resumed handler
//! chain instead (see [`crate::result`]).

use thiserror::Error;

/// Errors rejecting a processing request before it starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartError {
    /// The caller supplied an unusable argument (empty work descriptor,
    /// reused deferred handle, adapter replacement mid-cycle).
    #[error("{0}")]
    InvalidArgument(&'static str),

    /// The coordinator is not in a state that allows the operation
    /// (typically: no async web request installed).
    #[error("{0}")]
    IllegalState(&'static str),
}

impl StartError {
    /// Returns the human-readable rejection message.
    pub fn message(&self) -> &'static str {
        match self {
            Self::InvalidArgument(msg) | Self::IllegalState(msg) => msg,
        }
    }
}
