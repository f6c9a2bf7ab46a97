//! The concurrent result: the single outcome captured from asynchronous work.
//!
//! Handler code produces values of arbitrary types, so the success side is
//! type-erased ([`ResultValue`]); the resumed handler chain downcasts it back
//! with [`ConcurrentResult::value`]. Failures are carried as [`TaskFailure`],
//! a cloneable message-plus-kind error in the style of the runner errors.

use std::any::Any;
use std::fmt;
use thiserror::Error;

/// Default message recorded when a timeout fires and no interceptor
/// supplies a substitute result.
pub(crate) const ASYNC_TIMEOUT_MESSAGE: &str = "asynchronous request timed out";

/// A type-erased success value produced by a unit of work.
pub type ResultValue = Box<dyn Any + Send + Sync>;

/// Category of a captured failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The work unit returned an error of its own.
    Application,
    /// The async request timed out before a result was produced.
    Timeout,
    /// The work unit panicked.
    Panic,
}

/// Failure captured from asynchronous work.
///
/// Never returned to the submitting thread; recorded as the concurrent
/// result and read by the resumed handler chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TaskFailure {
    message: String,
    kind: FailureKind,
}

impl TaskFailure {
    /// Creates an application-level failure.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: FailureKind::Application,
        }
    }

    /// Creates a timeout failure.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: FailureKind::Timeout,
        }
    }

    /// Creates a failure from a caught panic.
    pub fn panic(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: FailureKind::Panic,
        }
    }

    /// Returns the failure message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the failure category.
    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    /// Returns true if this failure came from a timeout.
    pub fn is_timeout(&self) -> bool {
        self.kind == FailureKind::Timeout
    }
}

/// The outcome of one asynchronous cycle: a success value or a failure.
///
/// Written at most once per cycle by the coordinator, read (and downcast)
/// by the resumed handler chain.
pub enum ConcurrentResult {
    /// The work unit produced a value.
    Value(ResultValue),
    /// The work unit failed, timed out, or an interceptor rejected it.
    Failure(TaskFailure),
}

impl ConcurrentResult {
    /// Wraps a concrete value.
    pub fn from_value<T: Any + Send + Sync>(value: T) -> Self {
        Self::Value(Box::new(value))
    }

    /// Downcasts the success value, if this is a success of type `T`.
    pub fn value<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Value(value) => value.downcast_ref(),
            Self::Failure(_) => None,
        }
    }

    /// Returns the failure, if any.
    pub fn failure(&self) -> Option<&TaskFailure> {
        match self {
            Self::Value(_) => None,
            Self::Failure(failure) => Some(failure),
        }
    }

    /// Returns true if this outcome is a failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}

impl fmt::Debug for ConcurrentResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(_) => write!(f, "ConcurrentResult::Value(..)"),
            Self::Failure(failure) => write!(f, "ConcurrentResult::Failure({failure:?})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_failure_kinds() {
        assert_eq!(TaskFailure::new("boom").kind(), FailureKind::Application);
        assert_eq!(TaskFailure::timeout("late").kind(), FailureKind::Timeout);
        assert_eq!(TaskFailure::panic("oops").kind(), FailureKind::Panic);
        assert!(TaskFailure::timeout("late").is_timeout());
        assert!(!TaskFailure::new("boom").is_timeout());
    }

    #[test]
    fn test_task_failure_display() {
        let failure = TaskFailure::new("database unavailable");
        assert_eq!(format!("{}", failure), "database unavailable");
        assert_eq!(failure.message(), "database unavailable");
    }

    #[test]
    fn test_concurrent_result_downcast() {
        let result = ConcurrentResult::from_value(21_i32);
        assert_eq!(result.value::<i32>(), Some(&21));
        assert_eq!(result.value::<String>(), None);
        assert!(result.failure().is_none());
        assert!(!result.is_failure());
    }

    #[test]
    fn test_concurrent_result_failure() {
        let result = ConcurrentResult::Failure(TaskFailure::new("boom"));
        assert!(result.is_failure());
        assert_eq!(result.failure().map(TaskFailure::message), Some("boom"));
        assert_eq!(result.value::<i32>(), None);
    }
}
