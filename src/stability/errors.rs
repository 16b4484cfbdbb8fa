use std::time::Duration;
use thiserror::Error;

/// Error returned by [`CircuitBreaker::execute`](super::CircuitBreaker::execute).
///
/// Rejections (`Open`, `HalfOpenCapacity`) are local decisions: the wrapped
/// operation was never invoked and no statistic was touched. `Operation`
/// carries the operation's own error unchanged.
#[derive(Debug, Error)]
pub enum CircuitBreakerError<E> {
    #[error("Circuit breaker '{name}' is OPEN (retry after {retry_after:?})")]
    Open { name: String, retry_after: Duration },

    #[error("Circuit breaker '{name}' is HALF_OPEN and at probe capacity ({max_half_open_requests})")]
    HalfOpenCapacity {
        name: String,
        max_half_open_requests: u32,
    },

    #[error(transparent)]
    Operation(E),
}

impl<E> CircuitBreakerError<E> {
    /// True when the breaker refused the call without running the operation
    pub fn is_rejection(&self) -> bool {
        !matches!(self, CircuitBreakerError::Operation(_))
    }

    pub fn operation_error(&self) -> Option<&E> {
        match self {
            CircuitBreakerError::Operation(e) => Some(e),
            _ => None,
        }
    }

    pub fn into_operation_error(self) -> Option<E> {
        match self {
            CircuitBreakerError::Operation(e) => Some(e),
            _ => None,
        }
    }
}

/// Invalid construction options
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
    #[error("failure_threshold must be greater than 0")]
    ZeroFailureThreshold,

    #[error("success_threshold must be greater than 0")]
    ZeroSuccessThreshold,

    #[error("max_half_open_requests must be at least 1")]
    ZeroHalfOpenRequests,
}
