//! Error types for scheduler operations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::record::{TaskId, TaskStatus};

/// Errors produced by scheduler components.
///
/// Every variant is a caller error: the operation that returned it left
/// records, counters and the queue untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// No record exists for the id.
    #[error("task not found: {0}")]
    NotFound(TaskId),
    /// The requested status change is not an edge of the state machine.
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        /// Status the record was in.
        from: TaskStatus,
        /// Status that was requested.
        to: TaskStatus,
    },
    /// An argument was rejected before any state was touched.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl SchedulerError {
    /// Stable code for the request/response surface.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
        }
    }
}

/// Wire-level error code carried by API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Unknown task id.
    NotFound,
    /// Illegal status change.
    InvalidTransition,
    /// Rejected input.
    InvalidArgument,
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_follow_variants() {
        let id = TaskId::new();
        assert_eq!(SchedulerError::NotFound(id).code(), ErrorCode::NotFound);
        assert_eq!(
            SchedulerError::InvalidTransition {
                from: TaskStatus::Completed,
                to: TaskStatus::Processing,
            }
            .code(),
            ErrorCode::InvalidTransition
        );
        assert_eq!(
            SchedulerError::InvalidArgument("x".into()).code(),
            ErrorCode::InvalidArgument
        );
    }

    #[test]
    fn test_error_code_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorCode::InvalidTransition).unwrap();
        assert_eq!(json, "\"invalid_transition\"");
    }
}
