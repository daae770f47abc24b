//! Error types for the scheduling assistant.
//!
//! Control-plane setters validate synchronously and reject before mutating
//! anything; tick-path and timer-path code never surfaces errors to a caller.

use thiserror::Error;

use crate::group::{GroupId, ThreadId};

/// Errors that can occur on the control-plane surface.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FrameSchedError {
    /// An argument was outside its accepted range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The group id is unknown or outside the materializable range.
    #[error("group not found: {0}")]
    GroupNotFound(GroupId),

    /// The thread is not attached to any group.
    #[error("thread not found: {0}")]
    ThreadNotFound(ThreadId),

    /// A fatal subsystem fault (the assistant disables the affected
    /// functionality rather than corrupting shared state).
    #[error("internal fault: {0}")]
    Internal(String),
}

impl FrameSchedError {
    /// Create an invalid argument error.
    #[must_use]
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument(reason.into())
    }

    /// Create a group not found error.
    #[must_use]
    pub fn group_not_found(group: GroupId) -> Self {
        Self::GroupNotFound(group)
    }

    /// Create a thread not found error.
    #[must_use]
    pub fn thread_not_found(thread: ThreadId) -> Self {
        Self::ThreadNotFound(thread)
    }

    /// Create an internal fault error.
    #[must_use]
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal(reason.into())
    }
}

/// A specialized `Result` type for scheduling-assistant operations.
pub type FrameSchedResult<T> = std::result::Result<T, FrameSchedError>;
