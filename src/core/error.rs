//! Error types for rescheduler operations.

use std::fmt;

use thiserror::Error;

/// Errors produced by rescheduler components.
#[derive(Debug, Error)]
pub enum ReschedulerError {
    /// The rescheduler was permanently torn down.
    #[error("rescheduler `{0}` has been shut down")]
    ShutDown(String),
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// `start` was called on a dispatch thread that has already been told to stop.
    #[error("rescheduler `{0}` cannot restart from its own dispatch thread")]
    OnDispatchThread(String),
    /// The dispatch thread could not be spawned.
    #[error("failed to spawn dispatch thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Errors a downstream [`Submitter`](crate::core::Submitter) reports for a dispatched task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The downstream queue has no room for the task.
    #[error("downstream queue is full")]
    Full,
    /// The downstream queue no longer accepts tasks.
    #[error("downstream queue is closed")]
    Closed,
    /// The downstream refused the task for its own reason.
    #[error("submit rejected: {0}")]
    Rejected(String),
}

/// A rejected `add`. Hands the task back so it is never silently dropped.
#[derive(Error)]
#[error("{reason}")]
pub struct AddError<T> {
    task: T,
    #[source]
    reason: ReschedulerError,
}

impl<T> AddError<T> {
    pub(crate) const fn new(task: T, reason: ReschedulerError) -> Self {
        Self { task, reason }
    }

    /// Why the task was rejected.
    #[must_use]
    pub const fn reason(&self) -> &ReschedulerError {
        &self.reason
    }

    /// Take the rejected task back.
    pub fn into_task(self) -> T {
        self.task
    }
}

impl<T> fmt::Debug for AddError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddError")
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
