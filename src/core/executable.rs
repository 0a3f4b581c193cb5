//! Capabilities the rescheduler consumes from the task-processing pipeline.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::SubmitError;

/// Stable identity of a task within its owning queue.
pub type TaskKey = u64;

/// Lifecycle state of an executable task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Waiting for (another) execution attempt.
    Pending,
    /// Currently executing.
    Running,
    /// Finished successfully.
    Completed,
    /// Failed transiently; candidate for rescheduling.
    FailedRetryable,
    /// Cancelled by its owner.
    Cancelled,
}

impl TaskState {
    /// Whether a task in this state may still be handed back to the pipeline.
    #[must_use]
    pub const fn is_dispatchable(self) -> bool {
        !matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// A unit of retryable work the rescheduler holds until its retry time.
///
/// The rescheduler never executes a task. It only asks whether the task is
/// still eligible at dispatch time and then hands it to a [`Submitter`].
///
/// `state` is queried while the rescheduler's internal lock is held, so it must
/// be cheap (an atomic load, typically) and must not call back into the
/// rescheduler.
///
/// # Example
///
/// ```rust
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use shard_rescheduler::core::{Executable, TaskKey, TaskState};
///
/// struct TimerTask {
///     id: TaskKey,
///     cancelled: AtomicBool,
/// }
///
/// impl Executable for TimerTask {
///     fn key(&self) -> TaskKey {
///         self.id
///     }
///
///     fn state(&self) -> TaskState {
///         if self.cancelled.load(Ordering::Acquire) {
///             TaskState::Cancelled
///         } else {
///             TaskState::FailedRetryable
///         }
///     }
/// }
/// ```
pub trait Executable: Send + Sync + 'static {
    /// Identity used in logs and diagnostics.
    fn key(&self) -> TaskKey;

    /// Current lifecycle state.
    fn state(&self) -> TaskState;

    /// Whether the task should still be dispatched.
    fn is_dispatchable(&self) -> bool {
        self.state().is_dispatchable()
    }
}

impl<T: Executable + ?Sized> Executable for Arc<T> {
    fn key(&self) -> TaskKey {
        (**self).key()
    }

    fn state(&self) -> TaskState {
        (**self).state()
    }

    fn is_dispatchable(&self) -> bool {
        (**self).is_dispatchable()
    }
}

impl<T: Executable + ?Sized> Executable for Box<T> {
    fn key(&self) -> TaskKey {
        (**self).key()
    }

    fn state(&self) -> TaskState {
        (**self).state()
    }

    fn is_dispatchable(&self) -> bool {
        (**self).is_dispatchable()
    }
}

/// Downstream capability that accepts a due task back into normal processing.
///
/// Invoked on the dispatch thread without any rescheduler lock held. A slow
/// submit delays later dispatches but never blocks concurrent `add` calls.
/// The rescheduler does not retry a failed submit.
pub trait Submitter<T>: Send + Sync + 'static {
    /// Hand a due task to the processing pipeline.
    ///
    /// # Errors
    ///
    /// Returns a [`SubmitError`] when the downstream cannot take the task.
    fn submit(&self, task: T) -> Result<(), SubmitError>;
}

impl<T, S: Submitter<T> + ?Sized> Submitter<T> for Arc<S> {
    fn submit(&self, task: T) -> Result<(), SubmitError> {
        (**self).submit(task)
    }
}
