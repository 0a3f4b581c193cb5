//! Tokio channel submitter for async processing pipelines.

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

use crate::core::{Submitter, SubmitError};

/// Hands dispatched tasks to an async pipeline reading from a tokio channel.
///
/// The dispatch thread is not a tokio worker, so it never awaits: bounded
/// channels use `try_send` and report `Full` rather than blocking.
#[derive(Debug)]
pub enum TokioSubmitter<T> {
    /// Bounded channel; a full channel fails the submit.
    Bounded(mpsc::Sender<T>),
    /// Unbounded channel; only a closed receiver fails the submit.
    Unbounded(mpsc::UnboundedSender<T>),
}

impl<T> Clone for TokioSubmitter<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Bounded(tx) => Self::Bounded(tx.clone()),
            Self::Unbounded(tx) => Self::Unbounded(tx.clone()),
        }
    }
}

impl<T> TokioSubmitter<T> {
    /// Submit into a bounded tokio channel.
    #[must_use]
    pub const fn bounded(tx: mpsc::Sender<T>) -> Self {
        Self::Bounded(tx)
    }

    /// Submit into an unbounded tokio channel.
    #[must_use]
    pub const fn unbounded(tx: mpsc::UnboundedSender<T>) -> Self {
        Self::Unbounded(tx)
    }
}

impl<T: Send + 'static> Submitter<T> for TokioSubmitter<T> {
    fn submit(&self, task: T) -> Result<(), SubmitError> {
        match self {
            Self::Bounded(tx) => match tx.try_send(task) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(_)) => {
                    debug!("Async pipeline channel is full");
                    Err(SubmitError::Full)
                }
                Err(TrySendError::Closed(_)) => Err(SubmitError::Closed),
            },
            Self::Unbounded(tx) => tx.send(task).map_err(|_| SubmitError::Closed),
        }
    }
}
