//! Crossbeam-channel submitter for thread-based processing pipelines.

use crossbeam_channel::{Sender, TrySendError};
use tracing::debug;

use crate::core::{Submitter, SubmitError};

/// Hands dispatched tasks to a pipeline reading from a crossbeam channel.
///
/// Uses `try_send`, so a full bounded channel fails the submit instead of
/// stalling the dispatch thread.
#[derive(Debug)]
pub struct ChannelSubmitter<T> {
    tx: Sender<T>,
}

impl<T> Clone for ChannelSubmitter<T> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<T> ChannelSubmitter<T> {
    /// Wrap the sending half of the pipeline's queue.
    #[must_use]
    pub const fn new(tx: Sender<T>) -> Self {
        Self { tx }
    }
}

impl<T: Send + 'static> Submitter<T> for ChannelSubmitter<T> {
    fn submit(&self, task: T) -> Result<(), SubmitError> {
        match self.tx.try_send(task) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                debug!("Pipeline channel is full");
                Err(SubmitError::Full)
            }
            Err(TrySendError::Disconnected(_)) => Err(SubmitError::Closed),
        }
    }
}
