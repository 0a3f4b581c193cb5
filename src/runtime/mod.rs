//! Runtime adapters implementing the downstream submit capability.

pub mod channel_submitter;
#[cfg(feature = "tokio-runtime")]
pub mod tokio_submitter;

pub use channel_submitter::ChannelSubmitter;
#[cfg(feature = "tokio-runtime")]
pub use tokio_submitter::TokioSubmitter;
