//! Configuration models for reschedulers and the shards that host them.

pub mod rescheduler;

pub use rescheduler::{DispatchLimitConfig, ReschedulerConfig, ShardSetConfig};
