//! Builders to construct reschedulers from configuration.

pub mod rescheduler_builder;

pub use rescheduler_builder::{build_reschedulers, load_shard_config};
