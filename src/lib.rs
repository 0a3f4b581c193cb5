//! # Shard Rescheduler
//!
//! Delayed requeue of retryable tasks for sharded queue processors.
//!
//! When a task fails transiently (a downstream is unavailable, rate limited or
//! contended) its owner hands it to a [`Rescheduler`](core::Rescheduler) with a
//! retry time. The rescheduler holds it without blocking the owning queue and
//! without busy-polling, then hands it back once due, under a bounded dispatch
//! rate so that many tasks failing together do not come back as a retry storm.
//!
//! ## Key Features
//!
//! - **Time-Ordered Pending Set**: earliest retry time first, FIFO among ties
//! - **Single Dispatch Thread**: one consistent dispatch order per instance
//! - **Early Wake**: an insertion earlier than the awaited time interrupts the wait
//! - **Token Bucket Gating**: smooths redelivery when many tasks come due at once
//! - **Skip on Cancel**: tasks cancelled while pending are discarded at dispatch
//!   time without consuming a token
//! - **Start/Stop Lifecycle**: `stop` blocks until the dispatch thread exits and
//!   keeps pending items for the next `start`
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use shard_rescheduler::config::ReschedulerConfig;
//! use shard_rescheduler::core::{Executable, Rescheduler, TaskKey, TaskState};
//! use shard_rescheduler::runtime::ChannelSubmitter;
//!
//! struct ActivityTask { id: TaskKey }
//!
//! impl Executable for ActivityTask {
//!     fn key(&self) -> TaskKey { self.id }
//!     fn state(&self) -> TaskState { TaskState::FailedRetryable }
//! }
//!
//! // The shard's processing queue.
//! let (tx, rx) = crossbeam_channel::unbounded::<Arc<ActivityTask>>();
//!
//! let rescheduler = Rescheduler::new(
//!     ReschedulerConfig::new()
//!         .with_name("shard-3")
//!         .with_dispatch_limit(200, 50),
//!     ChannelSubmitter::new(tx),
//! )?;
//! rescheduler.start()?;
//!
//! // A failed execution asks for a retry 10ms from now.
//! rescheduler
//!     .add_after(Arc::new(ActivityTask { id: 9 }), Duration::from_millis(10))
//!     .ok();
//!
//! let retried = rx.recv_timeout(Duration::from_secs(1)).unwrap();
//! assert_eq!(retried.key(), 9);
//! rescheduler.stop();
//! # Ok::<(), shard_rescheduler::core::ReschedulerError>(())
//! ```
//!
//! For complete scenarios, see `tests/rescheduler_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core rescheduling abstractions: pending set, rate limiter, dispatch loop.
pub mod core;
/// Configuration models for reschedulers and shard sets.
pub mod config;
/// Builders to construct reschedulers from configuration.
pub mod builders;
/// Runtime adapters implementing the downstream submit capability.
pub mod runtime;
/// Shared utilities.
pub mod util;
