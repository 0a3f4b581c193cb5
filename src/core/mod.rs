//! Core rescheduling abstractions: pending set, rate limiter and dispatch loop.

pub mod error;
pub mod executable;
pub mod pending;
pub mod rate_limiter;
pub mod rescheduler;
pub mod stats;

pub use error::{AddError, AppResult, ReschedulerError, SubmitError};
pub use executable::{Executable, Submitter, TaskKey, TaskState};
pub use pending::{PendingItem, PendingSet};
pub use rate_limiter::{Acquire, TokenBucket};
pub use rescheduler::{Rescheduler, ReschedulerState};
pub use stats::ReschedulerStats;
