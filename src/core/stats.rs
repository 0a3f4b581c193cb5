//! Dispatch counters and their point-in-time snapshot.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Statistics about a rescheduler's activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReschedulerStats {
    /// Items currently pending, due or not.
    pub pending: usize,
    /// Total items accepted by `add`.
    pub added: u64,
    /// Total items handed to the submitter.
    pub dispatched: u64,
    /// Items discarded because their task was no longer dispatchable.
    pub skipped: u64,
    /// Dispatch passes deferred by the rate limiter.
    pub deferred: u64,
    /// Dispatched items the submitter refused.
    pub submit_failures: u64,
    /// Items moved forward by `expedite`.
    pub expedited: u64,
}

/// Internal counters (lock-free atomics).
#[derive(Debug, Default)]
pub(crate) struct ReschedulerCounters {
    pub added: AtomicU64,
    pub dispatched: AtomicU64,
    pub skipped: AtomicU64,
    pub deferred: AtomicU64,
    pub submit_failures: AtomicU64,
    pub expedited: AtomicU64,
}

impl ReschedulerCounters {
    pub fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    /// Get a snapshot of current statistics.
    pub fn snapshot(&self, pending: usize) -> ReschedulerStats {
        ReschedulerStats {
            pending,
            added: self.added.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            deferred: self.deferred.load(Ordering::Relaxed),
            submit_failures: self.submit_failures.load(Ordering::Relaxed),
            expedited: self.expedited.load(Ordering::Relaxed),
        }
    }
}
