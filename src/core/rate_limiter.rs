//! Token bucket gating how fast due tasks are handed back to the pipeline.

use std::time::{Duration, Instant};

/// Outcome of a non-blocking token acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    /// A token was consumed.
    Granted,
    /// No token available; the next one arrives after this long.
    Wait(Duration),
}

/// Capacity-bounded token bucket refilled one token per `refill_interval`.
///
/// Lives beside the pending set and is only drained by the dispatch loop. Integer
/// arithmetic keeps refill times exact: with a 50ms interval the second token
/// is available exactly 50ms after the first was taken.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    limit: Option<Limit>,
}

#[derive(Debug, Clone)]
struct Limit {
    capacity: u32,
    tokens: u32,
    refill_interval: Duration,
    /// Time the next partial token started accruing.
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a full bucket of `capacity` tokens, one regenerated every `refill_interval`.
    ///
    /// A zero `capacity` is treated as one and a zero interval as one nanosecond.
    #[must_use]
    pub fn new(capacity: u32, refill_interval: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            limit: Some(Limit {
                capacity,
                tokens: capacity,
                refill_interval: refill_interval.max(Duration::from_nanos(1)),
                last_refill: Instant::now(),
            }),
        }
    }

    /// Bucket allowing `per_second` dispatches per second with bursts of `burst`.
    #[must_use]
    pub fn per_second(per_second: u32, burst: u32) -> Self {
        let interval = Duration::from_secs(1) / per_second.max(1);
        Self::new(burst, interval)
    }

    /// A limiter that always grants.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self { limit: None }
    }

    /// Whether this limiter never defers.
    #[must_use]
    pub const fn is_unlimited(&self) -> bool {
        self.limit.is_none()
    }

    /// Tokens available at `now`.
    pub fn available_at(&mut self, now: Instant) -> u32 {
        self.limit.as_mut().map_or(u32::MAX, |limit| {
            limit.refill(now);
            limit.tokens
        })
    }

    /// Try to take one token at the current time.
    pub fn try_acquire(&mut self) -> Acquire {
        self.try_acquire_at(Instant::now())
    }

    /// Try to take one token at `now`.
    pub fn try_acquire_at(&mut self, now: Instant) -> Acquire {
        let Some(limit) = self.limit.as_mut() else {
            return Acquire::Granted;
        };
        limit.refill(now);
        if limit.tokens > 0 {
            limit.tokens -= 1;
            return Acquire::Granted;
        }
        let accrued = now.saturating_duration_since(limit.last_refill);
        Acquire::Wait(limit.refill_interval.saturating_sub(accrued))
    }
}

impl Limit {
    fn refill(&mut self, now: Instant) {
        if self.tokens >= self.capacity {
            // A full bucket does not bank time.
            self.last_refill = now;
            return;
        }
        let elapsed = now.saturating_duration_since(self.last_refill);
        let earned = elapsed.as_nanos() / self.refill_interval.as_nanos();
        if earned == 0 {
            return;
        }
        let missing = u128::from(self.capacity - self.tokens);
        if earned >= missing {
            self.tokens = self.capacity;
            self.last_refill = now;
        } else {
            // earned < missing <= u32::MAX
            let earned = u32::try_from(earned).unwrap_or(u32::MAX);
            self.tokens += earned;
            self.last_refill += self.refill_interval * earned;
        }
    }
}
