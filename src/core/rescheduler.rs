//! Delayed requeue of failed tasks with a single rate-gated dispatch thread.
//!
//! Producers call [`Rescheduler::add`] from any thread. One dedicated dispatch
//! thread per instance sleeps until the earliest item is due, drains due items
//! through a [`TokenBucket`], and hands them to a [`Submitter`].
//!
//! # Design Principles
//!
//! - **No polling**: the loop blocks on a `Condvar` with a deadline; `add` wakes
//!   it only when the new item becomes the earliest
//! - **Single consumer**: all extraction, token accounting and submission happen
//!   on the dispatch thread, so dispatch order is globally consistent
//! - **Lock-free submit**: the submitter runs without any internal lock held
//! - **Clean shutdown**: `stop` returns only after the dispatch thread exited,
//!   letting an in-flight submit finish first

use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::ReschedulerConfig;

use super::error::{AddError, ReschedulerError};
use super::executable::{Executable, Submitter};
use super::pending::{PendingItem, PendingSet};
use super::rate_limiter::{Acquire, TokenBucket};
use super::stats::{ReschedulerCounters, ReschedulerStats};

/// Lifecycle of a rescheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReschedulerState {
    /// No dispatch thread; items are accepted and held.
    Stopped,
    /// The dispatch thread is live.
    Running,
    /// Permanently torn down; `add` and `start` are rejected.
    ShutDown,
}

/// State guarded by the pending-set mutex.
struct Inner<T> {
    pending: PendingSet<T>,
    lifecycle: ReschedulerState,
    /// Bumped by every stop. A loop exits once this no longer matches its own.
    epoch: u64,
    /// Thread currently running the dispatch loop.
    loop_thread: Option<ThreadId>,
    /// Outlives any one dispatch thread so stop/start cannot refill it early.
    limiter: TokenBucket,
}

impl<T> Inner<T> {
    fn on_loop_thread(&self) -> bool {
        self.loop_thread == Some(thread::current().id())
    }
}

/// State shared between the facade and the dispatch thread.
struct Shared<T> {
    name: String,
    inner: Mutex<Inner<T>>,
    /// Signaled on earlier insertion, expedite and stop.
    wake: Condvar,
    counters: ReschedulerCounters,
}

/// Holds failed tasks until their retry time and hands them back under a
/// bounded dispatch rate.
///
/// One instance per shard queue; pass it explicitly to the producers and to
/// the shard's lifecycle manager.
///
/// # Example
///
/// ```rust
/// use std::time::{Duration, Instant};
/// use shard_rescheduler::config::ReschedulerConfig;
/// use shard_rescheduler::core::{Executable, Rescheduler, TaskKey, TaskState};
/// use shard_rescheduler::runtime::ChannelSubmitter;
///
/// struct Retry(TaskKey);
///
/// impl Executable for Retry {
///     fn key(&self) -> TaskKey { self.0 }
///     fn state(&self) -> TaskState { TaskState::FailedRetryable }
/// }
///
/// let (tx, rx) = crossbeam_channel::unbounded();
/// let rescheduler = Rescheduler::new(
///     ReschedulerConfig::new().with_name("shard-1"),
///     ChannelSubmitter::new(tx),
/// )?;
/// rescheduler.start()?;
/// rescheduler.add(Retry(42), Instant::now()).ok();
///
/// let task = rx.recv_timeout(Duration::from_secs(1)).unwrap();
/// assert_eq!(task.key(), 42);
/// rescheduler.stop();
/// # Ok::<(), shard_rescheduler::core::ReschedulerError>(())
/// ```
pub struct Rescheduler<T, S> {
    config: ReschedulerConfig,
    shared: Arc<Shared<T>>,
    submitter: Arc<S>,
    /// Handle of the dispatch thread; held across start/stop transitions.
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl<T, S> Rescheduler<T, S>
where
    T: Executable,
    S: Submitter<T>,
{
    /// Create a stopped rescheduler that dispatches into `submitter`.
    ///
    /// # Errors
    ///
    /// Returns `ReschedulerError::InvalidConfig` if the configuration is invalid.
    pub fn new(config: ReschedulerConfig, submitter: S) -> Result<Self, ReschedulerError> {
        config.validate().map_err(ReschedulerError::InvalidConfig)?;

        debug!(
            rescheduler = %config.name,
            dispatch_limit = ?config.dispatch_limit,
            max_backoff_ms = config.max_backoff_ms,
            "Rescheduler created"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                name: config.name.clone(),
                inner: Mutex::new(Inner {
                    pending: PendingSet::new(),
                    lifecycle: ReschedulerState::Stopped,
                    epoch: 0,
                    loop_thread: None,
                    limiter: config.token_bucket(),
                }),
                wake: Condvar::new(),
                counters: ReschedulerCounters::default(),
            }),
            config,
            submitter: Arc::new(submitter),
            dispatcher: Mutex::new(None),
        })
    }

    /// Instance label.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Configuration this instance was built from.
    #[must_use]
    pub const fn config(&self) -> &ReschedulerConfig {
        &self.config
    }

    /// Hold `task` until `target`, then dispatch it.
    ///
    /// A target in the past is dispatched as soon as the loop observes it.
    /// Never waits on the dispatch thread; safe from any number of threads.
    ///
    /// # Errors
    ///
    /// Returns an [`AddError`] carrying the task back if the rescheduler has
    /// been shut down.
    pub fn add(&self, task: T, target: Instant) -> Result<(), AddError<T>> {
        let mut inner = self.shared.inner.lock();
        if inner.lifecycle == ReschedulerState::ShutDown {
            drop(inner);
            warn!(
                rescheduler = %self.shared.name,
                task_key = task.key(),
                "Rejected add after shutdown"
            );
            return Err(AddError::new(
                task,
                ReschedulerError::ShutDown(self.shared.name.clone()),
            ));
        }

        let task_key = task.key();
        let seq = inner.pending.insert(task, target);
        let is_earliest = inner
            .pending
            .peek_earliest()
            .is_some_and(|item| item.seq == seq);
        let pending = inner.pending.len();
        drop(inner);

        ReschedulerCounters::bump(&self.shared.counters.added, 1);
        if is_earliest {
            self.shared.wake.notify_one();
        }

        debug!(
            rescheduler = %self.shared.name,
            task_key = task_key,
            seq = seq,
            pending = pending,
            "Task added for rescheduling"
        );
        Ok(())
    }

    /// Hold `task` for `delay` from now.
    ///
    /// # Errors
    ///
    /// Same as [`add`](Self::add).
    pub fn add_after(&self, task: T, delay: Duration) -> Result<(), AddError<T>> {
        self.add(task, Instant::now() + delay)
    }

    /// Number of items pending, including due items waiting on the rate limiter.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.inner.lock().pending.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ReschedulerState {
        self.shared.inner.lock().lifecycle
    }

    /// Snapshot of counters and the current pending count.
    #[must_use]
    pub fn stats(&self) -> ReschedulerStats {
        let pending = self.len();
        self.shared.counters.snapshot(pending)
    }

    /// Spawn the dispatch thread. A no-op while already running, including
    /// when called from inside a submitter.
    ///
    /// Pending items held while stopped are dispatched once due. The rate
    /// limiter keeps its state across stop/start.
    ///
    /// # Errors
    ///
    /// - `ReschedulerError::ShutDown` after [`shutdown`](Self::shutdown)
    /// - `ReschedulerError::OnDispatchThread` if called from inside a submitter
    ///   after that submitter stopped the loop; restart from another thread
    /// - `ReschedulerError::Spawn` if the OS refuses a new thread
    pub fn start(&self) -> Result<(), ReschedulerError> {
        {
            let inner = self.shared.inner.lock();
            if inner.lifecycle == ReschedulerState::ShutDown {
                return Err(ReschedulerError::ShutDown(self.shared.name.clone()));
            }
            if inner.on_loop_thread() {
                if inner.lifecycle == ReschedulerState::Running {
                    debug!(rescheduler = %self.shared.name, "Start ignored on dispatch thread");
                    return Ok(());
                }
                return Err(ReschedulerError::OnDispatchThread(self.shared.name.clone()));
            }
        }

        let mut dispatcher = self.dispatcher.lock();

        if self.state() == ReschedulerState::Running {
            debug!(rescheduler = %self.shared.name, "Rescheduler already running");
            return Ok(());
        }

        // A loop stopped from its own thread is reaped before a new one starts.
        if let Some(stale) = dispatcher.take() {
            join_dispatcher(&self.shared.name, stale);
        }

        let epoch = {
            let mut inner = self.shared.inner.lock();
            if inner.lifecycle == ReschedulerState::ShutDown {
                return Err(ReschedulerError::ShutDown(self.shared.name.clone()));
            }
            inner.lifecycle = ReschedulerState::Running;
            inner.epoch
        };

        let shared = Arc::clone(&self.shared);
        let submitter = Arc::clone(&self.submitter);
        let max_backoff = self.config.max_backoff();

        let spawned = thread::Builder::new()
            .name(format!("rescheduler-{}", self.shared.name))
            .stack_size(self.config.thread_stack_size)
            .spawn(move || dispatch_loop(&shared, &*submitter, max_backoff, epoch));

        match spawned {
            Ok(handle) => {
                *dispatcher = Some(handle);
                info!(
                    rescheduler = %self.shared.name,
                    pending = self.len(),
                    "Rescheduler started"
                );
                Ok(())
            }
            Err(e) => {
                self.shared.inner.lock().lifecycle = ReschedulerState::Stopped;
                error!(rescheduler = %self.shared.name, error = %e, "Failed to spawn dispatch thread");
                Err(ReschedulerError::Spawn(e))
            }
        }
    }

    /// Stop the dispatch thread and wait for it to exit.
    ///
    /// Pending items are kept for a later [`start`](Self::start). A submit in
    /// progress completes before this returns; no dispatch happens afterwards.
    /// Called from inside a submitter, it only signals the loop.
    pub fn stop(&self) {
        self.halt(ReschedulerState::Stopped);
    }

    /// Permanently tear down the rescheduler.
    ///
    /// Stops the loop as [`stop`](Self::stop) does, then returns the
    /// undispatched tasks in dispatch order. Later `add` calls are rejected.
    pub fn shutdown(&self) -> Vec<T> {
        let first = self.state() != ReschedulerState::ShutDown;
        // Repeated calls still reap a loop that shut itself down.
        self.halt(ReschedulerState::ShutDown);

        let drained: Vec<T> = self
            .shared
            .inner
            .lock()
            .pending
            .drain_ordered()
            .into_iter()
            .map(|item| item.task)
            .collect();

        if first {
            info!(
                rescheduler = %self.shared.name,
                abandoned = drained.len(),
                "Rescheduler shut down"
            );
        }
        drained
    }

    /// Move every pending task matching `pred` forward to now.
    ///
    /// Relative order among moved tasks is kept. `pred` runs while the
    /// internal lock is held. Returns how many tasks were moved.
    pub fn expedite<F>(&self, pred: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        let moved = self
            .shared
            .inner
            .lock()
            .pending
            .expedite(Instant::now(), pred);
        if moved > 0 {
            ReschedulerCounters::bump(&self.shared.counters.expedited, moved as u64);
            self.shared.wake.notify_one();
            debug!(rescheduler = %self.shared.name, moved = moved, "Expedited pending tasks");
        }
        moved
    }

    /// Eagerly drop pending tasks that are no longer dispatchable.
    ///
    /// Returns how many were dropped; they count as skipped.
    pub fn purge_ineligible(&self) -> usize {
        let removed = self
            .shared
            .inner
            .lock()
            .pending
            .retain(|task| task.is_dispatchable());
        if removed > 0 {
            ReschedulerCounters::bump(&self.shared.counters.skipped, removed as u64);
            debug!(rescheduler = %self.shared.name, removed = removed, "Purged ineligible tasks");
        }
        removed
    }

    /// Signal the loop to exit and, off the dispatch thread, join it.
    fn halt(&self, next: ReschedulerState) {
        {
            let mut inner = self.shared.inner.lock();
            if inner.on_loop_thread() {
                transition(&mut inner, next);
                drop(inner);
                self.shared.wake.notify_all();
                debug!(rescheduler = %self.shared.name, "Stop requested from dispatch thread");
                return;
            }
        }

        let mut dispatcher = self.dispatcher.lock();
        transition(&mut self.shared.inner.lock(), next);
        self.shared.wake.notify_all();

        if let Some(handle) = dispatcher.take() {
            join_dispatcher(&self.shared.name, handle);
            info!(
                rescheduler = %self.shared.name,
                pending = self.len(),
                "Rescheduler stopped"
            );
        }
    }
}

impl<T, S> Drop for Rescheduler<T, S> {
    fn drop(&mut self) {
        // Signal the loop but DON'T join: an explicit stop() is the graceful path.
        let mut inner = self.shared.inner.lock();
        inner.epoch += 1;
        drop(inner);
        self.shared.wake.notify_all();
        if self.dispatcher.get_mut().is_some() {
            debug!(rescheduler = %self.shared.name, "Rescheduler dropped while running - dispatch thread detached");
        }
    }
}

fn transition<T>(inner: &mut Inner<T>, next: ReschedulerState) {
    inner.epoch += 1;
    if inner.lifecycle != ReschedulerState::ShutDown {
        inner.lifecycle = next;
    }
}

fn join_dispatcher(name: &str, handle: JoinHandle<()>) {
    if handle.join().is_err() {
        error!(rescheduler = %name, "Dispatch thread panicked");
    }
}

/// Resets the facade when a dispatch loop ends, including by panic.
///
/// A loop that exits while its epoch is still current was not asked to stop,
/// so the rescheduler is marked `Stopped` and a later `start` spawns anew.
struct LoopExit<'a, T> {
    shared: &'a Shared<T>,
    epoch: u64,
}

impl<T> Drop for LoopExit<'_, T> {
    fn drop(&mut self) {
        let mut inner = self.shared.inner.lock();
        if inner.on_loop_thread() {
            inner.loop_thread = None;
        }
        let abandoned = inner.epoch == self.epoch && inner.lifecycle == ReschedulerState::Running;
        if abandoned {
            inner.lifecycle = ReschedulerState::Stopped;
        }
        let pending = inner.pending.len();
        drop(inner);

        if thread::panicking() {
            error!(
                rescheduler = %self.shared.name,
                pending = pending,
                "Dispatch thread panicked; rescheduler stopped"
            );
        } else if abandoned {
            warn!(rescheduler = %self.shared.name, "Dispatch loop exited without a stop request");
        }
    }
}

/// Body of the dispatch thread.
///
/// Holds the lock while deciding, releases it while waiting (inside the
/// condvar) and while submitting.
fn dispatch_loop<T, S>(shared: &Shared<T>, submitter: &S, max_backoff: Duration, epoch: u64)
where
    T: Executable,
    S: Submitter<T> + ?Sized,
{
    debug!(rescheduler = %shared.name, "Dispatch thread started");

    let _exit = LoopExit { shared, epoch };
    let mut inner = shared.inner.lock();
    inner.loop_thread = Some(thread::current().id());

    while inner.epoch == epoch {
        let Some(target) = inner.pending.peek_earliest().map(|item| item.target) else {
            shared.wake.wait(&mut inner);
            continue;
        };

        let now = Instant::now();
        if target > now {
            shared.wake.wait_until(&mut inner, target);
            continue;
        }

        let dispatchable = inner
            .pending
            .peek_earliest()
            .is_some_and(|item| item.task.is_dispatchable());
        if !dispatchable {
            if let Some(item) = inner.pending.extract_earliest() {
                ReschedulerCounters::bump(&shared.counters.skipped, 1);
                debug!(
                    rescheduler = %shared.name,
                    task_key = item.task.key(),
                    seq = item.seq,
                    "Skipping task that is no longer dispatchable"
                );
            }
            continue;
        }

        let acquired = inner.limiter.try_acquire_at(now);
        if let Acquire::Wait(wait) = acquired {
            let wait = wait.min(max_backoff);
            ReschedulerCounters::bump(&shared.counters.deferred, 1);
            debug!(
                rescheduler = %shared.name,
                pending = inner.pending.len(),
                wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                "Dispatch deferred by rate limiter"
            );
            shared.wake.wait_for(&mut inner, wait);
            continue;
        }

        let Some(item) = inner.pending.extract_earliest() else {
            continue;
        };
        drop(inner);

        hand_off(shared, submitter, item);

        inner = shared.inner.lock();
    }

    drop(inner);
    debug!(rescheduler = %shared.name, "Dispatch thread exiting");
}

/// Submit one due item. Runs without the lock.
fn hand_off<T, S>(shared: &Shared<T>, submitter: &S, item: PendingItem<T>)
where
    T: Executable,
    S: Submitter<T> + ?Sized,
{
    let PendingItem { task, target, seq } = item;
    let task_key = task.key();
    let late_ms = u64::try_from(target.elapsed().as_millis()).unwrap_or(u64::MAX);

    match submitter.submit(task) {
        Ok(()) => {
            ReschedulerCounters::bump(&shared.counters.dispatched, 1);
            debug!(
                rescheduler = %shared.name,
                task_key = task_key,
                seq = seq,
                late_ms = late_ms,
                "Dispatched rescheduled task"
            );
        }
        Err(e) => {
            ReschedulerCounters::bump(&shared.counters.submit_failures, 1);
            warn!(
                rescheduler = %shared.name,
                task_key = task_key,
                seq = seq,
                error = %e,
                "Submitter refused rescheduled task"
            );
        }
    }
}
