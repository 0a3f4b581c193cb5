//! Tests for runtime submitters

use std::sync::Arc;
use std::time::{Duration, Instant};

use shard_rescheduler::config::ReschedulerConfig;
use shard_rescheduler::core::{
    Executable, Rescheduler, SubmitError, Submitter, TaskKey, TaskState,
};
use shard_rescheduler::runtime::{ChannelSubmitter, TokioSubmitter};

struct AsyncTask(TaskKey);

impl Executable for AsyncTask {
    fn key(&self) -> TaskKey {
        self.0
    }

    fn state(&self) -> TaskState {
        TaskState::FailedRetryable
    }
}

#[test]
fn test_channel_submitter_bounded_full() {
    let (tx, rx) = crossbeam_channel::bounded(1);
    let submitter = ChannelSubmitter::new(tx);
    assert!(submitter.submit(AsyncTask(1)).is_ok());
    assert!(matches!(submitter.submit(AsyncTask(2)), Err(SubmitError::Full)));
    assert_eq!(rx.recv().unwrap().key(), 1);
}

#[test]
fn test_full_channel_counts_submit_failure() {
    let (tx, rx) = crossbeam_channel::bounded(1);
    let r = Rescheduler::new(
        ReschedulerConfig::new().with_name("full").unlimited(),
        ChannelSubmitter::new(tx),
    )
    .unwrap();

    let now = Instant::now();
    r.add(Arc::new(AsyncTask(1)), now).unwrap();
    r.add(Arc::new(AsyncTask(2)), now).unwrap();
    r.start().unwrap();

    let deadline = Instant::now() + Duration::from_secs(1);
    while r.stats().submit_failures < 1 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    r.stop();

    assert_eq!(rx.try_recv().unwrap().key(), 1);
    let stats = r.stats();
    assert_eq!(stats.dispatched, 1);
    assert_eq!(stats.submit_failures, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_submitter_feeds_async_pipeline() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let r = Rescheduler::new(
        ReschedulerConfig::new().with_name("async").unlimited(),
        TokioSubmitter::unbounded(tx),
    )
    .unwrap();
    r.start().unwrap();
    r.add_after(Arc::new(AsyncTask(42)), Duration::from_millis(10))
        .unwrap();

    let task = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("dispatch within timeout")
        .expect("channel open");
    assert_eq!(task.key(), 42);

    // stop joins a thread; keep it off the async workers.
    tokio::task::spawn_blocking(move || r.stop()).await.unwrap();
}

#[tokio::test]
async fn test_tokio_submitter_closed_receiver() {
    let (tx, rx) = tokio::sync::mpsc::channel::<AsyncTask>(4);
    drop(rx);
    let submitter = TokioSubmitter::bounded(tx);
    assert!(matches!(submitter.submit(AsyncTask(1)), Err(SubmitError::Closed)));
}
