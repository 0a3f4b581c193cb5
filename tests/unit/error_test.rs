//! Tests for error types

use std::error::Error;
use std::time::Instant;

use shard_rescheduler::config::ReschedulerConfig;
use shard_rescheduler::core::{
    Executable, Rescheduler, ReschedulerError, SubmitError, Submitter, TaskKey, TaskState,
};

#[test]
fn test_rescheduler_error_display() {
    let err = ReschedulerError::ShutDown("shard-4".into());
    assert_eq!(err.to_string(), "rescheduler `shard-4` has been shut down");

    let err = ReschedulerError::InvalidConfig("max_backoff_ms must be greater than 0".into());
    assert!(err.to_string().contains("max_backoff_ms"));
}

#[test]
fn test_on_dispatch_thread_error_display() {
    let err = ReschedulerError::OnDispatchThread("shard-5".into());
    assert_eq!(
        err.to_string(),
        "rescheduler `shard-5` cannot restart from its own dispatch thread"
    );
}

#[test]
fn test_spawn_error_from_io() {
    let io = std::io::Error::new(std::io::ErrorKind::OutOfMemory, "no threads left");
    let err: ReschedulerError = io.into();
    assert!(matches!(err, ReschedulerError::Spawn(_)));
    assert!(err.source().is_some());
}

#[test]
fn test_submit_error_display() {
    assert_eq!(SubmitError::Full.to_string(), "downstream queue is full");
    assert_eq!(SubmitError::Closed.to_string(), "downstream queue is closed");
    assert!(SubmitError::Rejected("draining".into())
        .to_string()
        .contains("draining"));
}

#[test]
fn test_submit_error_into_anyhow() {
    let result: anyhow::Result<()> = Err(SubmitError::Closed.into());
    let err = result.unwrap_err();
    assert!(err.downcast_ref::<SubmitError>().is_some());
}

struct Note(TaskKey);

impl Executable for Note {
    fn key(&self) -> TaskKey {
        self.0
    }

    fn state(&self) -> TaskState {
        TaskState::FailedRetryable
    }
}

struct Discard;

impl Submitter<Note> for Discard {
    fn submit(&self, _task: Note) -> Result<(), SubmitError> {
        Ok(())
    }
}

#[test]
fn test_add_error_returns_task_and_source() {
    let r = Rescheduler::new(ReschedulerConfig::new().with_name("closed"), Discard).unwrap();
    assert!(r.shutdown().is_empty());

    let err = r.add(Note(11), Instant::now()).unwrap_err();
    assert!(err.to_string().contains("closed"));
    assert!(err.source().is_some());
    assert!(format!("{err:?}").contains("ShutDown"));
    assert_eq!(err.into_task().key(), 11);
}
