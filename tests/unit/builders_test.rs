//! Tests for builder modules

use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver};
use shard_rescheduler::builders::{build_reschedulers, load_shard_config};
use shard_rescheduler::config::{ReschedulerConfig, ShardSetConfig};
use shard_rescheduler::core::{Executable, ReschedulerError, TaskKey, TaskState};
use shard_rescheduler::runtime::ChannelSubmitter;

struct ShardTask(TaskKey);

impl Executable for ShardTask {
    fn key(&self) -> TaskKey {
        self.0
    }

    fn state(&self) -> TaskState {
        TaskState::FailedRetryable
    }
}

fn two_shards() -> ShardSetConfig {
    ShardSetConfig::from_json_str(
        r#"{
            "shards": {
                "shard-a": {"name": "ignored", "dispatch_limit": null},
                "shard-b": {"dispatch_limit": {"per_second": 10, "burst": 1}}
            }
        }"#,
    )
    .unwrap()
}

#[test]
fn test_build_reschedulers_names_by_shard() {
    let mut receivers: Vec<(String, Receiver<Arc<ShardTask>>)> = Vec::new();
    let reschedulers = build_reschedulers::<Arc<ShardTask>, _, _>(&two_shards(), |shard, _cfg| {
        let (tx, rx) = unbounded();
        receivers.push((shard.to_string(), rx));
        Ok(ChannelSubmitter::new(tx))
    })
    .unwrap();

    assert_eq!(reschedulers.len(), 2);
    assert_eq!(receivers.len(), 2);
    assert_eq!(reschedulers["shard-a"].name(), "shard-a");
    assert!(reschedulers["shard-a"].config().dispatch_limit.is_none());
    assert_eq!(reschedulers["shard-b"].name(), "shard-b");
}

#[test]
fn test_built_reschedulers_are_isolated() {
    let mut receivers = std::collections::HashMap::new();
    let reschedulers = build_reschedulers::<Arc<ShardTask>, _, _>(&two_shards(), |shard, _cfg| {
        let (tx, rx) = unbounded::<Arc<ShardTask>>();
        receivers.insert(shard.to_string(), rx);
        Ok(ChannelSubmitter::new(tx))
    })
    .unwrap();

    let a = &reschedulers["shard-a"];
    a.start().unwrap();
    a.add(Arc::new(ShardTask(1)), Instant::now()).unwrap();

    let got = receivers["shard-a"]
        .recv_timeout(Duration::from_secs(1))
        .unwrap();
    assert_eq!(got.key(), 1);
    assert!(receivers["shard-b"].try_recv().is_err());
    assert_eq!(reschedulers["shard-b"].len(), 0);
    a.stop();
}

#[test]
fn test_build_reschedulers_propagates_factory_error() {
    let result = build_reschedulers::<Arc<ShardTask>, ChannelSubmitter<Arc<ShardTask>>, _>(
        &two_shards(),
        |shard, _cfg| Err(ReschedulerError::InvalidConfig(format!("no queue for {shard}"))),
    );
    assert!(matches!(result, Err(ReschedulerError::InvalidConfig(msg)) if msg.starts_with("no queue")));
}

#[test]
fn test_build_reschedulers_rejects_invalid_config() {
    let mut cfg = two_shards();
    cfg.shards
        .insert("shard-c".into(), ReschedulerConfig::new().with_max_backoff_ms(0));
    let result = build_reschedulers::<Arc<ShardTask>, ChannelSubmitter<Arc<ShardTask>>, _>(
        &cfg,
        |_shard, _cfg| Ok(ChannelSubmitter::new(unbounded().0)),
    );
    assert!(matches!(result, Err(ReschedulerError::InvalidConfig(_))));
}

#[test]
fn test_load_shard_config_from_file() {
    let path = std::env::temp_dir().join(format!(
        "shard_rescheduler_builders_{}.json",
        std::process::id()
    ));
    fs::write(
        &path,
        r#"{"shards": {"shard-0": {"dispatch_limit": {"per_second": 5, "burst": 2}}}}"#,
    )
    .unwrap();

    let cfg = load_shard_config(&path).unwrap();
    let _ = fs::remove_file(&path);
    assert_eq!(cfg.shards.len(), 1);
    assert_eq!(cfg.shards["shard-0"].dispatch_limit.map(|l| l.burst), Some(2));
}

#[test]
fn test_load_shard_config_missing_file() {
    let err = load_shard_config("/nonexistent/shards.json").unwrap_err();
    assert!(format!("{err:#}").contains("shards.json"));
}
