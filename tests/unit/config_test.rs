//! Tests for configuration validation

use shard_rescheduler::config::{DispatchLimitConfig, ReschedulerConfig, ShardSetConfig};

#[test]
fn test_rescheduler_config_defaults() {
    let cfg = ReschedulerConfig::default();
    assert_eq!(cfg.name, "default");
    assert_eq!(
        cfg.dispatch_limit,
        Some(DispatchLimitConfig {
            per_second: 100,
            burst: 100
        })
    );
    assert_eq!(cfg.max_backoff_ms, 100);
    assert_eq!(cfg.thread_stack_size, 256 * 1024);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_rescheduler_config_invalid_name() {
    let cfg = ReschedulerConfig::new().with_name("  ");
    assert!(cfg.validate().is_err());
}

#[test]
fn test_rescheduler_config_invalid_rate() {
    let zero_rate = ReschedulerConfig::new().with_dispatch_limit(0, 10);
    assert!(zero_rate.validate().is_err());

    let zero_burst = ReschedulerConfig::new().with_dispatch_limit(10, 0);
    let err = zero_burst.validate().unwrap_err();
    assert!(err.contains("burst"));
}

#[test]
fn test_rescheduler_config_invalid_backoff_and_stack() {
    assert!(ReschedulerConfig::new()
        .with_max_backoff_ms(0)
        .validate()
        .is_err());
    assert!(ReschedulerConfig::new()
        .with_thread_stack_size(1024)
        .validate()
        .is_err());
}

#[test]
fn test_rescheduler_config_from_json_partial() {
    let cfg = ReschedulerConfig::from_json_str(r#"{"name": "shard-2", "max_backoff_ms": 25}"#)
        .unwrap();
    assert_eq!(cfg.name, "shard-2");
    assert_eq!(cfg.max_backoff_ms, 25);
    // Omitted fields keep their defaults.
    assert_eq!(cfg.dispatch_limit, Some(DispatchLimitConfig::default()));
}

#[test]
fn test_rescheduler_config_from_json_unlimited() {
    let cfg = ReschedulerConfig::from_json_str(r#"{"dispatch_limit": null}"#).unwrap();
    assert!(cfg.dispatch_limit.is_none());
    assert!(cfg.token_bucket().is_unlimited());
}

#[test]
fn test_rescheduler_config_from_json_rejects_invalid() {
    let err = ReschedulerConfig::from_json_str(
        r#"{"dispatch_limit": {"per_second": 0, "burst": 1}}"#,
    )
    .unwrap_err();
    assert!(err.contains("per_second"));

    let err = ReschedulerConfig::from_json_str("{not json").unwrap_err();
    assert!(err.starts_with("parse error"));
}

#[test]
fn test_rescheduler_config_from_env_burst_only() {
    let prefix = "RESCHED_CFG_TEST_BURST_";
    std::env::set_var(format!("{prefix}DISPATCH_BURST"), "7");
    let cfg = ReschedulerConfig::from_env_with_prefix(prefix).unwrap();
    assert_eq!(
        cfg.dispatch_limit,
        Some(DispatchLimitConfig {
            per_second: 100,
            burst: 7
        })
    );
}

#[test]
fn test_shard_set_config_validation() {
    let cfg = ShardSetConfig::from_json_str(
        r#"{
            "shards": {
                "shard-0": {"dispatch_limit": {"per_second": 50, "burst": 5}},
                "shard-1": {"dispatch_limit": null}
            }
        }"#,
    )
    .unwrap();
    assert_eq!(cfg.shards.len(), 2);
    assert!(cfg.shards["shard-1"].dispatch_limit.is_none());
}

#[test]
fn test_shard_set_config_rejects_empty_and_names_bad_shard() {
    assert!(ShardSetConfig::from_json_str(r#"{"shards": {}}"#).is_err());

    let err = ShardSetConfig::from_json_str(r#"{"shards": {"shard-9": {"max_backoff_ms": 0}}}"#)
        .unwrap_err();
    assert!(err.contains("shard-9"));
}
