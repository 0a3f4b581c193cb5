//! Builders to construct one rescheduler per shard from configuration.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing::info;

use crate::config::{ReschedulerConfig, ShardSetConfig};
use crate::core::{AppResult, Executable, Rescheduler, ReschedulerError, Submitter};

/// Build an isolated rescheduler for every configured shard.
///
/// Each instance is named after its shard key, overriding the configured
/// name. `submitter_factory` supplies the downstream queue of each shard.
///
/// # Errors
///
/// Returns `ReschedulerError::InvalidConfig` if validation fails, or whatever
/// error the factory reports.
pub fn build_reschedulers<T, S, F>(
    cfg: &ShardSetConfig,
    mut submitter_factory: F,
) -> Result<HashMap<String, Rescheduler<T, S>>, ReschedulerError>
where
    T: Executable,
    S: Submitter<T>,
    F: FnMut(&str, &ReschedulerConfig) -> Result<S, ReschedulerError>,
{
    cfg.validate().map_err(ReschedulerError::InvalidConfig)?;

    let mut reschedulers = HashMap::with_capacity(cfg.shards.len());
    for (shard, shard_cfg) in &cfg.shards {
        let submitter = submitter_factory(shard, shard_cfg)?;
        let rescheduler = Rescheduler::new(shard_cfg.clone().with_name(shard.clone()), submitter)?;
        reschedulers.insert(shard.clone(), rescheduler);
    }

    info!(shards = reschedulers.len(), "Built shard reschedulers");
    Ok(reschedulers)
}

/// Read and validate a shard configuration file (JSON).
///
/// # Errors
///
/// Fails if the file cannot be read, parsed or validated.
pub fn load_shard_config(path: impl AsRef<Path>) -> AppResult<ShardSetConfig> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading shard config {}", path.display()))?;
    ShardSetConfig::from_json_str(&raw)
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("loading shard config {}", path.display()))
}
