//! Rescheduler configuration structures.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::TokenBucket;

const MIN_STACK_SIZE: usize = 16 * 1024;

/// Dispatch rate limit for one rescheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchLimitConfig {
    /// Sustained dispatches per second.
    pub per_second: u32,
    /// Dispatches allowed back-to-back before the rate applies.
    pub burst: u32,
}

impl Default for DispatchLimitConfig {
    fn default() -> Self {
        Self {
            per_second: 100,
            burst: 100,
        }
    }
}

/// Configuration for a single rescheduler instance.
///
/// ```rust
/// use shard_rescheduler::config::ReschedulerConfig;
///
/// let cfg = ReschedulerConfig::new()
///     .with_name("shard-7")
///     .with_dispatch_limit(20, 1)
///     .with_max_backoff_ms(50);
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReschedulerConfig {
    /// Label used in logs and the dispatch thread name.
    pub name: String,
    /// Dispatch rate limit; `None` dispatches as fast as tasks come due.
    pub dispatch_limit: Option<DispatchLimitConfig>,
    /// Longest single wait when the rate limiter defers a dispatch.
    pub max_backoff_ms: u64,
    /// Stack size of the dispatch thread in bytes.
    pub thread_stack_size: usize,
}

impl Default for ReschedulerConfig {
    fn default() -> Self {
        Self {
            name: "default".into(),
            dispatch_limit: Some(DispatchLimitConfig::default()),
            max_backoff_ms: 100,
            thread_stack_size: 256 * 1024,
        }
    }
}

impl ReschedulerConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the instance label.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Limit dispatches to `per_second` with bursts of `burst`.
    #[must_use]
    pub const fn with_dispatch_limit(mut self, per_second: u32, burst: u32) -> Self {
        self.dispatch_limit = Some(DispatchLimitConfig { per_second, burst });
        self
    }

    /// Remove the dispatch rate limit.
    #[must_use]
    pub const fn unlimited(mut self) -> Self {
        self.dispatch_limit = None;
        self
    }

    /// Set the ceiling for rate-limit waits.
    #[must_use]
    pub const fn with_max_backoff_ms(mut self, max_backoff_ms: u64) -> Self {
        self.max_backoff_ms = max_backoff_ms;
        self
    }

    /// Set the dispatch thread's stack size.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, bytes: usize) -> Self {
        self.thread_stack_size = bytes;
        self
    }

    /// Ceiling for rate-limit waits as a `Duration`.
    #[must_use]
    pub const fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    /// Build the limiter this configuration describes.
    #[must_use]
    pub fn token_bucket(&self) -> TokenBucket {
        self.dispatch_limit.map_or_else(TokenBucket::unlimited, |limit| {
            TokenBucket::per_second(limit.per_second, limit.burst)
        })
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".into());
        }
        if let Some(limit) = self.dispatch_limit {
            if limit.per_second == 0 {
                return Err("dispatch_limit.per_second must be greater than 0".into());
            }
            if limit.burst == 0 {
                return Err("dispatch_limit.burst must be greater than 0".into());
            }
        }
        if self.max_backoff_ms == 0 {
            return Err("max_backoff_ms must be greater than 0".into());
        }
        if self.thread_stack_size < MIN_STACK_SIZE {
            return Err(format!("thread_stack_size must be at least {MIN_STACK_SIZE}"));
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a description of the parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read configuration from `<prefix>`-prefixed environment variables.
    ///
    /// A `.env` file is loaded first if present. Recognized variables:
    /// `NAME`, `DISPATCH_PER_SEC` (0 disables limiting), `DISPATCH_BURST`,
    /// `MAX_BACKOFF_MS`. Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns a description of an unparsable variable or a validation failure.
    pub fn from_env_with_prefix(prefix: &str) -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        let mut cfg = Self::default();

        if let Some(name) = read_var(prefix, "NAME") {
            cfg.name = name;
        }
        let burst = parse_var::<u32>(prefix, "DISPATCH_BURST")?;
        match parse_var::<u32>(prefix, "DISPATCH_PER_SEC")? {
            Some(0) => cfg.dispatch_limit = None,
            Some(per_second) => {
                let burst = burst.unwrap_or(per_second);
                cfg.dispatch_limit = Some(DispatchLimitConfig { per_second, burst });
            }
            None => {
                if let (Some(limit), Some(burst)) = (cfg.dispatch_limit.as_mut(), burst) {
                    limit.burst = burst;
                }
            }
        }
        if let Some(ms) = parse_var::<u64>(prefix, "MAX_BACKOFF_MS")? {
            cfg.max_backoff_ms = ms;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn read_var(prefix: &str, key: &str) -> Option<String> {
    env::var(format!("{prefix}{key}")).ok()
}

fn parse_var<V: std::str::FromStr>(prefix: &str, key: &str) -> Result<Option<V>, String>
where
    V::Err: std::fmt::Display,
{
    read_var(prefix, key)
        .map(|raw| {
            raw.trim()
                .parse::<V>()
                .map_err(|e| format!("{prefix}{key}: {e}"))
        })
        .transpose()
}

/// Configuration for every shard hosted by one process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardSetConfig {
    /// Map of shard identifier to its rescheduler configuration.
    pub shards: HashMap<String, ReschedulerConfig>,
}

impl ShardSetConfig {
    /// Validate all shards and ensure at least one shard exists.
    ///
    /// # Errors
    ///
    /// Returns a description naming the first invalid shard.
    pub fn validate(&self) -> Result<(), String> {
        if self.shards.is_empty() {
            return Err("at least one shard must be defined".into());
        }
        for (shard, cfg) in &self.shards {
            cfg.validate()
                .map_err(|e| format!("shard `{shard}` invalid: {e}"))?;
        }
        Ok(())
    }

    /// Parse shard configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a description of the parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
