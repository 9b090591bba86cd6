//! Scheduler and pipeline configuration structures.

use serde::{Deserialize, Serialize};

use super::worker::WorkerPoolConfig;
use crate::core::DEFAULT_PRIORITY;

/// Prefix shared by every environment variable the crate reads.
pub const ENV_PREFIX: &str = "MEDIA_SCHEDULER_";

/// Scheduler tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Batch size used when callers do not pass one.
    pub batch_size: usize,
    /// Priority given to work submitted without one.
    pub default_priority: i32,
    /// `next_batch(n)` pops at most `scan_factor * n` queue entries.
    pub scan_factor: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            default_priority: DEFAULT_PRIORITY,
            scan_factor: 2,
        }
    }
}

impl SchedulerConfig {
    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first offending field.
    pub fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("batch_size must be greater than 0".into());
        }
        if self.default_priority < 0 {
            return Err("default_priority must not be negative".into());
        }
        if self.scan_factor == 0 {
            return Err("scan_factor must be greater than 0".into());
        }
        Ok(())
    }
}

/// Root configuration for a scheduler plus the worker pool driving it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Scheduler section.
    pub scheduler: SchedulerConfig,
    /// Worker pool section.
    pub worker_pool: WorkerPoolConfig,
}

impl PipelineConfig {
    /// Validate both sections.
    ///
    /// # Errors
    ///
    /// Returns a message prefixed with the failing section.
    pub fn validate(&self) -> Result<(), String> {
        self.scheduler
            .validate()
            .map_err(|e| format!("scheduler invalid: {e}"))?;
        self.worker_pool
            .validate()
            .map_err(|e| format!("worker_pool invalid: {e}"))?;
        Ok(())
    }

    /// Parse configuration from a JSON string and validate. Missing fields
    /// take their defaults.
    ///
    /// # Errors
    ///
    /// Parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from `MEDIA_SCHEDULER_*` variables, reading a `.env` file first
    /// if one is present.
    ///
    /// # Errors
    ///
    /// A variable that does not parse, or a validation failure.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration through `lookup`, which receives full variable
    /// names such as `MEDIA_SCHEDULER_BATCH_SIZE`. Unset variables keep the
    /// defaults.
    ///
    /// # Errors
    ///
    /// A variable that does not parse, or a validation failure.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let read = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(v) = read("BATCH_SIZE") {
            cfg.scheduler.batch_size = parse_var("BATCH_SIZE", &v)?;
        }
        if let Some(v) = read("DEFAULT_PRIORITY") {
            cfg.scheduler.default_priority = parse_var("DEFAULT_PRIORITY", &v)?;
        }
        if let Some(v) = read("SCAN_FACTOR") {
            cfg.scheduler.scan_factor = parse_var("SCAN_FACTOR", &v)?;
        }
        if let Some(v) = read("WORKERS") {
            cfg.worker_pool.worker_count = parse_var("WORKERS", &v)?;
        }
        if let Some(v) = read("WORKER_BATCH_SIZE") {
            cfg.worker_pool.batch_size = parse_var("WORKER_BATCH_SIZE", &v)?;
        }
        if let Some(v) = read("POLL_INTERVAL_MS") {
            cfg.worker_pool.poll_interval_ms = parse_var("POLL_INTERVAL_MS", &v)?;
        }
        if let Some(v) = read("MAX_IN_FLIGHT") {
            cfg.worker_pool.max_in_flight = parse_var("MAX_IN_FLIGHT", &v)?;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| format!("{ENV_PREFIX}{name}: {e}"))
}
