use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::json::from_json_str;

pub const DEFAULT_MAX_CACHED_PATHS: usize = 200;
pub const DEFAULT_WORKER_COUNT: usize = 1;
pub const DEFAULT_IDLE_SLEEP_MS: u64 = 100;
pub const DEFAULT_SEARCH_TIMEOUT_MS: u64 = 2_000;
pub const DEFAULT_MAX_STEPS_PER_SLICE: u32 = 256;
/// Workers only notice shutdown and timeouts between slices.
pub const MAX_STEPS_PER_SLICE_LIMIT: u32 = 65_536;

/// Tunables for [`crate::Pathfinder`]. Every field is optional in JSON;
/// `search_timeout_ms: null` disables the watchdog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathfinderConfig {
    pub max_cached_paths: usize,
    pub worker_count: usize,
    pub idle_sleep_ms: u64,
    pub search_timeout_ms: Option<u64>,
    pub max_steps_per_slice: u32,
}

impl Default for PathfinderConfig {
    fn default() -> Self {
        Self {
            max_cached_paths: DEFAULT_MAX_CACHED_PATHS,
            worker_count: DEFAULT_WORKER_COUNT,
            idle_sleep_ms: DEFAULT_IDLE_SLEEP_MS,
            search_timeout_ms: Some(DEFAULT_SEARCH_TIMEOUT_MS),
            max_steps_per_slice: DEFAULT_MAX_STEPS_PER_SLICE,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config json invalid at {location}: {source}")]
    Parse {
        location: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("worker_count must be at least 1")]
    NoWorkers,
    #[error("max_steps_per_slice must be at least 1")]
    ZeroStepBudget,
    #[error("max_steps_per_slice {value} exceeds the limit of {limit}")]
    StepBudgetTooLarge { value: u32, limit: u32 },
    #[error("search_timeout_ms must be positive; use null to disable the timeout")]
    ZeroTimeout,
}

impl PathfinderConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = from_json_str(raw).map_err(|failure| ConfigError::Parse {
            location: failure.location,
            source: failure.source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.max_steps_per_slice == 0 {
            return Err(ConfigError::ZeroStepBudget);
        }
        if self.max_steps_per_slice > MAX_STEPS_PER_SLICE_LIMIT {
            return Err(ConfigError::StepBudgetTooLarge {
                value: self.max_steps_per_slice,
                limit: MAX_STEPS_PER_SLICE_LIMIT,
            });
        }
        if self.search_timeout_ms == Some(0) {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn idle_sleep(&self) -> Duration {
        normalize_non_zero_duration(
            Duration::from_millis(self.idle_sleep_ms),
            Duration::from_millis(DEFAULT_IDLE_SLEEP_MS),
        )
    }

    pub fn search_timeout(&self) -> Option<Duration> {
        self.search_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}
