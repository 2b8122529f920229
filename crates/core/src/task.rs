//! Task definitions: the static, validated form of a `[tasks.<name>]` entry.

use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Opaque key/value arguments handed to the command.
pub type Parameters = IndexMap<String, serde_json::Value>;

pub const DEFAULT_INTERVAL_MINUTES: u64 = 60;
pub const DEFAULT_LOCK_DURATION_SECS: u64 = 300;
/// Upper bound for `lock_duration_seconds` (one week).
pub const MAX_LOCK_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

/// A named, independently scheduled unit of work.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDefinition {
    pub name: String,
    pub enabled: bool,
    pub command: String,
    /// Minimum time between successful runs.
    pub interval: Duration,
    /// TTL of the mutual-exclusion lock; bounds how long one run may hold it.
    pub lock_duration: Duration,
    /// Hand execution to the background executor instead of running inline.
    pub run_async: bool,
    pub max_retries: u32,
    /// Executions allowed per calendar day. `None` = unlimited.
    pub daily_limit: Option<u32>,
    pub parameters: Parameters,
}

/// Raw task entry as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSettings {
    #[serde(default)]
    pub enabled: bool,

    pub command: Option<String>,

    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,

    #[serde(default = "default_lock_duration_seconds")]
    pub lock_duration_seconds: u64,

    #[serde(default, rename = "async")]
    pub run_async: bool,

    #[serde(default, alias = "max_retries")]
    pub retries: u32,

    #[serde(default, alias = "daily_limit")]
    pub per_day_limit: Option<u32>,

    #[serde(default)]
    pub parameters: Parameters,
}

fn default_interval_minutes() -> u64 {
    DEFAULT_INTERVAL_MINUTES
}

fn default_lock_duration_seconds() -> u64 {
    DEFAULT_LOCK_DURATION_SECS
}

impl TaskDefinition {
    /// An enabled, synchronous task with default lock, no retries and no quota.
    pub fn new(name: impl Into<String>, command: impl Into<String>, interval: Duration) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            command: command.into(),
            interval,
            lock_duration: Duration::from_secs(DEFAULT_LOCK_DURATION_SECS),
            run_async: false,
            max_retries: 0,
            daily_limit: None,
            parameters: Parameters::new(),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_lock_duration(mut self, lock_duration: Duration) -> Self {
        self.lock_duration = lock_duration;
        self
    }

    pub fn with_async(mut self, run_async: bool) -> Self {
        self.run_async = run_async;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_daily_limit(mut self, limit: u32) -> Self {
        self.daily_limit = Some(limit);
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    /// Validate raw settings into a definition.
    pub fn from_settings(name: &str, settings: TaskSettings) -> Result<Self, CoreError> {
        let invalid = |reason: &str| CoreError::InvalidTask {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if name.trim().is_empty() {
            return Err(invalid("task name must not be empty"));
        }

        let command = settings
            .command
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| invalid("missing 'command'"))?;

        if settings.interval_minutes == 0 {
            return Err(invalid("'interval_minutes' must be at least 1"));
        }
        let interval_secs = settings
            .interval_minutes
            .checked_mul(60)
            .ok_or_else(|| invalid("'interval_minutes' is out of range"))?;
        if settings.lock_duration_seconds == 0 {
            return Err(invalid("'lock_duration_seconds' must be at least 1"));
        }
        if settings.lock_duration_seconds > MAX_LOCK_DURATION_SECS {
            return Err(invalid("'lock_duration_seconds' must not exceed one week"));
        }

        Ok(Self {
            name: name.to_string(),
            enabled: settings.enabled,
            command,
            interval: Duration::from_secs(interval_secs),
            lock_duration: Duration::from_secs(settings.lock_duration_seconds),
            run_async: settings.run_async,
            max_retries: settings.retries,
            daily_limit: settings.per_day_limit,
            parameters: settings.parameters,
        })
    }

    /// Decode and validate one entry of the `[tasks]` table.
    pub fn from_toml(name: &str, value: &toml::Value) -> Result<Self, CoreError> {
        let settings = value
            .clone()
            .try_into::<TaskSettings>()
            .map_err(|e| CoreError::InvalidTask {
                name: name.to_string(),
                reason: e.message().to_string(),
            })?;
        Self::from_settings(name, settings)
    }
}
