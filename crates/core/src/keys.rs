//! Cache key namespace for per-task run state.
//!
//! Keys have the shape `{prefix}:{task}:{field}`. Field discriminators never
//! contain `:`, so splitting a key at its last `:` recovers the field and the
//! remainder recovers `{prefix}:{task}`; distinct `(task, field)` pairs under
//! one prefix therefore never collide.

use std::fmt;

/// One of the five run-state artifacts stored per task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunField {
    LastRun,
    Lock,
    DailyCount,
    DailyCountDate,
    Retries,
}

impl RunField {
    pub const ALL: [RunField; 5] = [
        RunField::LastRun,
        RunField::Lock,
        RunField::DailyCount,
        RunField::DailyCountDate,
        RunField::Retries,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RunField::LastRun => "last_run",
            RunField::Lock => "lock",
            RunField::DailyCount => "daily_count",
            RunField::DailyCountDate => "daily_count_date",
            RunField::Retries => "retries",
        }
    }
}

impl fmt::Display for RunField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derive the cache key for one run-state field of a task.
pub fn key(prefix: &str, task: &str, field: RunField) -> String {
    format!("{prefix}:{task}:{}", field.as_str())
}

/// A prefix bound once from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyNamespace {
    prefix: String,
}

impl KeyNamespace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn key(&self, task: &str, field: RunField) -> String {
        key(&self.prefix, task, field)
    }

    /// All five keys of a task, in [`RunField::ALL`] order.
    pub fn task_keys(&self, task: &str) -> Vec<String> {
        RunField::ALL.iter().map(|f| self.key(task, *f)).collect()
    }
}
