//! Read and reset access to task configuration and run state, for
//! operator tooling (list, status, clear).

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use trigger_cache::KvStore;
use trigger_core::{CoreError, KeyNamespace, TaskDefinition, TriggerConfig};

use crate::error::EngineError;
use crate::state::{RunState, TaskState};

/// Configuration and run state of one task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskStatus {
    pub name: String,
    pub enabled: bool,
    pub command: String,
    pub interval_minutes: u64,
    pub run_async: bool,
    pub daily_limit: Option<u32>,
    pub state: RunState,
    /// `last_run_at + interval`; `None` when the task never ran (it runs on
    /// the next pass).
    pub next_run_at: Option<DateTime<Utc>>,
}

impl TaskStatus {
    fn new(task: &TaskDefinition, state: RunState) -> Self {
        let next_run_at = state.last_run_at.and_then(|last| {
            TimeDelta::from_std(task.interval)
                .ok()
                .and_then(|interval| last.checked_add_signed(interval))
        });
        Self {
            name: task.name.clone(),
            enabled: task.enabled,
            command: task.command.clone(),
            interval_minutes: task.interval.as_secs() / 60,
            run_async: task.run_async,
            daily_limit: task.daily_limit,
            state,
            next_run_at,
        }
    }

    /// `Inactive` when disabled, `Running` while the lock is held, else `Active`.
    pub fn label(&self) -> &'static str {
        if !self.enabled {
            "Inactive"
        } else if self.state.locked {
            "Running"
        } else {
            "Active"
        }
    }
}

/// Operator view over a loaded configuration.
#[derive(Debug, Clone)]
pub struct Inspector {
    config: TriggerConfig,
    namespace: KeyNamespace,
}

impl Inspector {
    pub fn new(config: TriggerConfig) -> Self {
        let namespace = config.key_namespace();
        Self { config, namespace }
    }

    /// Every configured task in configuration order; malformed entries are
    /// returned as errors rather than skipped.
    pub fn list(&self) -> Vec<Result<TaskDefinition, CoreError>> {
        self.config
            .tasks
            .keys()
            .map(|name| self.config.task_definition(name))
            .collect()
    }

    pub async fn status(&self, store: &dyn KvStore, name: &str) -> Result<TaskStatus, EngineError> {
        let task = self.config.task_definition(name)?;
        let state = TaskState::new(store, &self.namespace, name).snapshot().await?;
        Ok(TaskStatus::new(&task, state))
    }

    /// Status of every valid task, in configuration order.
    pub async fn status_all(&self, store: &dyn KvStore) -> Result<Vec<TaskStatus>, EngineError> {
        let mut out = Vec::with_capacity(self.config.tasks.len());
        for task in self.config.task_definitions() {
            let state = TaskState::new(store, &self.namespace, &task.name)
                .snapshot()
                .await?;
            out.push(TaskStatus::new(&task, state));
        }
        Ok(out)
    }

    /// Delete all run state of one task, including a held lock.
    pub async fn clear(&self, store: &dyn KvStore, name: &str) -> Result<(), EngineError> {
        if !self.config.tasks.contains_key(name) {
            return Err(CoreError::UnknownTask(name.to_string()).into());
        }
        TaskState::new(store, &self.namespace, name).clear().await?;
        tracing::info!(task = name, "run state cleared");
        Ok(())
    }

    /// Clear every configured task. Returns the number of tasks cleared.
    pub async fn clear_all(&self, store: &dyn KvStore) -> Result<usize, EngineError> {
        for name in self.config.tasks.keys() {
            TaskState::new(store, &self.namespace, name).clear().await?;
        }
        tracing::info!(tasks = self.config.tasks.len(), "run state cleared for all tasks");
        Ok(self.config.tasks.len())
    }
}
