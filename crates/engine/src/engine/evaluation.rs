use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, error};
use trigger_cache::{CacheError, KvStore};
use trigger_core::TaskDefinition;

use crate::outcome::{PassReport, TaskOutcome};

use super::TriggerEngine;

impl TriggerEngine {
    /// Run one scheduling pass over every configured task.
    ///
    /// Never fails: store faults and panics are contained per task, logged,
    /// and reported as [`TaskOutcome::Errored`].
    pub async fn evaluate(&self, store: &Arc<dyn KvStore>) -> PassReport {
        if !self.active {
            debug!("scheduled trigger inactive, skipping pass");
            return PassReport::inactive();
        }

        let mut report = PassReport {
            active: true,
            outcomes: Vec::with_capacity(self.tasks.len()),
        };

        for task in self.tasks.iter() {
            let outcome = match AssertUnwindSafe(self.evaluate_task(task, store))
                .catch_unwind()
                .await
            {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => {
                    error!(task = %task.name, error = %e, "task evaluation failed");
                    TaskOutcome::Errored(e.to_string())
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!(task = %task.name, panic = %message, "task evaluation panicked");
                    TaskOutcome::Errored(message)
                }
            };
            report.outcomes.push((task.name.clone(), outcome));
        }

        report
    }

    /// Evaluate a single task: gate, lock, then run inline or submit.
    pub async fn evaluate_task(
        &self,
        task: &TaskDefinition,
        store: &Arc<dyn KvStore>,
    ) -> Result<TaskOutcome, CacheError> {
        if !task.enabled {
            return Ok(TaskOutcome::Disabled);
        }

        if let Some(skip) = self.gate(task, store.as_ref()).await? {
            return Ok(skip);
        }

        if !self
            .state(store.as_ref(), &task.name)
            .try_lock(task.lock_duration)
            .await?
        {
            debug!(task = %task.name, "lock held by another evaluation, skipping");
            return Ok(TaskOutcome::LockHeld);
        }

        self.dispatch(task, store).await
    }

    /// Interval and daily-quota checks. `Some` means "skip with this outcome".
    /// Has no side effects.
    pub(super) async fn gate(
        &self,
        task: &TaskDefinition,
        store: &dyn KvStore,
    ) -> Result<Option<TaskOutcome>, CacheError> {
        let state = self.state(store, &task.name);

        if let Some(last_run) = state.last_run().await? {
            let now = self.clock.now().timestamp();
            if !is_due(last_run, now, task.interval) {
                debug!(task = %task.name, last_run, now, "not due yet");
                return Ok(Some(TaskOutcome::NotDue));
            }
        }

        if let Some(limit) = task.daily_limit {
            let count = state.daily_count(self.clock.today()).await?;
            if count >= limit {
                debug!(task = %task.name, count, limit, "daily limit reached");
                return Ok(Some(TaskOutcome::QuotaExhausted));
            }
        }

        Ok(None)
    }
}

/// Due iff strictly more than `interval` has passed since `last_run` (unix seconds).
pub(super) fn is_due(last_run: i64, now: i64, interval: Duration) -> bool {
    let interval = i64::try_from(interval.as_secs()).unwrap_or(i64::MAX);
    now.saturating_sub(last_run) > interval
}

pub(super) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
