use std::sync::Arc;

use tracing::{debug, error, info, warn};
use trigger_cache::{CacheError, KvStore};
use trigger_core::{LifecycleEvent, TaskDefinition};
use trigger_notify::EventContext;

use crate::background::BackgroundExecutor;
use crate::outcome::TaskOutcome;
use crate::runner::CommandError;

use super::TriggerEngine;

impl TriggerEngine {
    /// Emit the failure event and run the retry protocol.
    ///
    /// Returns `true` when the caller should re-execute right away, which
    /// only happens without a background executor.
    pub(super) async fn handle_failure(
        &self,
        task: &TaskDefinition,
        store: &Arc<dyn KvStore>,
        failure: &CommandError,
    ) -> Result<bool, CacheError> {
        let now = self.clock.now();
        error!(
            task = %task.name,
            command = %task.command,
            error = %failure,
            "scheduled task failed"
        );
        self.dispatcher
            .notify(
                &task.name,
                LifecycleEvent::Failure,
                &format!("Task execution failed: {failure}"),
                EventContext::new(now)
                    .with_command(&task.command)
                    .with_error(failure.to_string()),
            )
            .await;

        if task.max_retries == 0 {
            return Ok(false);
        }

        let state = self.state(store.as_ref(), &task.name);
        let retries = state.retry_count().await?;
        let max = task.max_retries;

        if retries >= max {
            error!(task = %task.name, max_retries = max, "task failed after {max} retries");
            state.clear_retries().await?;
            return Ok(false);
        }

        let attempt = retries + 1;
        state.set_retry_count(attempt).await?;
        warn!(task = %task.name, attempt, max_retries = max, "retrying task, attempt {attempt}/{max}");
        self.dispatcher
            .notify(
                &task.name,
                LifecycleEvent::Retry,
                &format!("Retrying task execution (attempt {attempt}/{max})"),
                EventContext::new(now)
                    .with_command(&task.command)
                    .with_error(failure.to_string())
                    .with_attempt(attempt, max),
            )
            .await;

        match &self.background {
            Some(background) => {
                self.schedule_retry(background, task, store);
                Ok(false)
            }
            None => Ok(true),
        }
    }

    fn schedule_retry(
        &self,
        background: &BackgroundExecutor,
        task: &TaskDefinition,
        store: &Arc<dyn KvStore>,
    ) {
        let engine = self.clone();
        let job_task = task.clone();
        let job_store = Arc::clone(store);
        background.submit_delayed(self.retry_delay, async move {
            let outcome = engine.run_retry(&job_task, &job_store).await;
            debug!(task = %job_task.name, ?outcome, "retry finished");
        });
        debug!(task = %task.name, delay = ?self.retry_delay, "retry scheduled");
    }

    /// A delayed retry. Re-checks the gate (another process may have run
    /// the task meanwhile) and takes the lock like a fresh evaluation.
    pub(super) async fn run_retry(&self, task: &TaskDefinition, store: &Arc<dyn KvStore>) -> TaskOutcome {
        match self.gate(task, store.as_ref()).await {
            Ok(Some(skip)) => {
                info!(task = %task.name, outcome = ?skip, "retry skipped");
                return skip;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(task = %task.name, error = %e, "retry gate check failed");
                return TaskOutcome::Errored(e.to_string());
            }
        }

        match self
            .state(store.as_ref(), &task.name)
            .try_lock(task.lock_duration)
            .await
        {
            Ok(true) => self.run_locked(task, store).await,
            Ok(false) => {
                info!(task = %task.name, "retry skipped, lock held");
                TaskOutcome::LockHeld
            }
            Err(e) => {
                warn!(task = %task.name, error = %e, "retry could not take the lock");
                TaskOutcome::Errored(e.to_string())
            }
        }
    }
}
