use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error, info, warn};
use trigger_cache::{CacheError, KvStore};
use trigger_core::{LifecycleEvent, TaskDefinition};
use trigger_notify::EventContext;

use crate::outcome::TaskOutcome;
use crate::runner::CommandError;

use super::evaluation::panic_message;
use super::TriggerEngine;

impl TriggerEngine {
    /// Run a task whose lock this engine has just taken, either inline or
    /// on the background executor (`async` tasks). The lock travels with
    /// the run and is released when it finishes.
    pub(super) async fn dispatch(
        &self,
        task: &TaskDefinition,
        store: &Arc<dyn KvStore>,
    ) -> Result<TaskOutcome, CacheError> {
        if task.run_async {
            if let Some(background) = &self.background {
                let engine = self.clone();
                let job_task = task.clone();
                let job_store = Arc::clone(store);
                background.submit(async move {
                    let outcome = engine.run_locked(&job_task, &job_store).await;
                    debug!(task = %job_task.name, ?outcome, "background run finished");
                });
                info!(task = %task.name, "task submitted to background executor");
                return Ok(TaskOutcome::Submitted);
            }
            debug!(task = %task.name, "no background executor, running inline");
        }

        Ok(self.run_locked(task, store).await)
    }

    /// Execute with the lock held and record the outcome; the lock is
    /// released afterwards on every path, including panics.
    pub(super) async fn run_locked(
        &self,
        task: &TaskDefinition,
        store: &Arc<dyn KvStore>,
    ) -> TaskOutcome {
        let outcome = match AssertUnwindSafe(self.run_attempts(task, store))
            .catch_unwind()
            .await
        {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!(task = %task.name, error = %e, "recording task outcome failed");
                TaskOutcome::Errored(e.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(task = %task.name, panic = %message, "task run panicked");
                TaskOutcome::Errored(message)
            }
        };

        if let Err(e) = self.state(store.as_ref(), &task.name).unlock().await {
            warn!(
                task = %task.name,
                error = %e,
                "failed to release lock, it expires after lock_duration"
            );
        }

        outcome
    }

    /// Execute until success or until the retry protocol stops asking for an
    /// inline re-run.
    async fn run_attempts(
        &self,
        task: &TaskDefinition,
        store: &Arc<dyn KvStore>,
    ) -> Result<TaskOutcome, CacheError> {
        loop {
            match self.execute_command(task).await {
                Ok(()) => {
                    self.record_success(task, store.as_ref()).await?;
                    return Ok(TaskOutcome::Succeeded);
                }
                Err(e) => {
                    if !self.handle_failure(task, store, &e).await? {
                        return Ok(TaskOutcome::Failed(e.to_string()));
                    }
                    info!(task = %task.name, "retrying inline");
                }
            }
        }
    }

    pub(super) async fn execute_command(&self, task: &TaskDefinition) -> Result<(), CommandError> {
        info!(
            task = %task.name,
            command = %task.command,
            parameters = ?task.parameters,
            "executing scheduled task"
        );
        match AssertUnwindSafe(self.runner.execute(&task.command, &task.parameters))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => Err(CommandError::Panicked(panic_message(panic.as_ref()))),
        }
    }

    async fn record_success(&self, task: &TaskDefinition, store: &dyn KvStore) -> Result<(), CacheError> {
        let now = self.clock.now();
        let state = self.state(store, &task.name);

        state.set_last_run(now).await?;
        if task.daily_limit.is_some() {
            let count = state.increment_daily_count(self.clock.today()).await?;
            debug!(task = %task.name, count, "daily count incremented");
        }

        info!(task = %task.name, "scheduled task succeeded");
        self.dispatcher
            .notify(
                &task.name,
                LifecycleEvent::Success,
                "Task executed successfully",
                EventContext::new(now).with_command(&task.command),
            )
            .await;
        Ok(())
    }
}
