//! The command-execution seam: how a task's `command` actually runs.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use trigger_core::Parameters;

/// Error type for command execution.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("{0}")]
    Failed(String),
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("command panicked: {0}")]
    Panicked(String),
}

/// Runs the job body identified by a task's `command`.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn execute(&self, command: &str, parameters: &Parameters) -> Result<(), CommandError>;
}

type CommandFn = Arc<dyn Fn(Parameters) -> BoxFuture<'static, Result<(), CommandError>> + Send + Sync>;

/// A [`CommandRunner`] over named async handlers.
///
/// ```ignore
/// let mut commands = CommandRegistry::new();
/// commands.register("backup:run", |params| async move {
///     run_backup(params).await.map_err(|e| CommandError::Failed(e.to_string()))
/// });
/// ```
#[derive(Default, Clone)]
pub struct CommandRegistry {
    commands: HashMap<String, CommandFn>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F, Fut>(&mut self, command: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(Parameters) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), CommandError>> + Send + 'static,
    {
        let handler: CommandFn = Arc::new(move |params| handler(params).boxed());
        self.commands.insert(command.into(), handler);
        self
    }

    pub fn contains(&self, command: &str) -> bool {
        self.commands.contains_key(command)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.commands.keys().collect();
        names.sort();
        f.debug_struct("CommandRegistry").field("commands", &names).finish()
    }
}

#[async_trait]
impl CommandRunner for CommandRegistry {
    async fn execute(&self, command: &str, parameters: &Parameters) -> Result<(), CommandError> {
        let handler = self
            .commands
            .get(command)
            .ok_or_else(|| CommandError::UnknownCommand(command.to_string()))?;
        handler(parameters.clone()).await
    }
}
