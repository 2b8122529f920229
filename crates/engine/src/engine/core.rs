use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use trigger_cache::KvStore;
use trigger_core::{Clock, KeyNamespace, NotifyOn, SystemClock, TaskDefinition, TriggerConfig};
use trigger_notify::{Channel, Dispatcher};

use crate::background::BackgroundExecutor;
use crate::error::EngineError;
use crate::runner::CommandRunner;
use crate::state::TaskState;

/// Delay before a failed run is retried on the background executor.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Evaluates configured tasks against the shared run state.
///
/// Cloning is cheap; clones share the task list, runner, dispatcher and
/// background executor. Background jobs hold a clone.
#[derive(Clone)]
pub struct TriggerEngine {
    pub(super) active: bool,
    pub(super) tasks: Arc<[TaskDefinition]>,
    pub(super) namespace: KeyNamespace,
    pub(super) runner: Arc<dyn CommandRunner>,
    pub(super) dispatcher: Arc<Dispatcher>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) background: Option<BackgroundExecutor>,
    pub(super) retry_delay: Duration,
}

impl TriggerEngine {
    /// An active engine over `tasks` with the default key prefix, the system
    /// clock, log-only notifications and no background executor.
    pub fn new(tasks: Vec<TaskDefinition>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            active: true,
            tasks: tasks.into(),
            namespace: KeyNamespace::new(trigger_core::CacheConfig::default().prefix),
            runner,
            dispatcher: Arc::new(
                Dispatcher::new(vec![Channel::Log]).with_notify_on(NotifyOn::default()),
            ),
            clock: Arc::new(SystemClock),
            background: None,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Build from loaded configuration. Malformed task entries are logged
    /// and left out; invalid notification settings are an error.
    pub fn from_config(config: &TriggerConfig, runner: Arc<dyn CommandRunner>) -> Result<Self, EngineError> {
        let dispatcher = Dispatcher::from_config(&config.notifications)?;
        let engine = Self {
            active: config.is_active(),
            namespace: config.key_namespace(),
            dispatcher: Arc::new(dispatcher),
            ..Self::new(config.task_definitions(), runner)
        };
        info!(
            active = engine.active,
            tasks = engine.tasks.len(),
            prefix = engine.namespace.prefix(),
            "trigger engine configured"
        );
        Ok(engine)
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn with_namespace(mut self, namespace: KeyNamespace) -> Self {
        self.namespace = namespace;
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = Arc::new(dispatcher);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Enable asynchronous execution for `async` tasks and delayed retries.
    pub fn with_background(mut self, executor: BackgroundExecutor) -> Self {
        self.background = Some(executor);
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn tasks(&self) -> &[TaskDefinition] {
        &self.tasks
    }

    pub fn namespace(&self) -> &KeyNamespace {
        &self.namespace
    }

    pub fn background(&self) -> Option<&BackgroundExecutor> {
        self.background.as_ref()
    }

    pub(super) fn state<'a>(&'a self, store: &'a dyn KvStore, task: &'a str) -> TaskState<'a> {
        TaskState::new(store, &self.namespace, task)
    }
}

impl std::fmt::Debug for TriggerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerEngine")
            .field("active", &self.active)
            .field("tasks", &self.tasks.len())
            .field("namespace", &self.namespace)
            .field("background", &self.background.is_some())
            .finish()
    }
}
