use thiserror::Error;
use trigger_cache::CacheError;
use trigger_core::CoreError;
use trigger_notify::NotifyError;

/// Errors surfaced by engine construction and the inspection API.
///
/// Scheduling passes never return these; per-task faults are logged and
/// reported as [`TaskOutcome::Errored`](crate::TaskOutcome::Errored).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("run-state store: {0}")]
    Cache(#[from] CacheError),

    #[error("notification setup: {0}")]
    Notify(#[from] NotifyError),
}
