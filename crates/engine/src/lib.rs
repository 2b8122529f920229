//! Request-triggered task scheduling.
//!
//! Each call to [`TriggerEngine::evaluate`] is one scheduling pass: every
//! configured task is checked against its interval, daily quota and lock in
//! the shared [`KvStore`](trigger_cache::KvStore), and run at most once.
//! There is no background scheduler loop; passes happen as often as the
//! host calls them (typically once per inbound request).

pub mod background;
pub mod engine;
pub mod error;
pub mod inspect;
pub mod outcome;
pub mod runner;
pub mod state;

pub use background::BackgroundExecutor;
pub use engine::TriggerEngine;
pub use error::EngineError;
pub use inspect::{Inspector, TaskStatus};
pub use outcome::{PassReport, TaskOutcome};
pub use runner::{CommandError, CommandRegistry, CommandRunner};
pub use state::{RunState, TaskState};
