//! Shared building blocks for the request-triggered task scheduler.
//!
//! - [`config`]: TOML configuration with environment overrides
//! - [`task`]: validated task definitions
//! - [`keys`]: the cache key namespace for per-task run state
//! - [`event`]: lifecycle events emitted by the engine
//! - [`clock`]: injectable wall clock

pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod keys;
pub mod task;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    CacheConfig, ChannelKind, MailConfig, NotificationConfig, NotifyOn, TriggerConfig,
    WebhookConfig,
};
pub use error::CoreError;
pub use event::LifecycleEvent;
pub use keys::{key, KeyNamespace, RunField};
pub use task::{Parameters, TaskDefinition};
