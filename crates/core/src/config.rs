//! Trigger configuration: the `[tasks]`, `[notifications]` and `[cache]`
//! sections plus the global enable flag.
//!
//! Parsed from TOML, then overlaid with environment variables (see
//! [`TriggerConfig::apply_env_overrides`]). Call [`load_dotenv`] first if a
//! `.env` file should participate.

mod loading;
mod types;
mod validation;


pub use types::{
    CacheConfig, ChannelKind, MailConfig, NotificationConfig, NotifyOn, TriggerConfig,
    WebhookConfig,
};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

pub(crate) fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}
