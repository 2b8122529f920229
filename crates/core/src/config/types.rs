use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::event::LifecycleEvent;

// ── Top-level config ────────────────────────────────────────────────

/// Full trigger configuration, loaded once per process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Explicit global switch. `None` defers to the environment tier.
    #[serde(default)]
    pub enabled: Option<bool>,

    /// Deployment tier (`production`, `staging`, `local`, ...).
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Task entries in file order, decoded lazily so one malformed entry
    /// cannot take the others down.
    #[serde(default)]
    pub tasks: IndexMap<String, toml::Value>,

    #[serde(default)]
    pub notifications: NotificationConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

fn default_environment() -> String {
    "production".into()
}

/// Tiers in which an unset global flag means "off".
pub(crate) const NON_PRODUCTION_TIERS: &[&str] = &["local", "development", "testing"];

// ── Notifications ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Channels every event fans out to, in order.
    #[serde(default = "default_channels")]
    pub channels: Vec<ChannelKind>,

    #[serde(default)]
    pub notify_on: NotifyOn,

    #[serde(default, alias = "slack")]
    pub webhook: WebhookConfig,

    #[serde(default)]
    pub mail: MailConfig,
}

fn default_true() -> bool {
    true
}

fn default_channels() -> Vec<ChannelKind> {
    vec![ChannelKind::Log]
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channels: default_channels(),
            notify_on: NotifyOn::default(),
            webhook: WebhookConfig::default(),
            mail: MailConfig::default(),
        }
    }
}

/// Notification channel selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Log,
    #[serde(alias = "slack")]
    Webhook,
    Mail,
}

/// Per-event toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyOn {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default = "default_true")]
    pub failure: bool,
    #[serde(default)]
    pub retry: bool,
}

impl Default for NotifyOn {
    fn default() -> Self {
        Self {
            success: true,
            failure: true,
            retry: false,
        }
    }
}

impl NotifyOn {
    pub fn allows(&self, event: LifecycleEvent) -> bool {
        match event {
            LifecycleEvent::Success => self.success,
            LifecycleEvent::Failure => self.failure,
            LifecycleEvent::Retry => self.retry,
        }
    }
}

/// Chat webhook (Slack-compatible incoming webhook).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: Option<String>,
    /// Optional channel override sent in the payload.
    pub channel: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub to: Option<String>,
    #[serde(default = "default_from_address")]
    pub from_address: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default = "default_true")]
    pub tls: bool,
}

fn default_from_address() -> String {
    "noreply@example.com".into()
}

fn default_from_name() -> String {
    "Scheduled Trigger".into()
}

fn default_smtp_host() -> String {
    "localhost".into()
}

fn default_smtp_port() -> u16 {
    587
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            to: None,
            from_address: default_from_address(),
            from_name: default_from_name(),
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            tls: true,
        }
    }
}

// ── Cache ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Shared Redis store. `None` = in-process store.
    pub redis_url: Option<String>,
}

fn default_prefix() -> String {
    "scheduled_trigger".into()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            redis_url: None,
        }
    }
}
