use std::path::Path;

use indexmap::IndexMap;

use crate::error::CoreError;
use crate::keys::KeyNamespace;
use crate::task::TaskDefinition;

use super::env_opt;
use super::types::{
    CacheConfig, NotificationConfig, TriggerConfig, NON_PRODUCTION_TIERS,
};

impl TriggerConfig {
    /// Parse config from a TOML string, then apply environment overrides.
    pub fn from_toml(toml_str: &str) -> Result<Self, CoreError> {
        Self::from_toml_with(toml_str, env_opt)
    }

    /// Parse config from a TOML string, taking overrides from `lookup`
    /// instead of the process environment.
    pub fn from_toml_with(
        toml_str: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, CoreError> {
        let mut config: Self = toml::from_str(toml_str)?;
        config.apply_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// An empty configuration: no tasks, log-only notifications, in-process cache.
    pub fn empty() -> Self {
        Self {
            enabled: None,
            environment: "production".into(),
            tasks: IndexMap::new(),
            notifications: NotificationConfig::default(),
            cache: CacheConfig::default(),
        }
    }

    /// Whether the engine should be consulted at all.
    ///
    /// An explicit flag wins. Unset means on, except in the
    /// `local`/`development`/`testing` tiers.
    pub fn is_active(&self) -> bool {
        match self.enabled {
            Some(flag) => flag,
            None => !NON_PRODUCTION_TIERS
                .iter()
                .any(|tier| self.environment.eq_ignore_ascii_case(tier)),
        }
    }

    pub fn key_namespace(&self) -> KeyNamespace {
        KeyNamespace::new(self.cache.prefix.clone())
    }

    /// Every well-formed task, in configuration order. Malformed entries are
    /// logged and skipped.
    pub fn task_definitions(&self) -> Vec<TaskDefinition> {
        self.tasks
            .iter()
            .filter_map(|(name, raw)| match TaskDefinition::from_toml(name, raw) {
                Ok(task) => Some(task),
                Err(e) => {
                    tracing::warn!(task = %name, error = %e, "skipping malformed task entry");
                    None
                }
            })
            .collect()
    }

    /// Look up one task by name, surfacing config errors.
    pub fn task_definition(&self, name: &str) -> Result<TaskDefinition, CoreError> {
        let raw = self
            .tasks
            .get(name)
            .ok_or_else(|| CoreError::UnknownTask(name.to_string()))?;
        TaskDefinition::from_toml(name, raw)
    }

    /// Log a redacted summary at startup.
    pub fn log_summary(&self) {
        tracing::info!(
            active = self.is_active(),
            environment = %self.environment,
            tasks = self.tasks.len(),
            channels = ?self.notifications.channels,
            cache_prefix = %self.cache.prefix,
            redis = self.cache.redis_url.is_some(),
            "trigger config loaded"
        );
    }

    // ── Environment variable overrides ──────────────────────────────

    /// Apply environment variable overrides.
    ///
    /// - `SCHEDULED_TRIGGER_ENABLED` -> `enabled` (`true`/`1`, `false`/`0`)
    /// - `APP_ENV` -> `environment`
    /// - `SLACK_WEBHOOK_URL` -> `notifications.webhook.url`
    /// - `MAIL_TO` -> `notifications.mail.to`
    /// - `MAIL_FROM_ADDRESS` -> `notifications.mail.from_address`
    /// - `MAIL_FROM_NAME` -> `notifications.mail.from_name`
    /// - `SMTP_HOST` -> `notifications.mail.smtp_host`
    /// - `SMTP_PORT` -> `notifications.mail.smtp_port`
    /// - `SCHEDULED_TRIGGER_CACHE_PREFIX` -> `cache.prefix`
    /// - `REDIS_URL` -> `cache.redis_url`
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(env_opt);
    }

    /// Apply overrides from an arbitrary lookup (the environment in production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("SCHEDULED_TRIGGER_ENABLED") {
            match v.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => self.enabled = Some(true),
                "false" | "0" => self.enabled = Some(false),
                other => {
                    tracing::warn!(value = other, "ignoring unrecognised SCHEDULED_TRIGGER_ENABLED");
                }
            }
        }
        if let Some(v) = lookup("APP_ENV") {
            self.environment = v;
        }

        let notifications = &mut self.notifications;
        if let Some(v) = lookup("SLACK_WEBHOOK_URL") {
            notifications.webhook.url = Some(v);
        }
        if let Some(v) = lookup("MAIL_TO") {
            notifications.mail.to = Some(v);
        }
        if let Some(v) = lookup("MAIL_FROM_ADDRESS") {
            notifications.mail.from_address = v;
        }
        if let Some(v) = lookup("MAIL_FROM_NAME") {
            notifications.mail.from_name = v;
        }
        if let Some(v) = lookup("SMTP_HOST") {
            notifications.mail.smtp_host = v;
        }
        if let Some(v) = lookup("SMTP_PORT") {
            if let Ok(port) = v.parse::<u16>() {
                notifications.mail.smtp_port = port;
            }
        }

        if let Some(v) = lookup("SCHEDULED_TRIGGER_CACHE_PREFIX") {
            self.cache.prefix = v;
        }
        if let Some(v) = lookup("REDIS_URL") {
            self.cache.redis_url = Some(v);
        }
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self::empty()
    }
}
