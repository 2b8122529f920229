//! Shared notification types and the error enum.

use chrono::{DateTime, Utc};
use serde::Serialize;
use trigger_core::LifecycleEvent;

/// Errors that can occur during notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("SMTP delivery failed: {0}")]
    Smtp(String),

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Structured details attached to a lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventContext {
    pub command: Option<String>,
    pub error: Option<String>,
    /// Retry attempt number (retry events only).
    pub attempt: Option<u32>,
    pub max_retries: Option<u32>,
    pub timestamp: DateTime<Utc>,
}

impl EventContext {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            command: None,
            error: None,
            attempt: None,
            max_retries: None,
            timestamp,
        }
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_attempt(mut self, attempt: u32, max_retries: u32) -> Self {
        self.attempt = Some(attempt);
        self.max_retries = Some(max_retries);
        self
    }

    /// Present fields as `(name, value)` pairs, in a stable order.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::with_capacity(5);
        if let Some(command) = &self.command {
            out.push(("command", command.clone()));
        }
        if let Some(error) = &self.error {
            out.push(("error", error.clone()));
        }
        if let Some(attempt) = self.attempt {
            out.push(("attempt", attempt.to_string()));
        }
        if let Some(max) = self.max_retries {
            out.push(("max_retries", max.to_string()));
        }
        out.push(("timestamp", self.timestamp.to_rfc3339()));
        out
    }
}

/// One lifecycle event for one task, as handed to every channel.
#[derive(Debug, Clone, Serialize)]
pub struct TaskNotification {
    pub task: String,
    pub event: LifecycleEvent,
    pub message: String,
    pub context: EventContext,
}

impl TaskNotification {
    /// `Scheduled Task {event}: {task}`, shared by the webhook text and the mail subject.
    pub fn title(&self) -> String {
        format!("Scheduled Task {}: {}", self.event, self.task)
    }
}

/// What a channel did with a notification it did not fail on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Channel is not configured (no URL, no recipient); a local no-op.
    Skipped,
}

/// Result of dispatching a notification to a single channel.
#[derive(Debug)]
pub struct DispatchResult {
    pub channel: &'static str,
    pub success: bool,
    pub skipped: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}
