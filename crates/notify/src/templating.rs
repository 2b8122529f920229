//! Minijinja rendering of the plain-text mail body.
//!
//! The template is registered once at construction, so a syntax error
//! surfaces when the mail channel is built rather than on first send.

use minijinja::{context, Environment};
use serde::Serialize;

use crate::traits::{NotifyError, TaskNotification};

const MAIL_BODY_NAME: &str = "mail_body.txt";

const MAIL_BODY: &str = "\
Scheduled Task Notification
==========================

Task: {{ task }}
Event: {{ event }}
Message: {{ message }}
Time: {{ time }}
{% if context %}

Additional Context:
{% for item in context %}
- {{ item.key }}: {{ item.value }}
{% endfor %}
{% endif %}
";

#[derive(Debug, Serialize)]
struct ContextItem {
    key: &'static str,
    value: String,
}

/// Renders notification text with a pre-registered template environment.
#[derive(Debug)]
pub struct TemplateRenderer {
    env: Environment<'static>,
}

impl TemplateRenderer {
    pub fn new() -> Result<Self, NotifyError> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.add_template(MAIL_BODY_NAME, MAIL_BODY)
            .map_err(|e| NotifyError::Template(e.to_string()))?;
        Ok(Self { env })
    }

    /// Render the mail body for one notification.
    pub fn mail_body(&self, n: &TaskNotification) -> Result<String, NotifyError> {
        let items: Vec<ContextItem> = n
            .context
            .entries()
            .into_iter()
            .map(|(key, value)| ContextItem { key, value })
            .collect();

        let template = self
            .env
            .get_template(MAIL_BODY_NAME)
            .map_err(|e| NotifyError::Template(e.to_string()))?;
        template
            .render(context! {
                task => n.task.as_str(),
                event => n.event.label(),
                message => n.message.as_str(),
                time => n.context.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                context => items,
            })
            .map_err(|e| NotifyError::Template(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use trigger_core::LifecycleEvent;

    use super::*;
    use crate::traits::EventContext;

    #[test]
    fn renders_header_and_context() {
        let renderer = TemplateRenderer::new().unwrap();
        let n = TaskNotification {
            task: "backup".into(),
            event: LifecycleEvent::Retry,
            message: "Retrying task (attempt 1/3)".into(),
            context: EventContext::new(Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap())
                .with_command("backup:run")
                .with_error("disk full")
                .with_attempt(1, 3),
        };

        let body = renderer.mail_body(&n).unwrap();
        assert!(body.starts_with("Scheduled Task Notification\n"));
        assert!(body.contains("Task: backup\n"));
        assert!(body.contains("Event: Retry\n"));
        assert!(body.contains("Message: Retrying task (attempt 1/3)\n"));
        assert!(body.contains("Time: 2024-05-01 08:30:00\n"));
        assert!(body.contains("Additional Context:\n"));
        assert!(body.contains("- command: backup:run\n"));
        assert!(body.contains("- error: disk full\n"));
        assert!(body.contains("- attempt: 1\n"));
        assert!(body.contains("- max_retries: 3\n"));
    }

    #[test]
    fn message_is_not_html_escaped() {
        let renderer = TemplateRenderer::new().unwrap();
        let n = TaskNotification {
            task: "report".into(),
            event: LifecycleEvent::Failure,
            message: "exit <1> & \"stderr\"".into(),
            context: EventContext::new(Utc::now()),
        };
        let body = renderer.mail_body(&n).unwrap();
        assert!(body.contains("Message: exit <1> & \"stderr\""));
    }
}
