//! Chat webhook channel (Slack-compatible incoming webhook).
//!
//! Posts a JSON payload with a short text line and a single colored
//! attachment carrying the task, event and message.

use serde_json::{json, Value};
use trigger_core::{LifecycleEvent, WebhookConfig};

use crate::traits::{Delivery, NotifyError, TaskNotification};

const FOOTER: &str = "Scheduled Trigger";

#[derive(Debug, Clone)]
pub struct WebhookChannel {
    /// `None` means unconfigured: every send is a logged no-op.
    url: Option<String>,
    /// Optional channel override.
    channel: Option<String>,
    /// Shared HTTP client (connection pooling).
    client: reqwest::Client,
}

impl WebhookChannel {
    pub fn new(url: Option<String>, channel: Option<String>) -> Self {
        Self {
            url: url.filter(|u| !u.trim().is_empty()),
            channel: channel.filter(|c| !c.trim().is_empty()),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &WebhookConfig) -> Self {
        Self::new(config.url.clone(), config.channel.clone())
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub async fn send(&self, n: &TaskNotification) -> Result<Delivery, NotifyError> {
        let Some(url) = self.url.as_deref() else {
            tracing::warn!(task = %n.task, "webhook URL not configured, skipping");
            return Ok(Delivery::Skipped);
        };

        let payload = build_payload(n, self.channel.as_deref());
        let response = self.client.post(url).json(&payload).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(%url, %status, %body, "webhook returned non-2xx status");
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(%url, %status, task = %n.task, "webhook notification delivered");
        Ok(Delivery::Sent)
    }
}

fn color(event: LifecycleEvent) -> &'static str {
    match event {
        LifecycleEvent::Success => "good",
        LifecycleEvent::Failure => "danger",
        LifecycleEvent::Retry => "warning",
    }
}

pub(crate) fn build_payload(n: &TaskNotification, channel: Option<&str>) -> Value {
    let mut payload = json!({
        "text": n.title(),
        "attachments": [{
            "color": color(n.event),
            "fields": [
                { "title": "Task", "value": n.task, "short": true },
                { "title": "Event", "value": n.event.label(), "short": true },
                { "title": "Message", "value": n.message, "short": false },
            ],
            "footer": FOOTER,
            "ts": n.context.timestamp.timestamp(),
        }],
    });
    if let Some(channel) = channel {
        payload["channel"] = Value::String(channel.to_string());
    }
    payload
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::traits::EventContext;

    fn notification(event: LifecycleEvent) -> TaskNotification {
        TaskNotification {
            task: "backup".into(),
            event,
            message: "Task executed successfully".into(),
            context: EventContext::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
                .with_command("backup:run"),
        }
    }

    type Captured = Arc<Mutex<Vec<Value>>>;

    async fn capture(State(captured): State<Captured>, Json(body): Json<Value>) -> StatusCode {
        captured.lock().unwrap().push(body);
        StatusCode::OK
    }

    async fn spawn_server(status: StatusCode) -> (String, Captured) {
        let captured: Captured = Arc::default();
        let app = if status == StatusCode::OK {
            Router::new()
                .route("/hook", post(capture))
                .with_state(captured.clone())
        } else {
            Router::new().route("/hook", post(move || async move { (status, "nope") }))
        };
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/hook"), captured)
    }

    #[test]
    fn payload_shape() {
        let payload = build_payload(&notification(LifecycleEvent::Success), Some("#ops"));
        assert_eq!(payload["text"], "Scheduled Task success: backup");
        assert_eq!(payload["channel"], "#ops");

        let attachment = &payload["attachments"][0];
        assert_eq!(attachment["color"], "good");
        assert_eq!(attachment["footer"], "Scheduled Trigger");
        assert_eq!(attachment["ts"], 1_714_564_800);
        assert_eq!(attachment["fields"][0]["value"], "backup");
        assert_eq!(attachment["fields"][1]["value"], "Success");
        assert_eq!(attachment["fields"][2]["short"], false);
    }

    #[test]
    fn payload_colors_and_optional_channel() {
        let failure = build_payload(&notification(LifecycleEvent::Failure), None);
        assert_eq!(failure["attachments"][0]["color"], "danger");
        assert!(failure.get("channel").is_none());

        let retry = build_payload(&notification(LifecycleEvent::Retry), None);
        assert_eq!(retry["attachments"][0]["color"], "warning");
    }

    #[tokio::test]
    async fn missing_url_is_skipped() {
        let channel = WebhookChannel::new(None, None);
        let delivery = channel
            .send(&notification(LifecycleEvent::Success))
            .await
            .unwrap();
        assert_eq!(delivery, Delivery::Skipped);

        let blank = WebhookChannel::new(Some("  ".into()), None);
        assert!(blank.url().is_none());
    }

    #[tokio::test]
    async fn posts_payload_to_server() {
        let (url, captured) = spawn_server(StatusCode::OK).await;
        let channel = WebhookChannel::new(Some(url), None);

        let delivery = channel
            .send(&notification(LifecycleEvent::Failure))
            .await
            .unwrap();
        assert_eq!(delivery, Delivery::Sent);

        let bodies = captured.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["text"], "Scheduled Task failure: backup");
    }

    #[tokio::test]
    async fn non_2xx_is_an_error() {
        let (url, _) = spawn_server(StatusCode::INTERNAL_SERVER_ERROR).await;
        let channel = WebhookChannel::new(Some(url), None);

        let err = channel
            .send(&notification(LifecycleEvent::Success))
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Status { status: 500, .. }), "got: {err}");
    }
}
