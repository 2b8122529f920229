//! Routes lifecycle events to configured channels.
//!
//! The dispatcher filters an event against the global switch and the
//! per-event toggles, then delivers it to every channel in order.
//! Individual channel failures are logged and never reach the caller.

use std::time::Instant;

use trigger_core::{LifecycleEvent, NotificationConfig, NotifyOn};

use crate::channel::Channel;
use crate::traits::{Delivery, DispatchResult, EventContext, NotifyError, TaskNotification};

#[derive(Debug)]
pub struct Dispatcher {
    enabled: bool,
    notify_on: NotifyOn,
    channels: Vec<Channel>,
}

impl Dispatcher {
    /// Dispatcher for every event, over the given channels.
    pub fn new(channels: Vec<Channel>) -> Self {
        Self {
            enabled: true,
            notify_on: NotifyOn {
                success: true,
                failure: true,
                retry: true,
            },
            channels,
        }
    }

    /// A dispatcher that drops every event.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            notify_on: NotifyOn::default(),
            channels: Vec::new(),
        }
    }

    pub fn with_notify_on(mut self, notify_on: NotifyOn) -> Self {
        self.notify_on = notify_on;
        self
    }

    /// Build every configured channel. Fails only on invalid channel
    /// settings (e.g. an unparseable mail address).
    pub fn from_config(config: &NotificationConfig) -> Result<Self, NotifyError> {
        let channels = config
            .channels
            .iter()
            .map(|kind| Channel::from_config(*kind, config))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            enabled = config.enabled,
            channels = channels.len(),
            "notification dispatcher configured"
        );

        Ok(Self {
            enabled: config.enabled,
            notify_on: config.notify_on.clone(),
            channels,
        })
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Whether `event` passes the global switch and the per-event toggle.
    pub fn accepts(&self, event: LifecycleEvent) -> bool {
        self.enabled && self.notify_on.allows(event)
    }

    /// Deliver one event to every channel.
    ///
    /// Returns one result per attempted channel; empty when the event is
    /// filtered out.
    pub async fn notify(
        &self,
        task: &str,
        event: LifecycleEvent,
        message: &str,
        context: EventContext,
    ) -> Vec<DispatchResult> {
        if !self.accepts(event) {
            tracing::trace!(task, %event, "notification filtered out");
            return Vec::new();
        }

        let notification = TaskNotification {
            task: task.to_string(),
            event,
            message: message.to_string(),
            context,
        };

        let mut results = Vec::with_capacity(self.channels.len());

        for channel in &self.channels {
            let start = Instant::now();
            let result = channel.send(&notification).await;
            let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

            let (success, skipped, error) = match result {
                Ok(delivery) => (true, delivery == Delivery::Skipped, None),
                Err(e) => {
                    tracing::warn!(
                        task,
                        %event,
                        channel = channel.name(),
                        error = %e,
                        duration_ms,
                        "notification delivery failed"
                    );
                    (false, false, Some(e.to_string()))
                }
            };

            results.push(DispatchResult {
                channel: channel.name(),
                success,
                skipped,
                error,
                duration_ms,
            });
        }

        results
    }
}
