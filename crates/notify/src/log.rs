//! Log channel: one structured tracing event per notification.

use trigger_core::LifecycleEvent;

use crate::traits::{Delivery, TaskNotification};

/// Severity follows the event: success → info, failure → error, retry → warn.
pub fn send(n: &TaskNotification) -> Delivery {
    let task = n.task.as_str();
    let event = n.event.as_str();
    let command = n.context.command.as_deref();
    let error = n.context.error.as_deref();
    let attempt = n.context.attempt;
    let max_retries = n.context.max_retries;
    let timestamp = n.context.timestamp.timestamp();

    match n.event {
        LifecycleEvent::Success => tracing::info!(
            task,
            event,
            command,
            timestamp,
            "[ScheduledTrigger] [{task}] [{event}] {}",
            n.message
        ),
        LifecycleEvent::Failure => tracing::error!(
            task,
            event,
            command,
            error,
            timestamp,
            "[ScheduledTrigger] [{task}] [{event}] {}",
            n.message
        ),
        LifecycleEvent::Retry => tracing::warn!(
            task,
            event,
            command,
            error,
            attempt,
            max_retries,
            timestamp,
            "[ScheduledTrigger] [{task}] [{event}] {}",
            n.message
        ),
    }
    Delivery::Sent
}
