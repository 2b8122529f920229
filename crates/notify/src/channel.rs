use trigger_core::{ChannelKind, NotificationConfig};

use crate::email::MailChannel;
use crate::log;
use crate::traits::{Delivery, NotifyError, TaskNotification};
use crate::webhook::WebhookChannel;

/// A configured delivery channel. New channels are added as variants.
#[derive(Debug)]
pub enum Channel {
    Log,
    Webhook(WebhookChannel),
    Mail(MailChannel),
}

impl Channel {
    /// Build the channel for `kind` from the notification settings.
    pub fn from_config(kind: ChannelKind, config: &NotificationConfig) -> Result<Self, NotifyError> {
        Ok(match kind {
            ChannelKind::Log => Channel::Log,
            ChannelKind::Webhook => Channel::Webhook(WebhookChannel::from_config(&config.webhook)),
            ChannelKind::Mail => Channel::Mail(MailChannel::from_config(&config.mail)?),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Channel::Log => "log",
            Channel::Webhook(_) => "webhook",
            Channel::Mail(_) => "mail",
        }
    }

    pub async fn send(&self, notification: &TaskNotification) -> Result<Delivery, NotifyError> {
        match self {
            Channel::Log => Ok(log::send(notification)),
            Channel::Webhook(webhook) => webhook.send(notification).await,
            Channel::Mail(mail) => mail.send(notification).await,
        }
    }
}
