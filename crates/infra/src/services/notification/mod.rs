mod log;
mod webhook;

pub use self::log::LogNotificationComposer;
use nudge_domain::{Event, NotificationChannel, Reminder, User};
use serde::Serialize;
use std::fmt::Display;
use thiserror::Error;
pub use webhook::WebhookNotificationComposer;

/// What a `Notification` is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    Reminder,
    Digest,
    Confirmation,
    Cancellation,
    Welcome,
}

impl Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::Reminder => "reminder",
            Self::Digest => "digest",
            Self::Confirmation => "confirmation",
            Self::Cancellation => "cancellation",
            Self::Welcome => "welcome",
        };
        f.write_str(kind)
    }
}

/// One `Event` a `Notification` mentions, with the `Reminder` that caused it if any
#[derive(Debug, Clone)]
pub struct NotificationItem {
    pub event: Event,
    pub reminder: Option<Reminder>,
}

impl NotificationItem {
    pub fn custom_message(&self) -> Option<&str> {
        self.reminder
            .as_ref()
            .and_then(|r| r.custom_message.as_deref())
    }
}

/// Everything needed to render a message to a `User`
#[derive(Debug, Clone)]
pub struct Notification {
    pub user: User,
    pub channels: Vec<NotificationChannel>,
    pub items: Vec<NotificationItem>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeliveryError {
    /// Worth trying again later, e.g. the notification service is unreachable
    #[error("Transient delivery error: {0}")]
    Transient(String),
    #[error("Permanent delivery error: {0}")]
    Permanent(String),
}

impl DeliveryError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Renders and transmits notifications. The actual email and push
/// delivery is owned by an external notification service.
#[async_trait::async_trait]
pub trait INotificationComposer: Send + Sync {
    async fn send(
        &self,
        kind: NotificationKind,
        notification: Notification,
    ) -> Result<(), DeliveryError>;
}
