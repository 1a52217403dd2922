use super::{DeliveryError, INotificationComposer, Notification, NotificationKind};
use tracing::info;

/// Used when no notification service is configured
pub struct LogNotificationComposer {}

#[async_trait::async_trait]
impl INotificationComposer for LogNotificationComposer {
    async fn send(
        &self,
        kind: NotificationKind,
        notification: Notification,
    ) -> Result<(), DeliveryError> {
        let event_ids = notification
            .items
            .iter()
            .map(|item| item.event.id.as_string())
            .collect::<Vec<_>>();
        info!(
            "No notification service configured. Would have sent {} notification to user: {} through {:?} about events: {:?}",
            kind, notification.user.id, notification.channels, event_ids
        );
        Ok(())
    }
}
