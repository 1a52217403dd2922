use super::{DeliveryError, INotificationComposer, Notification, NotificationKind};
use nudge_domain::NotificationChannel;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::warn;

const WEBHOOK_KEY_HEADER: &str = "nudge-webhook-key";

/// Posts notifications as JSON to the external notification service
pub struct WebhookNotificationComposer {
    client: Client,
    url: String,
    key: Option<String>,
}

impl WebhookNotificationComposer {
    pub fn new(url: String, key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, url, key }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NotificationUserPayload<'a> {
    id: String,
    name: &'a str,
    email: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NotificationItemPayload<'a> {
    event_id: String,
    title: &'a str,
    date: i64,
    location: &'a str,
    image_url: Option<&'a str>,
    description: Option<&'a str>,
    price: Option<&'a str>,
    reminder_id: Option<String>,
    reminder_date: Option<i64>,
    custom_message: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NotificationPayload<'a> {
    kind: NotificationKind,
    channels: &'a [NotificationChannel],
    user: NotificationUserPayload<'a>,
    items: Vec<NotificationItemPayload<'a>>,
}

impl<'a> NotificationPayload<'a> {
    fn new(kind: NotificationKind, n: &'a Notification) -> Self {
        Self {
            kind,
            channels: &n.channels,
            user: NotificationUserPayload {
                id: n.user.id.as_string(),
                name: &n.user.name,
                email: &n.user.email,
            },
            items: n
                .items
                .iter()
                .map(|item| NotificationItemPayload {
                    event_id: item.event.id.as_string(),
                    title: &item.event.title,
                    date: item.event.date,
                    location: &item.event.location,
                    image_url: item.event.image_url.as_deref(),
                    description: item.event.description.as_deref(),
                    price: item.event.price.as_deref(),
                    reminder_id: item.reminder.as_ref().map(|r| r.id.as_string()),
                    reminder_date: item.reminder.as_ref().map(|r| r.effective_fire_time()),
                    custom_message: item.custom_message(),
                })
                .collect(),
        }
    }
}

fn classify_status(status: StatusCode) -> Result<(), DeliveryError> {
    if status.is_success() {
        Ok(())
    } else if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
    {
        Err(DeliveryError::Transient(format!(
            "Notification service responded with {}",
            status
        )))
    } else {
        Err(DeliveryError::Permanent(format!(
            "Notification service rejected the notification with {}",
            status
        )))
    }
}

#[async_trait::async_trait]
impl INotificationComposer for WebhookNotificationComposer {
    async fn send(
        &self,
        kind: NotificationKind,
        notification: Notification,
    ) -> Result<(), DeliveryError> {
        let payload = NotificationPayload::new(kind, &notification);
        let mut req = self.client.post(&self.url).json(&payload);
        if let Some(key) = &self.key {
            req = req.header(WEBHOOK_KEY_HEADER, key);
        }

        let res = req.send().await.map_err(|e| {
            warn!("Unable to reach the notification service. Err: {:?}", e);
            DeliveryError::Transient(e.to_string())
        })?;
        classify_status(res.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_server_side_failures_are_transient() {
        assert!(classify_status(StatusCode::OK).is_ok());
        assert!(classify_status(StatusCode::ACCEPTED).is_ok());
        assert!(classify_status(StatusCode::BAD_GATEWAY)
            .unwrap_err()
            .is_transient());
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS)
            .unwrap_err()
            .is_transient());
        assert!(!classify_status(StatusCode::BAD_REQUEST)
            .unwrap_err()
            .is_transient());
        assert!(!classify_status(StatusCode::NOT_FOUND)
            .unwrap_err()
            .is_transient());
    }
}
