use crate::{APIResponse, BaseClient, ReminderType, ID};
use nudge_api_structs::*;
use reqwest::StatusCode;
use serde::Serialize;
use std::sync::Arc;

#[derive(Clone)]
pub struct ReminderClient {
    base: Arc<BaseClient>,
}

pub struct CreateReminderInput {
    pub event_id: ID,
    pub reminder_date: i64,
    pub reminder_type: Option<ReminderType>,
    pub custom_message: Option<String>,
}

pub struct UpdateReminderInput {
    pub event_id: ID,
    pub reminder_date: i64,
    pub reminder_type: Option<ReminderType>,
    pub custom_message: Option<String>,
}

pub struct SnoozeReminderInput {
    pub event_id: ID,
    pub snoozed_until: i64,
}

#[derive(Serialize)]
struct EmptyBody {}

impl ReminderClient {
    pub(crate) fn new(base: Arc<BaseClient>) -> Self {
        Self { base }
    }

    pub async fn create(
        &self,
        input: CreateReminderInput,
    ) -> APIResponse<create_reminder::APIResponse> {
        let body = create_reminder::RequestBody {
            event_id: input.event_id,
            reminder_date: input.reminder_date,
            reminder_type: input.reminder_type,
            custom_message: input.custom_message,
        };
        self.base
            .post(body, "reminders".into(), StatusCode::CREATED)
            .await
    }

    pub async fn list(&self) -> APIResponse<get_reminders::APIResponse> {
        self.base.get("reminders".into(), StatusCode::OK).await
    }

    pub async fn update(
        &self,
        input: UpdateReminderInput,
    ) -> APIResponse<update_reminder::APIResponse> {
        let body = update_reminder::RequestBody {
            reminder_date: input.reminder_date,
            reminder_type: input.reminder_type,
            custom_message: input.custom_message,
        };
        self.base
            .put(
                body,
                format!("reminders/{}", input.event_id),
                StatusCode::OK,
            )
            .await
    }

    pub async fn cancel(&self, event_id: ID) -> APIResponse<cancel_reminder::APIResponse> {
        self.base
            .delete(format!("reminders/{}", event_id), StatusCode::OK)
            .await
    }

    pub async fn snooze(
        &self,
        input: SnoozeReminderInput,
    ) -> APIResponse<snooze_reminder::APIResponse> {
        let body = snooze_reminder::RequestBody {
            snoozed_until: input.snoozed_until,
        };
        self.base
            .post(
                body,
                format!("reminders/{}/snooze", input.event_id),
                StatusCode::OK,
            )
            .await
    }

    pub async fn acknowledge(
        &self,
        event_id: ID,
    ) -> APIResponse<acknowledge_reminder::APIResponse> {
        self.base
            .post(
                EmptyBody {},
                format!("reminders/{}/acknowledge", event_id),
                StatusCode::OK,
            )
            .await
    }

    /// Requires the admin key
    pub async fn get_failed(&self) -> APIResponse<get_failed_reminders::APIResponse> {
        self.base
            .get("admin/reminders/failed".into(), StatusCode::OK)
            .await
    }

    /// Requires the admin key
    pub async fn send_welcome(&self, user_id: ID) -> APIResponse<send_welcome::APIResponse> {
        self.base
            .post(
                EmptyBody {},
                format!("admin/users/{}/welcome", user_id),
                StatusCode::ACCEPTED,
            )
            .await
    }
}
