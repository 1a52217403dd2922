use nudge_domain::{Reminder, ReminderStatus, ReminderType, ID};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ReminderDTO {
    pub id: ID,
    pub user_id: ID,
    pub event_id: ID,
    pub reminder_date: i64,
    pub reminder_type: ReminderType,
    pub status: ReminderStatus,
    /// Derived from `status`
    pub notified: bool,
    pub notified_at: Option<i64>,
    pub snoozed_until: Option<i64>,
    pub custom_message: Option<String>,
    pub failure_reason: Option<String>,
    pub retry_count: i64,
    pub last_retry_at: Option<i64>,
    pub acknowledged_at: Option<i64>,
    pub created: i64,
    pub updated: i64,
}

impl ReminderDTO {
    pub fn new(reminder: Reminder) -> Self {
        Self {
            notified: reminder.is_notified(),
            id: reminder.id,
            user_id: reminder.user_id,
            event_id: reminder.event_id,
            reminder_date: reminder.reminder_date,
            reminder_type: reminder.reminder_type,
            status: reminder.status,
            notified_at: reminder.notified_at,
            snoozed_until: reminder.snoozed_until,
            custom_message: reminder.custom_message,
            failure_reason: reminder.failure_reason,
            retry_count: reminder.retry_count,
            last_retry_at: reminder.last_retry_at,
            acknowledged_at: reminder.acknowledged_at,
            created: reminder.created,
            updated: reminder.updated,
        }
    }
}
