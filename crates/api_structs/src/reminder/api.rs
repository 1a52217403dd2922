use crate::dtos::ReminderDTO;
use nudge_domain::{Reminder, ReminderType, ID};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderResponse {
    pub reminder: ReminderDTO,
}

impl ReminderResponse {
    pub fn new(reminder: Reminder) -> Self {
        Self {
            reminder: ReminderDTO::new(reminder),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemindersResponse {
    pub reminders: Vec<ReminderDTO>,
}

impl RemindersResponse {
    pub fn new(reminders: Vec<Reminder>) -> Self {
        Self {
            reminders: reminders.into_iter().map(ReminderDTO::new).collect(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct EventPathParams {
    pub event_id: ID,
}

pub mod create_reminder {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestBody {
        pub event_id: ID,
        pub reminder_date: i64,
        #[serde(default)]
        pub reminder_type: Option<ReminderType>,
        #[serde(default)]
        pub custom_message: Option<String>,
    }

    pub type APIResponse = ReminderResponse;
}

pub mod get_reminders {
    use super::*;

    pub type APIResponse = RemindersResponse;
}

pub mod update_reminder {
    use super::*;

    pub type PathParams = EventPathParams;

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestBody {
        pub reminder_date: i64,
        #[serde(default)]
        pub reminder_type: Option<ReminderType>,
        #[serde(default)]
        pub custom_message: Option<String>,
    }

    pub type APIResponse = ReminderResponse;
}

pub mod cancel_reminder {
    use super::*;

    pub type PathParams = EventPathParams;

    pub type APIResponse = ReminderResponse;
}

pub mod snooze_reminder {
    use super::*;

    pub type PathParams = EventPathParams;

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestBody {
        pub snoozed_until: i64,
    }

    pub type APIResponse = ReminderResponse;
}

pub mod acknowledge_reminder {
    use super::*;

    pub type PathParams = EventPathParams;

    pub type APIResponse = ReminderResponse;
}

pub mod get_failed_reminders {
    use super::*;

    pub type APIResponse = RemindersResponse;
}

pub mod send_welcome {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PathParams {
        pub user_id: ID,
    }

    #[derive(Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct APIResponse {
        pub job_id: ID,
    }
}
