mod base;
mod reminder;
mod status;

pub(crate) use base::BaseClient;
pub use base::{APIError, APIErrorVariant, APIResponse};
pub use nudge_api_structs::dtos::*;
pub use nudge_domain::{ReminderStatus, ReminderType, ID};
use reminder::ReminderClient;
pub use reminder::{CreateReminderInput, SnoozeReminderInput, UpdateReminderInput};
use status::StatusClient;
use std::sync::Arc;

// Domain
pub use nudge_api_structs::dtos::ReminderDTO as Reminder;

/// Nudge Server SDK
///
/// The SDK contains methods for interacting with the Nudge server
/// API.
#[derive(Clone)]
pub struct NudgeSDK {
    pub reminder: ReminderClient,
    pub status: StatusClient,
}

impl NudgeSDK {
    /// Client without credentials, only for public endpoints
    pub fn new(address: String) -> Self {
        Self::build(BaseClient::new(address))
    }

    /// Client acting on behalf of the `User` the token was issued to
    pub fn with_token<T: Into<String>>(address: String, token: T) -> Self {
        let mut base = BaseClient::new(address);
        base.set_token(token.into());
        Self::build(base)
    }

    /// Client for the admin endpoints
    pub fn with_admin_key<T: Into<String>>(address: String, admin_key: T) -> Self {
        let mut base = BaseClient::new(address);
        base.set_admin_key(admin_key.into());
        Self::build(base)
    }

    fn build(base: BaseClient) -> Self {
        let base = Arc::new(base);
        let reminder = ReminderClient::new(base.clone());
        let status = StatusClient::new(base);

        Self { reminder, status }
    }
}
