mod inmemory;
mod postgres;

pub use inmemory::InMemoryReminderRepo;
use nudge_domain::{Reminder, ReminderStatus, ID};
pub use postgres::PostgresReminderRepo;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InsertReminderError {
    #[error("An active reminder already exists for this user and event")]
    ActiveReminderExists,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[async_trait::async_trait]
pub trait IReminderRepo: Send + Sync {
    /// Stores a new `Reminder`. Fails if the `Reminder` is active and there
    /// already is an active `Reminder` for the same user and event.
    async fn insert(&self, reminder: &Reminder) -> Result<(), InsertReminderError>;
    /// Persists `reminder` only if the stored status is one of `expected`.
    /// Returns `false` when the stored record was in another state or is missing.
    async fn save_if_status(
        &self,
        reminder: &Reminder,
        expected: &[ReminderStatus],
    ) -> anyhow::Result<bool>;
    async fn find(&self, reminder_id: &ID) -> Option<Reminder>;
    async fn find_active_by_user_and_event(&self, user_id: &ID, event_id: &ID)
        -> Option<Reminder>;
    /// Newest first
    async fn find_by_user_and_event(&self, user_id: &ID, event_id: &ID) -> Vec<Reminder>;
    /// Ordered by effective fire time
    async fn find_by_user(&self, user_id: &ID) -> Vec<Reminder>;
    /// Active reminders with an effective fire time at or before `now`
    async fn find_overdue(&self, now: i64) -> Vec<Reminder>;
    /// Active reminders with an effective fire time after `now`
    async fn find_pending_future(&self, now: i64) -> Vec<Reminder>;
    /// Active reminders with an effective fire time in `[start, end)`
    async fn find_in_window(&self, start: i64, end: i64) -> Vec<Reminder>;
    async fn find_by_status(&self, status: ReminderStatus) -> Vec<Reminder>;
}
