use super::{IReminderRepo, InsertReminderError};
use crate::repos::shared::inmemory_repo::*;
use nudge_domain::{Reminder, ReminderStatus, ID};

pub struct InMemoryReminderRepo {
    reminders: std::sync::Mutex<Vec<Reminder>>,
}

impl InMemoryReminderRepo {
    pub fn new() -> Self {
        Self {
            reminders: std::sync::Mutex::new(vec![]),
        }
    }

    fn find_active_by(&self, compare: impl Fn(&Reminder) -> bool) -> Vec<Reminder> {
        let mut reminders = find_by(&self.reminders, |r| r.status.is_active() && compare(r));
        reminders.sort_by_key(|r| r.effective_fire_time());
        reminders
    }
}

impl Default for InMemoryReminderRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl IReminderRepo for InMemoryReminderRepo {
    async fn insert(&self, reminder: &Reminder) -> Result<(), InsertReminderError> {
        // Check and push under the same lock
        let mut reminders = lock(&self.reminders);
        let conflict = reminder.status.is_active()
            && reminders.iter().any(|r| {
                r.status.is_active()
                    && r.user_id == reminder.user_id
                    && r.event_id == reminder.event_id
            });
        if conflict {
            return Err(InsertReminderError::ActiveReminderExists);
        }
        reminders.push(reminder.clone());
        Ok(())
    }

    async fn save_if_status(
        &self,
        reminder: &Reminder,
        expected: &[ReminderStatus],
    ) -> anyhow::Result<bool> {
        Ok(save_if(reminder, &self.reminders, |stored| {
            expected.contains(&stored.status)
        }))
    }

    async fn find(&self, reminder_id: &ID) -> Option<Reminder> {
        find(reminder_id, &self.reminders)
    }

    async fn find_active_by_user_and_event(
        &self,
        user_id: &ID,
        event_id: &ID,
    ) -> Option<Reminder> {
        self.find_active_by(|r| &r.user_id == user_id && &r.event_id == event_id)
            .into_iter()
            .next()
    }

    async fn find_by_user_and_event(&self, user_id: &ID, event_id: &ID) -> Vec<Reminder> {
        let mut reminders = find_by(&self.reminders, |r| {
            &r.user_id == user_id && &r.event_id == event_id
        });
        reminders.sort_by_key(|r| std::cmp::Reverse(r.created));
        reminders
    }

    async fn find_by_user(&self, user_id: &ID) -> Vec<Reminder> {
        let mut reminders = find_by(&self.reminders, |r| &r.user_id == user_id);
        reminders.sort_by_key(|r| r.effective_fire_time());
        reminders
    }

    async fn find_overdue(&self, now: i64) -> Vec<Reminder> {
        self.find_active_by(|r| r.effective_fire_time() <= now)
    }

    async fn find_pending_future(&self, now: i64) -> Vec<Reminder> {
        self.find_active_by(|r| r.effective_fire_time() > now)
    }

    async fn find_in_window(&self, start: i64, end: i64) -> Vec<Reminder> {
        self.find_active_by(|r| {
            let fire_time = r.effective_fire_time();
            start <= fire_time && fire_time < end
        })
    }

    async fn find_by_status(&self, status: ReminderStatus) -> Vec<Reminder> {
        let mut reminders = find_by(&self.reminders, |r| r.status == status);
        reminders.sort_by_key(|r| r.updated);
        reminders
    }
}
