use crate::{
    reminder::{NotificationChannel, ReminderType},
    shared::entity::{Entity, ID},
};
use serde::{Deserialize, Serialize};

/// How a `User` wants to be contacted about their `Reminder`s
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderPreferences {
    pub email: bool,
    pub push: bool,
    /// Receive one digest instead of several reminders on busy days
    pub daily_digest: bool,
}

impl Default for ReminderPreferences {
    fn default() -> Self {
        Self {
            email: true,
            push: false,
            daily_digest: true,
        }
    }
}

impl ReminderPreferences {
    pub fn allows(&self, channel: NotificationChannel) -> bool {
        match channel {
            NotificationChannel::Email => self.email,
            NotificationChannel::Push => self.push,
        }
    }

    /// Channels of the `ReminderType` the `User` has not opted out of.
    /// An explicit `ReminderType` wins if every channel was opted out of.
    pub fn channels_for(&self, reminder_type: ReminderType) -> Vec<NotificationChannel> {
        let requested = reminder_type.channels();
        let allowed = requested
            .iter()
            .copied()
            .filter(|channel| self.allows(*channel))
            .collect::<Vec<_>>();
        if allowed.is_empty() {
            requested
        } else {
            allowed
        }
    }
}

/// A `User` of the directory. This service only reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: ID,
    pub name: String,
    pub email: String,
    pub reminder_preferences: ReminderPreferences,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: Default::default(),
            name: name.into(),
            email: email.into(),
            reminder_preferences: Default::default(),
        }
    }
}

impl Entity for User {
    fn id(&self) -> &ID {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_respect_preferences() {
        let prefs = ReminderPreferences::default();
        assert_eq!(
            prefs.channels_for(ReminderType::Both),
            vec![NotificationChannel::Email]
        );
        assert_eq!(
            prefs.channels_for(ReminderType::Push),
            vec![NotificationChannel::Push]
        );

        let prefs = ReminderPreferences {
            email: true,
            push: true,
            daily_digest: false,
        };
        assert_eq!(prefs.channels_for(ReminderType::Both).len(), 2);
    }
}
