use crate::shared::entity::{Entity, ID};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use thiserror::Error;

/// The lifecycle state of a `Reminder`.
///
/// Allowed transitions:
/// - `Pending` -> `Sent` | `Failed` | `Cancelled` | `Snoozed`
/// - `Snoozed` -> `Pending` | `Sent` | `Failed` | `Cancelled`
/// - `Sent` -> `Acknowledged`
///
/// `Failed`, `Cancelled` and `Acknowledged` have no outgoing edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    Pending,
    Snoozed,
    Sent,
    Failed,
    Cancelled,
    Acknowledged,
}

impl ReminderStatus {
    pub const ALL: [ReminderStatus; 6] = [
        Self::Pending,
        Self::Snoozed,
        Self::Sent,
        Self::Failed,
        Self::Cancelled,
        Self::Acknowledged,
    ];

    /// States in which a `Reminder` is still waiting to be delivered
    pub const ACTIVE: [ReminderStatus; 2] = [Self::Pending, Self::Snoozed];

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Snoozed)
    }

    pub fn can_transition_to(&self, next: ReminderStatus) -> bool {
        use ReminderStatus::*;

        matches!(
            (self, next),
            (Pending, Sent)
                | (Pending, Failed)
                | (Pending, Cancelled)
                | (Pending, Snoozed)
                | (Snoozed, Pending)
                | (Snoozed, Sent)
                | (Snoozed, Failed)
                | (Snoozed, Cancelled)
                | (Sent, Acknowledged)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Snoozed => "snoozed",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Acknowledged => "acknowledged",
        }
    }
}

impl Display for ReminderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Unknown value: {0}")]
pub struct UnknownVariantError(pub String);

impl FromStr for ReminderStatus {
    type Err = UnknownVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|status| status.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownVariantError(s.to_string()))
    }
}

/// A channel a notification can be delivered through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    Email,
    Push,
}

/// Which `NotificationChannel`s a `Reminder` should be delivered through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderType {
    Email,
    Push,
    Both,
}

impl Default for ReminderType {
    fn default() -> Self {
        Self::Email
    }
}

impl ReminderType {
    pub fn channels(&self) -> Vec<NotificationChannel> {
        match self {
            Self::Email => vec![NotificationChannel::Email],
            Self::Push => vec![NotificationChannel::Push],
            Self::Both => vec![NotificationChannel::Email, NotificationChannel::Push],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Push => "push",
            Self::Both => "both",
        }
    }
}

impl FromStr for ReminderType {
    type Err = UnknownVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(Self::Email),
            "push" => Ok(Self::Push),
            "both" => Ok(Self::Both),
            _ => Err(UnknownVariantError(s.to_string())),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Reminder cannot transition from {from} to {to}")]
pub struct TransitionError {
    pub from: ReminderStatus,
    pub to: ReminderStatus,
}

/// A `Reminder` is the intent of a `User` to be notified about an `Event`
/// at a specific time.
#[derive(Debug, Clone, PartialEq)]
pub struct Reminder {
    pub id: ID,
    /// The `User` who should be notified
    pub user_id: ID,
    /// The `Event` this `Reminder` is about
    pub event_id: ID,
    /// Timestamp in millis at which the `User` wants to be notified
    pub reminder_date: i64,
    pub reminder_type: ReminderType,
    pub status: ReminderStatus,
    /// Set when the `Reminder` was delivered
    pub notified_at: Option<i64>,
    /// The new fire time while the `Reminder` is `Snoozed`
    pub snoozed_until: Option<i64>,
    /// User supplied text that is injected into the notification
    pub custom_message: Option<String>,
    pub failure_reason: Option<String>,
    pub retry_count: i64,
    pub last_retry_at: Option<i64>,
    pub acknowledged_at: Option<i64>,
    pub created: i64,
    pub updated: i64,
}

impl Reminder {
    pub fn new(
        user_id: ID,
        event_id: ID,
        reminder_date: i64,
        reminder_type: ReminderType,
        custom_message: Option<String>,
        now: i64,
    ) -> Self {
        Self {
            id: Default::default(),
            user_id,
            event_id,
            reminder_date,
            reminder_type,
            status: ReminderStatus::Pending,
            notified_at: None,
            snoozed_until: None,
            custom_message,
            failure_reason: None,
            retry_count: 0,
            last_retry_at: None,
            acknowledged_at: None,
            created: now,
            updated: now,
        }
    }

    /// The time at which this `Reminder` should fire, taking snoozing into account
    pub fn effective_fire_time(&self) -> i64 {
        match (self.status, self.snoozed_until) {
            (ReminderStatus::Snoozed, Some(snoozed_until)) => snoozed_until,
            _ => self.reminder_date,
        }
    }

    /// Derived from `status`, there is no separately stored flag
    pub fn is_notified(&self) -> bool {
        matches!(
            self.status,
            ReminderStatus::Sent | ReminderStatus::Acknowledged
        )
    }

    pub fn is_due(&self, now: i64) -> bool {
        self.status.is_active() && self.effective_fire_time() <= now
    }

    fn transition(&mut self, next: ReminderStatus, now: i64) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated = now;
        Ok(())
    }

    pub fn mark_sent(&mut self, now: i64) -> Result<(), TransitionError> {
        self.transition(ReminderStatus::Sent, now)?;
        self.notified_at = Some(now);
        Ok(())
    }

    pub fn mark_failed(&mut self, reason: String, now: i64) -> Result<(), TransitionError> {
        self.transition(ReminderStatus::Failed, now)?;
        self.failure_reason = Some(reason);
        self.retry_count += 1;
        self.last_retry_at = Some(now);
        Ok(())
    }

    pub fn cancel(&mut self, now: i64) -> Result<(), TransitionError> {
        self.transition(ReminderStatus::Cancelled, now)
    }

    /// Only a `Pending` reminder can be snoozed
    pub fn snooze(&mut self, snoozed_until: i64, now: i64) -> Result<(), TransitionError> {
        self.transition(ReminderStatus::Snoozed, now)?;
        self.snoozed_until = Some(snoozed_until);
        Ok(())
    }

    /// Moves the fire time of an active `Reminder`. A snoozed reminder
    /// returns to `Pending`.
    pub fn reschedule(
        &mut self,
        reminder_date: i64,
        reminder_type: Option<ReminderType>,
        custom_message: Option<String>,
        now: i64,
    ) -> Result<(), TransitionError> {
        match self.status {
            ReminderStatus::Pending => self.updated = now,
            ReminderStatus::Snoozed => self.transition(ReminderStatus::Pending, now)?,
            from => {
                return Err(TransitionError {
                    from,
                    to: ReminderStatus::Pending,
                })
            }
        }
        self.reminder_date = reminder_date;
        self.snoozed_until = None;
        if let Some(reminder_type) = reminder_type {
            self.reminder_type = reminder_type;
        }
        if custom_message.is_some() {
            self.custom_message = custom_message;
        }
        Ok(())
    }

    pub fn acknowledge(&mut self, now: i64) -> Result<(), TransitionError> {
        self.transition(ReminderStatus::Acknowledged, now)?;
        self.acknowledged_at = Some(now);
        Ok(())
    }
}

impl Entity for Reminder {
    fn id(&self) -> &ID {
        &self.id
    }
}
