mod delivery;
mod digest;
mod event;
mod reminder;
mod shared;
mod user;

pub use delivery::{DeliveryJob, EnqueueOptions, JobPriority, JobState, QueuedJob};
pub use digest::{group_for_digest, millis_until_next_run, next_day_window, DigestBatch};
pub use event::Event;
pub use reminder::{
    NotificationChannel, Reminder, ReminderStatus, ReminderType, TransitionError,
    UnknownVariantError,
};
pub use shared::entity::{Entity, InvalidIDError, ID};
pub use user::{ReminderPreferences, User};

pub use chrono_tz::Tz;
