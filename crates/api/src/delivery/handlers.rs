use crate::reminder::mark_reminder::{MarkReminderSentUseCase, UseCaseError};
use crate::shared::usecase::execute;
use nudge_domain::{DeliveryJob, Event, ReminderType, User, ID};
use nudge_infra::{
    DeliveryError, Notification, NotificationItem, NotificationKind, NudgeContext,
};
use tracing::{info, warn};

/// A job that arrives this much before its `Reminder` is due still counts as due
const DUE_TOLERANCE_MILLIS: i64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Delivered,
    /// There was nothing (left) to deliver
    Skipped,
}

pub async fn handle_job(job: &DeliveryJob, ctx: &NudgeContext) -> Result<JobOutcome, DeliveryError> {
    match job {
        DeliveryJob::SendReminder { reminder_id } => send_reminder(reminder_id, ctx).await,
        DeliveryJob::SendDigest {
            user_id,
            reminder_ids,
        } => send_digest(user_id, reminder_ids, ctx).await,
        DeliveryJob::SendConfirmation { user_id, event_id } => {
            send_event_notice(NotificationKind::Confirmation, user_id, event_id, ctx).await
        }
        DeliveryJob::SendCancellation { user_id, event_id } => {
            send_event_notice(NotificationKind::Cancellation, user_id, event_id, ctx).await
        }
        DeliveryJob::SendWelcome { user_id } => send_welcome(user_id, ctx).await,
    }
}

async fn find_user(user_id: &ID, ctx: &NudgeContext) -> Result<User, DeliveryError> {
    ctx.repos
        .users
        .find(user_id)
        .await
        .ok_or_else(|| DeliveryError::Permanent(format!("User {} was not found", user_id)))
}

async fn find_event(event_id: &ID, ctx: &NudgeContext) -> Result<Event, DeliveryError> {
    ctx.repos
        .events
        .find(event_id)
        .await
        .ok_or_else(|| DeliveryError::Permanent(format!("Event {} was not found", event_id)))
}

async fn send_reminder(reminder_id: &ID, ctx: &NudgeContext) -> Result<JobOutcome, DeliveryError> {
    // Held until the delivery is recorded
    let _claim = match ctx.claims.claim(reminder_id) {
        Some(claim) => claim,
        None => {
            info!("Reminder {} is already being delivered", reminder_id);
            return Ok(JobOutcome::Skipped);
        }
    };

    let reminder = match ctx.repos.reminders.find(reminder_id).await {
        Some(reminder) => reminder,
        None => {
            warn!("Reminder {} no longer exists", reminder_id);
            return Ok(JobOutcome::Skipped);
        }
    };
    if !reminder.status.is_active() {
        info!(
            "Reminder {} is {}, nothing to deliver",
            reminder_id, reminder.status
        );
        return Ok(JobOutcome::Skipped);
    }
    let now = ctx.sys.get_timestamp_millis();
    if reminder.effective_fire_time() > now + DUE_TOLERANCE_MILLIS {
        // Left behind by a reschedule or snooze, the newer schedule delivers it
        info!("Reminder {} is not due yet", reminder_id);
        return Ok(JobOutcome::Skipped);
    }

    let user = find_user(&reminder.user_id, ctx).await?;
    let event = find_event(&reminder.event_id, ctx).await?;
    let channels = user
        .reminder_preferences
        .channels_for(reminder.reminder_type);
    let notification = Notification {
        user,
        channels,
        items: vec![NotificationItem {
            event,
            reminder: Some(reminder),
        }],
    };
    ctx.composer
        .send(NotificationKind::Reminder, notification)
        .await?;

    let usecase = MarkReminderSentUseCase {
        reminder_id: reminder_id.clone(),
    };
    match execute(usecase, ctx).await {
        Ok(true) => Ok(JobOutcome::Delivered),
        Ok(false) | Err(UseCaseError::NotFound(_)) => Ok(JobOutcome::Skipped),
        Err(UseCaseError::StorageError) => Err(DeliveryError::Transient(format!(
            "Unable to record the delivery of reminder {}",
            reminder_id
        ))),
    }
}

async fn send_digest(
    user_id: &ID,
    reminder_ids: &[ID],
    ctx: &NudgeContext,
) -> Result<JobOutcome, DeliveryError> {
    let user = find_user(user_id, ctx).await?;
    if !user.reminder_preferences.daily_digest {
        return Ok(JobOutcome::Skipped);
    }

    let mut reminders = Vec::with_capacity(reminder_ids.len());
    for reminder_id in reminder_ids {
        if let Some(reminder) = ctx.repos.reminders.find(reminder_id).await {
            if reminder.status.is_active() {
                reminders.push(reminder);
            }
        }
    }
    if reminders.is_empty() {
        return Ok(JobOutcome::Skipped);
    }

    let event_ids = reminders
        .iter()
        .map(|r| r.event_id.clone())
        .collect::<Vec<_>>();
    let events = ctx
        .repos
        .events
        .find_many(&event_ids)
        .await
        .map_err(|e| DeliveryError::Transient(format!("Unable to load events: {}", e)))?;
    let items = reminders
        .into_iter()
        .filter_map(|reminder| {
            events
                .iter()
                .find(|event| event.id == reminder.event_id)
                .map(|event| NotificationItem {
                    event: event.clone(),
                    reminder: Some(reminder),
                })
        })
        .collect::<Vec<_>>();
    if items.is_empty() {
        return Ok(JobOutcome::Skipped);
    }

    let channels = user.reminder_preferences.channels_for(ReminderType::Email);
    ctx.composer
        .send(
            NotificationKind::Digest,
            Notification {
                user,
                channels,
                items,
            },
        )
        .await?;
    Ok(JobOutcome::Delivered)
}

async fn send_event_notice(
    kind: NotificationKind,
    user_id: &ID,
    event_id: &ID,
    ctx: &NudgeContext,
) -> Result<JobOutcome, DeliveryError> {
    let user = find_user(user_id, ctx).await?;
    let event = find_event(event_id, ctx).await?;
    let reminder = match kind {
        NotificationKind::Confirmation => {
            ctx.repos
                .reminders
                .find_active_by_user_and_event(user_id, event_id)
                .await
        }
        _ => None,
    };
    let channels = user.reminder_preferences.channels_for(ReminderType::Email);
    ctx.composer
        .send(
            kind,
            Notification {
                user,
                channels,
                items: vec![NotificationItem { event, reminder }],
            },
        )
        .await?;
    Ok(JobOutcome::Delivered)
}

async fn send_welcome(user_id: &ID, ctx: &NudgeContext) -> Result<JobOutcome, DeliveryError> {
    let user = find_user(user_id, ctx).await?;
    let channels = user.reminder_preferences.channels_for(ReminderType::Email);
    ctx.composer
        .send(
            NotificationKind::Welcome,
            Notification {
                user,
                channels,
                items: vec![],
            },
        )
        .await?;
    Ok(JobOutcome::Delivered)
}
