use super::{
    cancel_reminder::{CancelReminderUseCase, CancelledReminder},
    create_reminder::CreateReminderUseCase,
    snooze_reminder::SnoozeReminderUseCase,
    update_reminder::UpdateReminderUseCase,
};
use crate::shared::usecase::Subscriber;
use nudge_domain::{DeliveryJob, EnqueueOptions, Reminder};
use nudge_infra::NudgeContext;
use tracing::{error, info};

async fn schedule(reminder: &Reminder, ctx: &NudgeContext) {
    ctx.scheduler.schedule(&reminder.id).await;
}

pub struct ScheduleOnReminderCreated;

#[async_trait::async_trait(?Send)]
impl Subscriber<CreateReminderUseCase> for ScheduleOnReminderCreated {
    async fn notify(&self, reminder: &Reminder, ctx: &NudgeContext) {
        schedule(reminder, ctx).await;
    }
}

pub struct SendConfirmationOnReminderCreated;

#[async_trait::async_trait(?Send)]
impl Subscriber<CreateReminderUseCase> for SendConfirmationOnReminderCreated {
    async fn notify(&self, reminder: &Reminder, ctx: &NudgeContext) {
        let user = match ctx.repos.users.find(&reminder.user_id).await {
            Some(user) => user,
            None => return,
        };
        if !user.reminder_preferences.email {
            info!(
                "User {} has opted out of emails, not confirming reminder {}",
                user.id, reminder.id
            );
            return;
        }
        let job = DeliveryJob::SendConfirmation {
            user_id: reminder.user_id.clone(),
            event_id: reminder.event_id.clone(),
        };
        if let Err(e) = ctx
            .repos
            .delivery_jobs
            .enqueue(job, EnqueueOptions::default())
            .await
        {
            error!(
                "Unable to enqueue confirmation of reminder {}. Err: {:?}",
                reminder.id, e
            );
        }
    }
}

pub struct RescheduleOnReminderUpdated;

#[async_trait::async_trait(?Send)]
impl Subscriber<UpdateReminderUseCase> for RescheduleOnReminderUpdated {
    async fn notify(&self, reminder: &Reminder, ctx: &NudgeContext) {
        schedule(reminder, ctx).await;
    }
}

pub struct RescheduleOnReminderSnoozed;

#[async_trait::async_trait(?Send)]
impl Subscriber<SnoozeReminderUseCase> for RescheduleOnReminderSnoozed {
    async fn notify(&self, reminder: &Reminder, ctx: &NudgeContext) {
        schedule(reminder, ctx).await;
    }
}

pub struct UnscheduleOnReminderCancelled;

#[async_trait::async_trait(?Send)]
impl Subscriber<CancelReminderUseCase> for UnscheduleOnReminderCancelled {
    async fn notify(&self, res: &CancelledReminder, ctx: &NudgeContext) {
        ctx.scheduler.unschedule(&res.reminder.id);
    }
}

pub struct SendCancellationOnReminderCancelled;

#[async_trait::async_trait(?Send)]
impl Subscriber<CancelReminderUseCase> for SendCancellationOnReminderCancelled {
    async fn notify(&self, res: &CancelledReminder, ctx: &NudgeContext) {
        // Cancelling an already terminal reminder is a no-op
        if !res.cancelled_now {
            return;
        }
        let job = DeliveryJob::SendCancellation {
            user_id: res.reminder.user_id.clone(),
            event_id: res.reminder.event_id.clone(),
        };
        if let Err(e) = ctx
            .repos
            .delivery_jobs
            .enqueue(job, EnqueueOptions::default())
            .await
        {
            error!(
                "Unable to enqueue cancellation of reminder {}. Err: {:?}",
                res.reminder.id, e
            );
        }
    }
}
