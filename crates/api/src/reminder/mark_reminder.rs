//! Delivery outcomes of a `Reminder`.
//!
//! Both use cases are compare and set updates from an active status.
//! A `Reminder` that already is terminal is left alone and `Ok(false)` is
//! returned, so a late or duplicate delivery can never overwrite the
//! outcome of another one.

use crate::shared::usecase::UseCase;
use nudge_domain::{Reminder, ReminderStatus, ID};
use nudge_infra::NudgeContext;
use tracing::warn;

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    NotFound(ID),
    StorageError,
}

async fn mark<F>(reminder_id: &ID, ctx: &NudgeContext, transition: F) -> Result<bool, UseCaseError>
where
    F: Fn(&mut Reminder) -> bool,
{
    let mut reminder = ctx
        .repos
        .reminders
        .find(reminder_id)
        .await
        .ok_or_else(|| UseCaseError::NotFound(reminder_id.clone()))?;
    let expected = reminder.status;
    if !expected.is_active() || !transition(&mut reminder) {
        warn!(
            "Reminder {} already is {}, leaving it as it is",
            reminder_id, expected
        );
        return Ok(false);
    }

    ctx.repos
        .reminders
        .save_if_status(&reminder, &ReminderStatus::ACTIVE)
        .await
        .map_err(|_| UseCaseError::StorageError)
}

#[derive(Debug)]
pub struct MarkReminderSentUseCase {
    pub reminder_id: ID,
}

#[async_trait::async_trait(?Send)]
impl UseCase for MarkReminderSentUseCase {
    type Response = bool;

    type Errors = UseCaseError;

    async fn execute(&mut self, ctx: &NudgeContext) -> Result<Self::Response, Self::Errors> {
        let now = ctx.sys.get_timestamp_millis();
        mark(&self.reminder_id, ctx, |reminder| {
            reminder.mark_sent(now).is_ok()
        })
        .await
    }
}

#[derive(Debug)]
pub struct MarkReminderFailedUseCase {
    pub reminder_id: ID,
    pub reason: String,
}

#[async_trait::async_trait(?Send)]
impl UseCase for MarkReminderFailedUseCase {
    type Response = bool;

    type Errors = UseCaseError;

    async fn execute(&mut self, ctx: &NudgeContext) -> Result<Self::Response, Self::Errors> {
        let now = ctx.sys.get_timestamp_millis();
        let reason = self.reason.clone();
        mark(&self.reminder_id, ctx, |reminder| {
            reminder.mark_failed(reason.clone(), now).is_ok()
        })
        .await
    }
}
