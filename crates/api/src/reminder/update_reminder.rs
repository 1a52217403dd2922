use super::{
    is_valid_custom_message, subscribers::RescheduleOnReminderUpdated, MAX_CUSTOM_MESSAGE_LENGTH,
};
use crate::error::NudgeError;
use crate::shared::{
    auth::protect_route,
    usecase::{execute, Subscriber, UseCase},
};
use actix_web::{web, HttpRequest, HttpResponse};
use nudge_api_structs::update_reminder::*;
use nudge_domain::{Reminder, ReminderStatus, ReminderType, ID};
use nudge_infra::NudgeContext;

pub async fn update_reminder_controller(
    http_req: HttpRequest,
    path_params: web::Path<PathParams>,
    body: web::Json<RequestBody>,
    ctx: web::Data<NudgeContext>,
) -> Result<HttpResponse, NudgeError> {
    let user = protect_route(&http_req, &ctx).await?;

    let body = body.0;
    let usecase = UpdateReminderUseCase {
        user_id: user.id,
        event_id: path_params.event_id.clone(),
        reminder_date: body.reminder_date,
        reminder_type: body.reminder_type,
        custom_message: body.custom_message,
    };

    execute(usecase, &ctx)
        .await
        .map(|reminder| HttpResponse::Ok().json(APIResponse::new(reminder)))
        .map_err(NudgeError::from)
}

/// Moves the fire time of the active `Reminder` of an `Event`.
/// A snoozed `Reminder` becomes pending again.
#[derive(Debug)]
pub struct UpdateReminderUseCase {
    pub user_id: ID,
    pub event_id: ID,
    pub reminder_date: i64,
    pub reminder_type: Option<ReminderType>,
    pub custom_message: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    ReminderDateNotInFuture,
    CustomMessageTooLong,
    NotFound(ID),
    /// The `Reminder` was delivered or cancelled while being updated
    Conflict,
    StorageError,
}

impl From<UseCaseError> for NudgeError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::ReminderDateNotInFuture => {
                Self::BadClientData("The reminder date must be in the future".into())
            }
            UseCaseError::CustomMessageTooLong => Self::BadClientData(format!(
                "The custom message cannot be longer than {} characters",
                MAX_CUSTOM_MESSAGE_LENGTH
            )),
            UseCaseError::NotFound(event_id) => Self::NotFound(format!(
                "There is no active reminder for the event with id: {}.",
                event_id
            )),
            UseCaseError::Conflict => {
                Self::Conflict("The reminder changed while it was being updated".into())
            }
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for UpdateReminderUseCase {
    type Response = Reminder;

    type Errors = UseCaseError;

    async fn execute(&mut self, ctx: &NudgeContext) -> Result<Self::Response, Self::Errors> {
        let now = ctx.sys.get_timestamp_millis();
        if self.reminder_date <= now {
            return Err(UseCaseError::ReminderDateNotInFuture);
        }
        if !is_valid_custom_message(&self.custom_message) {
            return Err(UseCaseError::CustomMessageTooLong);
        }

        let mut reminder = match ctx
            .repos
            .reminders
            .find_active_by_user_and_event(&self.user_id, &self.event_id)
            .await
        {
            Some(reminder) => reminder,
            None => return Err(UseCaseError::NotFound(self.event_id.clone())),
        };
        let expected = reminder.status;
        reminder
            .reschedule(
                self.reminder_date,
                self.reminder_type,
                self.custom_message.take(),
                now,
            )
            .map_err(|_| UseCaseError::Conflict)?;

        match ctx.repos.reminders.save_if_status(&reminder, &[expected]).await {
            Ok(true) => Ok(reminder),
            Ok(false) => Err(UseCaseError::Conflict),
            Err(_) => Err(UseCaseError::StorageError),
        }
    }

    fn subscribers() -> Vec<Box<dyn Subscriber<Self>>> {
        vec![Box::new(RescheduleOnReminderUpdated)]
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reminder::CreateReminderUseCase;
    use crate::shared::test_helpers::*;

    #[actix_web::main]
    #[test]
    async fn reschedules_snoozed_reminder_to_pending() {
        let TestContext {
            ctx, user, events, ..
        } = setup();
        let mut reminder = execute(
            CreateReminderUseCase {
                user: user.clone(),
                event_id: events[0].id.clone(),
                reminder_date: START + DAY,
                reminder_type: ReminderType::Email,
                custom_message: None,
            },
            &ctx,
        )
        .await
        .unwrap();
        reminder.snooze(START + 2 * DAY, START).unwrap();
        ctx.repos
            .reminders
            .save_if_status(&reminder, &[ReminderStatus::Pending])
            .await
            .unwrap();

        let updated = execute(
            UpdateReminderUseCase {
                user_id: user.id.clone(),
                event_id: events[0].id.clone(),
                reminder_date: START + 3 * DAY,
                reminder_type: Some(ReminderType::Both),
                custom_message: Some("Bring earplugs".into()),
            },
            &ctx,
        )
        .await
        .unwrap();
        assert_eq!(updated.status, ReminderStatus::Pending);
        assert_eq!(updated.snoozed_until, None);
        assert_eq!(updated.effective_fire_time(), START + 3 * DAY);
        assert_eq!(updated.reminder_type, ReminderType::Both);
        assert!(ctx.scheduler.is_scheduled(&updated.id));
    }

    #[actix_web::main]
    #[test]
    async fn update_without_active_reminder() {
        let TestContext {
            ctx, user, events, ..
        } = setup();

        let res = execute(
            UpdateReminderUseCase {
                user_id: user.id.clone(),
                event_id: events[0].id.clone(),
                reminder_date: START + DAY,
                reminder_type: None,
                custom_message: None,
            },
            &ctx,
        )
        .await;
        assert_eq!(res.unwrap_err(), UseCaseError::NotFound(events[0].id.clone()));

        let res = execute(
            UpdateReminderUseCase {
                user_id: user.id.clone(),
                event_id: events[0].id.clone(),
                reminder_date: START - DAY,
                reminder_type: None,
                custom_message: None,
            },
            &ctx,
        )
        .await;
        assert_eq!(res.unwrap_err(), UseCaseError::ReminderDateNotInFuture);
    }
}
