use super::subscribers::RescheduleOnReminderSnoozed;
use crate::error::NudgeError;
use crate::shared::{
    auth::protect_route,
    usecase::{execute, Subscriber, UseCase},
};
use actix_web::{web, HttpRequest, HttpResponse};
use nudge_api_structs::snooze_reminder::*;
use nudge_domain::{Reminder, ReminderStatus, ID};
use nudge_infra::NudgeContext;

pub async fn snooze_reminder_controller(
    http_req: HttpRequest,
    path_params: web::Path<PathParams>,
    body: web::Json<RequestBody>,
    ctx: web::Data<NudgeContext>,
) -> Result<HttpResponse, NudgeError> {
    let user = protect_route(&http_req, &ctx).await?;

    let usecase = SnoozeReminderUseCase {
        user_id: user.id,
        event_id: path_params.event_id.clone(),
        snoozed_until: body.snoozed_until,
    };

    execute(usecase, &ctx)
        .await
        .map(|reminder| HttpResponse::Ok().json(APIResponse::new(reminder)))
        .map_err(NudgeError::from)
}

#[derive(Debug)]
pub struct SnoozeReminderUseCase {
    pub user_id: ID,
    pub event_id: ID,
    pub snoozed_until: i64,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    SnoozedUntilNotInFuture,
    NotFound(ID),
    NotPending(ReminderStatus),
    StorageError,
}

impl From<UseCaseError> for NudgeError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::SnoozedUntilNotInFuture => {
                Self::BadClientData("A reminder can only be snoozed until a future time".into())
            }
            UseCaseError::NotFound(event_id) => Self::NotFound(format!(
                "There is no active reminder for the event with id: {}.",
                event_id
            )),
            UseCaseError::NotPending(status) => Self::BadClientData(format!(
                "Only pending reminders can be snoozed, this reminder is {}",
                status
            )),
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for SnoozeReminderUseCase {
    type Response = Reminder;

    type Errors = UseCaseError;

    async fn execute(&mut self, ctx: &NudgeContext) -> Result<Self::Response, Self::Errors> {
        let now = ctx.sys.get_timestamp_millis();
        if self.snoozed_until <= now {
            return Err(UseCaseError::SnoozedUntilNotInFuture);
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
        let status = reminder.status;
        reminder
            .snooze(self.snoozed_until, now)
            .map_err(|_| UseCaseError::NotPending(status))?;

        match ctx
            .repos
            .reminders
            .save_if_status(&reminder, &[ReminderStatus::Pending])
            .await
        {
            Ok(true) => Ok(reminder),
            Ok(false) => {
                let status = ctx
                    .repos
                    .reminders
                    .find(&reminder.id)
                    .await
                    .map(|r| r.status)
                    .unwrap_or(status);
                Err(UseCaseError::NotPending(status))
            }
            Err(_) => Err(UseCaseError::StorageError),
        }
    }

    fn subscribers() -> Vec<Box<dyn Subscriber<Self>>> {
        vec![Box::new(RescheduleOnReminderSnoozed)]
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reminder::CreateReminderUseCase;
    use crate::shared::test_helpers::*;
    use nudge_domain::{ReminderType, User};

    async fn create(ctx: &NudgeContext, user: &User, event_id: &ID, at: i64) -> Reminder {
        execute(
            CreateReminderUseCase {
                user: user.clone(),
                event_id: event_id.clone(),
                reminder_date: at,
                reminder_type: ReminderType::Push,
                custom_message: None,
            },
            ctx,
        )
        .await
        .unwrap()
    }

    #[actix_web::main]
    #[test]
    async fn snoozes_pending_reminder() {
        let TestContext {
            ctx, user, events, ..
        } = setup();
        let reminder = create(&ctx, &user, &events[0].id, START + HOUR).await;

        let snoozed = execute(
            SnoozeReminderUseCase {
                user_id: user.id.clone(),
                event_id: events[0].id.clone(),
                snoozed_until: START + DAY,
            },
            &ctx,
        )
        .await
        .unwrap();
        assert_eq!(snoozed.id, reminder.id);
        assert_eq!(snoozed.status, ReminderStatus::Snoozed);
        assert_eq!(snoozed.effective_fire_time(), START + DAY);
        assert!(ctx.scheduler.is_scheduled(&reminder.id));

        // A snoozed reminder cannot be snoozed again
        let res = execute(
            SnoozeReminderUseCase {
                user_id: user.id.clone(),
                event_id: events[0].id.clone(),
                snoozed_until: START + 2 * DAY,
            },
            &ctx,
        )
        .await;
        assert_eq!(
            res.unwrap_err(),
            UseCaseError::NotPending(ReminderStatus::Snoozed)
        );
    }

    #[actix_web::main]
    #[test]
    async fn rejects_snoozing_into_the_past() {
        let TestContext {
            ctx, user, events, ..
        } = setup();
        create(&ctx, &user, &events[0].id, START + HOUR).await;

        let res = execute(
            SnoozeReminderUseCase {
                user_id: user.id.clone(),
                event_id: events[0].id.clone(),
                snoozed_until: START - MINUTE,
            },
            &ctx,
        )
        .await;
        assert_eq!(res.unwrap_err(), UseCaseError::SnoozedUntilNotInFuture);

        let res = execute(
            SnoozeReminderUseCase {
                user_id: user.id.clone(),
                event_id: events[1].id.clone(),
                snoozed_until: START + DAY,
            },
            &ctx,
        )
        .await;
        assert_eq!(res.unwrap_err(), UseCaseError::NotFound(events[1].id.clone()));
    }
}
