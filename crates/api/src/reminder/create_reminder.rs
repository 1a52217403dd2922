use super::{
    is_valid_custom_message,
    subscribers::{ScheduleOnReminderCreated, SendConfirmationOnReminderCreated},
    MAX_CUSTOM_MESSAGE_LENGTH,
};
use crate::error::NudgeError;
use crate::shared::{
    auth::protect_route,
    usecase::{execute, Subscriber, UseCase},
};
use actix_web::{web, HttpRequest, HttpResponse};
use nudge_api_structs::create_reminder::*;
use nudge_domain::{Reminder, ReminderType, User, ID};
use nudge_infra::{InsertReminderError, NudgeContext};

pub async fn create_reminder_controller(
    http_req: HttpRequest,
    body: web::Json<RequestBody>,
    ctx: web::Data<NudgeContext>,
) -> Result<HttpResponse, NudgeError> {
    let user = protect_route(&http_req, &ctx).await?;

    let body = body.0;
    let usecase = CreateReminderUseCase {
        user,
        event_id: body.event_id,
        reminder_date: body.reminder_date,
        reminder_type: body.reminder_type.unwrap_or_default(),
        custom_message: body.custom_message,
    };

    execute(usecase, &ctx)
        .await
        .map(|reminder| HttpResponse::Created().json(APIResponse::new(reminder)))
        .map_err(NudgeError::from)
}

#[derive(Debug)]
pub struct CreateReminderUseCase {
    pub user: User,
    pub event_id: ID,
    pub reminder_date: i64,
    pub reminder_type: ReminderType,
    pub custom_message: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    ReminderDateNotInFuture,
    CustomMessageTooLong,
    EventNotFound(ID),
    ActiveReminderExists,
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
            UseCaseError::EventNotFound(event_id) => Self::NotFound(format!(
                "The event with id: {}, was not found.",
                event_id
            )),
            UseCaseError::ActiveReminderExists => Self::Conflict(
                "There already is an active reminder for this event. Update it instead.".into(),
            ),
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for CreateReminderUseCase {
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
        if ctx.repos.events.find(&self.event_id).await.is_none() {
            return Err(UseCaseError::EventNotFound(self.event_id.clone()));
        }

        let reminder = Reminder::new(
            self.user.id.clone(),
            self.event_id.clone(),
            self.reminder_date,
            self.reminder_type,
            self.custom_message.take(),
            now,
        );

        match ctx.repos.reminders.insert(&reminder).await {
            Ok(_) => Ok(reminder),
            Err(InsertReminderError::ActiveReminderExists) => {
                Err(UseCaseError::ActiveReminderExists)
            }
            Err(InsertReminderError::Storage(_)) => Err(UseCaseError::StorageError),
        }
    }

    fn subscribers() -> Vec<Box<dyn Subscriber<Self>>> {
        vec![
            Box::new(ScheduleOnReminderCreated),
            Box::new(SendConfirmationOnReminderCreated),
        ]
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::shared::test_helpers::*;
    use nudge_domain::{JobState, ReminderStatus, ReminderPreferences};

    fn usecase(user: &User, event_id: &ID, reminder_date: i64) -> CreateReminderUseCase {
        CreateReminderUseCase {
            user: user.clone(),
            event_id: event_id.clone(),
            reminder_date,
            reminder_type: ReminderType::Email,
            custom_message: None,
        }
    }

    #[actix_web::main]
    #[test]
    async fn creates_and_schedules_reminder() {
        let TestContext {
            ctx, user, events, ..
        } = setup();

        let reminder = execute(usecase(&user, &events[0].id, START + DAY), &ctx)
            .await
            .unwrap();
        assert_eq!(reminder.status, ReminderStatus::Pending);
        assert_eq!(reminder.user_id, user.id);
        assert!(ctx.scheduler.is_scheduled(&reminder.id));
        assert_eq!(
            ctx.repos.reminders.find(&reminder.id).await.unwrap(),
            reminder
        );

        let confirmations = ctx.repos.delivery_jobs.find_by_state(JobState::Queued).await;
        assert_eq!(confirmations.len(), 1);
        assert_eq!(
            confirmations[0].job,
            nudge_domain::DeliveryJob::SendConfirmation {
                user_id: user.id.clone(),
                event_id: events[0].id.clone(),
            }
        );
    }

    #[actix_web::main]
    #[test]
    async fn rejects_reminder_date_not_in_future() {
        let TestContext {
            ctx, user, events, ..
        } = setup();

        for reminder_date in [START - MINUTE, START] {
            let res = execute(usecase(&user, &events[0].id, reminder_date), &ctx).await;
            assert_eq!(res.unwrap_err(), UseCaseError::ReminderDateNotInFuture);
        }
        assert!(ctx.repos.reminders.find_by_user(&user.id).await.is_empty());
        assert!(ctx
            .repos
            .delivery_jobs
            .find_by_state(JobState::Queued)
            .await
            .is_empty());
        assert_eq!(ctx.scheduler.timer_count(), 0);
    }

    #[actix_web::main]
    #[test]
    async fn validates_custom_message_and_event() {
        let TestContext {
            ctx, user, events, ..
        } = setup();

        let mut too_long = usecase(&user, &events[0].id, START + DAY);
        too_long.custom_message = Some("x".repeat(MAX_CUSTOM_MESSAGE_LENGTH + 1));
        assert_eq!(
            execute(too_long, &ctx).await.unwrap_err(),
            UseCaseError::CustomMessageTooLong
        );

        let mut longest = usecase(&user, &events[0].id, START + DAY);
        longest.custom_message = Some("ø".repeat(MAX_CUSTOM_MESSAGE_LENGTH));
        assert!(execute(longest, &ctx).await.is_ok());

        let unknown_event = ID::default();
        assert_eq!(
            execute(usecase(&user, &unknown_event, START + DAY), &ctx)
                .await
                .unwrap_err(),
            UseCaseError::EventNotFound(unknown_event)
        );
    }

    #[actix_web::main]
    #[test]
    async fn only_one_active_reminder_per_event() {
        let TestContext {
            ctx, user, events, ..
        } = setup();

        execute(usecase(&user, &events[0].id, START + DAY), &ctx)
            .await
            .unwrap();
        assert_eq!(
            execute(usecase(&user, &events[0].id, START + 2 * DAY), &ctx)
                .await
                .unwrap_err(),
            UseCaseError::ActiveReminderExists
        );
        assert!(execute(usecase(&user, &events[1].id, START + DAY), &ctx)
            .await
            .is_ok());
    }

    #[actix_web::main]
    #[test]
    async fn no_confirmation_when_user_opted_out_of_email() {
        let mut user = User::new("Kari", "kari@example.com");
        user.reminder_preferences = ReminderPreferences {
            email: false,
            push: true,
            daily_digest: false,
        };
        let TestContext {
            ctx, user, events, ..
        } = setup_with_users(vec![user]);

        execute(usecase(&user, &events[0].id, START + DAY), &ctx)
            .await
            .unwrap();
        assert!(ctx
            .repos
            .delivery_jobs
            .find_by_state(JobState::Queued)
            .await
            .is_empty());
    }
}
