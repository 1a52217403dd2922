use crate::error::NudgeError;
use crate::shared::{
    auth::protect_route,
    usecase::{execute, UseCase},
};
use actix_web::{web, HttpRequest, HttpResponse};
use nudge_api_structs::acknowledge_reminder::*;
use nudge_domain::{Reminder, ReminderStatus, ID};
use nudge_infra::NudgeContext;

pub async fn acknowledge_reminder_controller(
    http_req: HttpRequest,
    path_params: web::Path<PathParams>,
    ctx: web::Data<NudgeContext>,
) -> Result<HttpResponse, NudgeError> {
    let user = protect_route(&http_req, &ctx).await?;

    let usecase = AcknowledgeReminderUseCase {
        user_id: user.id,
        event_id: path_params.event_id.clone(),
    };

    execute(usecase, &ctx)
        .await
        .map(|reminder| HttpResponse::Ok().json(APIResponse::new(reminder)))
        .map_err(NudgeError::from)
}

/// Acknowledges the latest sent `Reminder` of the `User` for the `Event`
#[derive(Debug)]
pub struct AcknowledgeReminderUseCase {
    pub user_id: ID,
    pub event_id: ID,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    NotFound(ID),
    StorageError,
}

impl From<UseCaseError> for NudgeError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::NotFound(event_id) => Self::NotFound(format!(
                "There is no sent reminder for the event with id: {}.",
                event_id
            )),
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for AcknowledgeReminderUseCase {
    type Response = Reminder;

    type Errors = UseCaseError;

    async fn execute(&mut self, ctx: &NudgeContext) -> Result<Self::Response, Self::Errors> {
        let mut reminder = ctx
            .repos
            .reminders
            .find_by_user_and_event(&self.user_id, &self.event_id)
            .await
            .into_iter()
            .find(|r| r.status == ReminderStatus::Sent)
            .ok_or_else(|| UseCaseError::NotFound(self.event_id.clone()))?;

        reminder
            .acknowledge(ctx.sys.get_timestamp_millis())
            .map_err(|_| UseCaseError::NotFound(self.event_id.clone()))?;

        match ctx
            .repos
            .reminders
            .save_if_status(&reminder, &[ReminderStatus::Sent])
            .await
        {
            Ok(true) => Ok(reminder),
            // Someone else acknowledged it in the meantime
            Ok(false) => Err(UseCaseError::NotFound(self.event_id.clone())),
            Err(_) => Err(UseCaseError::StorageError),
        }
    }
}
