use super::subscribers::{SendCancellationOnReminderCancelled, UnscheduleOnReminderCancelled};
use crate::error::NudgeError;
use crate::shared::{
    auth::protect_route,
    usecase::{execute, Subscriber, UseCase},
};
use actix_web::{web, HttpRequest, HttpResponse};
use nudge_api_structs::cancel_reminder::*;
use nudge_domain::{Reminder, ReminderStatus, ID};
use nudge_infra::NudgeContext;

/// A concurrent writer can only make the `Reminder` terminal, so the
/// compare and set loop settles after one lost round
const MAX_CAS_ATTEMPTS: usize = 3;

pub async fn cancel_reminder_controller(
    http_req: HttpRequest,
    path_params: web::Path<PathParams>,
    ctx: web::Data<NudgeContext>,
) -> Result<HttpResponse, NudgeError> {
    let user = protect_route(&http_req, &ctx).await?;

    let usecase = CancelReminderUseCase {
        target: CancelTarget::ActiveForEvent {
            user_id: user.id,
            event_id: path_params.event_id.clone(),
        },
    };

    execute(usecase, &ctx)
        .await
        .map(|res| HttpResponse::Ok().json(APIResponse::new(res.reminder)))
        .map_err(NudgeError::from)
}

#[derive(Debug, Clone)]
pub enum CancelTarget {
    Reminder(ID),
    /// The active `Reminder` of the `User` for the `Event`
    ActiveForEvent { user_id: ID, event_id: ID },
}

/// Cancelling is idempotent: a `Reminder` that already is terminal is
/// returned unchanged
#[derive(Debug)]
pub struct CancelReminderUseCase {
    pub target: CancelTarget,
}

#[derive(Debug)]
pub struct CancelledReminder {
    pub reminder: Reminder,
    /// Whether this execution did the transition to `Cancelled`
    pub cancelled_now: bool,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    NotFound(String),
    StorageError,
}

impl From<UseCaseError> for NudgeError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::NotFound(msg) => Self::NotFound(msg),
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

impl CancelReminderUseCase {
    async fn find_target(&self, ctx: &NudgeContext) -> Result<Reminder, UseCaseError> {
        let reminder = match &self.target {
            CancelTarget::Reminder(reminder_id) => ctx.repos.reminders.find(reminder_id).await,
            CancelTarget::ActiveForEvent { user_id, event_id } => {
                ctx.repos
                    .reminders
                    .find_active_by_user_and_event(user_id, event_id)
                    .await
            }
        };
        reminder.ok_or_else(|| {
            UseCaseError::NotFound(match &self.target {
                CancelTarget::Reminder(reminder_id) => {
                    format!("The reminder with id: {}, was not found.", reminder_id)
                }
                CancelTarget::ActiveForEvent { event_id, .. } => format!(
                    "There is no active reminder for the event with id: {}.",
                    event_id
                ),
            })
        })
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for CancelReminderUseCase {
    type Response = CancelledReminder;

    type Errors = UseCaseError;

    async fn execute(&mut self, ctx: &NudgeContext) -> Result<Self::Response, Self::Errors> {
        let mut reminder = self.find_target(ctx).await?;

        for _ in 0..MAX_CAS_ATTEMPTS {
            if !reminder.status.is_active() {
                return Ok(CancelledReminder {
                    reminder,
                    cancelled_now: false,
                });
            }
            let expected = reminder.status;
            let mut cancelled = reminder.clone();
            cancelled
                .cancel(ctx.sys.get_timestamp_millis())
                .map_err(|_| UseCaseError::StorageError)?;

            match ctx.repos.reminders.save_if_status(&cancelled, &[expected]).await {
                Ok(true) => {
                    return Ok(CancelledReminder {
                        reminder: cancelled,
                        cancelled_now: true,
                    })
                }
                Ok(false) => {
                    reminder = match ctx.repos.reminders.find(&reminder.id).await {
                        Some(reminder) => reminder,
                        None => return Err(UseCaseError::StorageError),
                    };
                }
                Err(_) => return Err(UseCaseError::StorageError),
            }
        }

        Err(UseCaseError::StorageError)
    }

    fn subscribers() -> Vec<Box<dyn Subscriber<Self>>> {
        vec![
            Box::new(UnscheduleOnReminderCancelled),
            Box::new(SendCancellationOnReminderCancelled),
        ]
    }
}

impl CancelledReminder {
    pub fn status(&self) -> ReminderStatus {
        self.reminder.status
    }
}
