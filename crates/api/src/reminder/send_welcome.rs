use crate::error::NudgeError;
use crate::shared::{
    auth::protect_admin_route,
    usecase::{execute, UseCase},
};
use actix_web::{web, HttpRequest, HttpResponse};
use nudge_api_structs::send_welcome::*;
use nudge_domain::{DeliveryJob, EnqueueOptions, ID};
use nudge_infra::NudgeContext;

pub async fn send_welcome_controller(
    http_req: HttpRequest,
    path_params: web::Path<PathParams>,
    ctx: web::Data<NudgeContext>,
) -> Result<HttpResponse, NudgeError> {
    protect_admin_route(&http_req, &ctx)?;

    let usecase = SendWelcomeUseCase {
        user_id: path_params.user_id.clone(),
    };

    execute(usecase, &ctx)
        .await
        .map(|job_id| HttpResponse::Accepted().json(APIResponse { job_id }))
        .map_err(NudgeError::from)
}

#[derive(Debug)]
pub struct SendWelcomeUseCase {
    pub user_id: ID,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    UserNotFound(ID),
    StorageError,
}

impl From<UseCaseError> for NudgeError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::UserNotFound(user_id) => Self::NotFound(format!(
                "The user with id: {}, was not found.",
                user_id
            )),
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for SendWelcomeUseCase {
    type Response = ID;

    type Errors = UseCaseError;

    async fn execute(&mut self, ctx: &NudgeContext) -> Result<Self::Response, Self::Errors> {
        if ctx.repos.users.find(&self.user_id).await.is_none() {
            return Err(UseCaseError::UserNotFound(self.user_id.clone()));
        }

        ctx.repos
            .delivery_jobs
            .enqueue(
                DeliveryJob::SendWelcome {
                    user_id: self.user_id.clone(),
                },
                EnqueueOptions::default(),
            )
            .await
            .map_err(|_| UseCaseError::StorageError)
    }
}
