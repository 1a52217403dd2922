use super::handlers::{handle_job, JobOutcome};
use crate::reminder::mark_reminder::MarkReminderFailedUseCase;
use crate::shared::usecase::execute;
use nudge_domain::{QueuedJob, ID};
use nudge_infra::{DeliveryError, NudgeContext};
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum ProcessResult {
    Completed(JobOutcome),
    /// Failed with a transient error and goes back to the queue
    Retrying { run_at: i64 },
    /// Gave up on the job
    Buried { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedJob {
    pub job_id: ID,
    pub result: ProcessResult,
}

/// Takes the next due job off the delivery queue and runs it.
///
/// Returns `None` when there was no job ready to run.
pub async fn process_next_job(ctx: &NudgeContext) -> Option<ProcessedJob> {
    let now = ctx.sys.get_timestamp_millis();
    let job = match ctx.repos.delivery_jobs.dequeue(now).await {
        Ok(Some(job)) => job,
        Ok(None) => return None,
        Err(e) => {
            error!("Unable to dequeue delivery job. Err: {:?}", e);
            return None;
        }
    };

    let timeout = Duration::from_secs(ctx.config.job_timeout_secs);
    let res = match tokio::time::timeout(timeout, handle_job(&job.job, ctx)).await {
        Ok(res) => res,
        Err(_) => Err(DeliveryError::Transient(format!(
            "Did not finish within {} seconds",
            ctx.config.job_timeout_secs
        ))),
    };

    let result = match res {
        Ok(outcome) => {
            if let Err(e) = ctx.repos.delivery_jobs.complete(&job.id).await {
                error!("Unable to complete delivery job {}. Err: {:?}", job.id, e);
            }
            ProcessResult::Completed(outcome)
        }
        Err(e) if e.is_transient() && job.can_retry() => retry(&job, e, ctx).await,
        Err(e) => bury(&job, e, ctx).await,
    };

    Some(ProcessedJob {
        job_id: job.id,
        result,
    })
}

async fn retry(job: &QueuedJob, e: DeliveryError, ctx: &NudgeContext) -> ProcessResult {
    let run_at = ctx.sys.get_timestamp_millis()
        + job.backoff_delay_millis(ctx.config.delivery_backoff_base_millis);
    warn!(
        "Delivery job {} ({}) failed on attempt {} of {}, retrying at {}. Err: {}",
        job.id,
        job.job.kind(),
        job.attempts,
        job.max_attempts,
        run_at,
        e
    );
    if let Err(e) = ctx
        .repos
        .delivery_jobs
        .retry(&job.id, run_at, &e.to_string())
        .await
    {
        error!("Unable to retry delivery job {}. Err: {:?}", job.id, e);
    }
    ProcessResult::Retrying { run_at }
}

async fn bury(job: &QueuedJob, e: DeliveryError, ctx: &NudgeContext) -> ProcessResult {
    let reason = match &e {
        DeliveryError::Transient(reason) | DeliveryError::Permanent(reason) => reason.clone(),
    };
    error!(
        "Giving up on delivery job {} ({}) after {} attempts. Err: {}",
        job.id,
        job.job.kind(),
        job.attempts,
        e
    );
    if let Err(e) = ctx.repos.delivery_jobs.bury(&job.id, &e.to_string()).await {
        error!("Unable to bury delivery job {}. Err: {:?}", job.id, e);
    }

    if let Some(reminder_id) = job.job.reminder_id() {
        let usecase = MarkReminderFailedUseCase {
            reminder_id: reminder_id.clone(),
            reason: reason.clone(),
        };
        if let Ok(true) = execute(usecase, ctx).await {
            info!("Reminder {} was marked as failed", reminder_id);
        }
    }

    ProcessResult::Buried { reason }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reminder::CreateReminderUseCase;
    use crate::shared::test_helpers::*;
    use nudge_domain::{
        DeliveryJob, EnqueueOptions, JobState, ReminderStatus, ReminderType,
    };
    use nudge_infra::NotificationKind;

    #[actix_web::main]
    #[test]
    async fn transient_failures_are_retried_with_backoff() {
        let TestContext {
            ctx,
            sys,
            composer,
            user,
            ..
        } = setup();
        let job_id = ctx
            .repos
            .delivery_jobs
            .enqueue(
                DeliveryJob::SendWelcome {
                    user_id: user.id.clone(),
                },
                EnqueueOptions::default(),
            )
            .await
            .unwrap();
        composer.fail_with(Some(DeliveryError::Transient("Service unavailable".into())));

        let processed = process_next_job(&ctx).await.unwrap();
        assert_eq!(processed.job_id, job_id);
        assert_eq!(
            processed.result,
            ProcessResult::Retrying {
                run_at: START + SECOND
            }
        );
        let job = ctx.repos.delivery_jobs.find(&job_id).await.unwrap();
        assert_eq!(job.state, JobState::Queued);
        assert_eq!(job.attempts, 1);
        assert!(job.last_error.is_some());

        // Not before the backoff has passed
        assert!(process_next_job(&ctx).await.is_none());

        sys.advance(SECOND);
        assert_eq!(
            process_next_job(&ctx).await.unwrap().result,
            ProcessResult::Retrying {
                run_at: START + SECOND + 2 * SECOND
            }
        );

        sys.advance(2 * SECOND);
        assert_eq!(
            process_next_job(&ctx).await.unwrap().result,
            ProcessResult::Buried {
                reason: "Service unavailable".into()
            }
        );
        let job = ctx.repos.delivery_jobs.find(&job_id).await.unwrap();
        assert_eq!(job.state, JobState::Dead);
        assert_eq!(job.attempts, 3);
        assert!(composer.sent().is_empty());
    }

    #[actix_web::main]
    #[test]
    async fn recovers_after_a_transient_failure() {
        let TestContext {
            ctx,
            sys,
            composer,
            user,
            events,
        } = setup();
        let reminder = execute(
            CreateReminderUseCase {
                user: user.clone(),
                event_id: events[0].id.clone(),
                reminder_date: START + MINUTE,
                reminder_type: ReminderType::Email,
                custom_message: None,
            },
            &ctx,
        )
        .await
        .unwrap();
        // Confirmation first
        assert!(process_next_job(&ctx).await.is_some());

        sys.set(START + MINUTE);
        composer.fail_with(Some(DeliveryError::Transient("Timeout".into())));
        assert!(matches!(
            process_next_job(&ctx).await.unwrap().result,
            ProcessResult::Retrying { .. }
        ));
        assert_eq!(
            ctx.repos.reminders.find(&reminder.id).await.unwrap().status,
            ReminderStatus::Pending
        );

        composer.fail_with(None);
        sys.advance(SECOND);
        assert_eq!(
            process_next_job(&ctx).await.unwrap().result,
            ProcessResult::Completed(JobOutcome::Delivered)
        );
        assert_eq!(composer.sent_of_kind(NotificationKind::Reminder).len(), 1);
        assert_eq!(
            ctx.repos.reminders.find(&reminder.id).await.unwrap().status,
            ReminderStatus::Sent
        );
        assert!(ctx
            .repos
            .delivery_jobs
            .find_by_reminder(&reminder.id)
            .await
            .iter()
            .all(|job| job.state == JobState::Completed));
    }

    #[actix_web::main]
    #[test]
    async fn permanent_failure_marks_the_reminder_failed() {
        let TestContext {
            ctx,
            sys,
            composer,
            user,
            events,
        } = setup();
        let reminder = execute(
            CreateReminderUseCase {
                user: user.clone(),
                event_id: events[0].id.clone(),
                reminder_date: START + MINUTE,
                reminder_type: ReminderType::Email,
                custom_message: None,
            },
            &ctx,
        )
        .await
        .unwrap();
        composer.fail_with(Some(DeliveryError::Permanent("Mailbox does not exist".into())));

        sys.set(START + 2 * MINUTE);
        while process_next_job(&ctx).await.is_some() {}

        let stored = ctx.repos.reminders.find(&reminder.id).await.unwrap();
        assert_eq!(stored.status, ReminderStatus::Failed);
        assert_eq!(stored.failure_reason.as_deref(), Some("Mailbox does not exist"));
        let jobs = ctx.repos.delivery_jobs.find_by_reminder(&reminder.id).await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].state, JobState::Dead);
        assert_eq!(jobs[0].attempts, 1);
    }

    #[actix_web::main]
    #[test]
    async fn empty_queue_processes_nothing() {
        let TestContext { ctx, .. } = setup();
        assert!(process_next_job(&ctx).await.is_none());
    }
}
