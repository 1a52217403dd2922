use crate::shared::usecase::UseCase;
use nudge_domain::{group_for_digest, next_day_window, DeliveryJob, EnqueueOptions};
use nudge_infra::NudgeContext;
use tracing::{error, info};

/// Submits one digest job for every `User` with more than one `Reminder`
/// firing on the next calendar day. Responds with the number of digests
/// submitted.
#[derive(Debug)]
pub struct SendDigestsUseCase {}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    InvalidWindow,
}

#[async_trait::async_trait(?Send)]
impl UseCase for SendDigestsUseCase {
    type Response = usize;

    type Errors = UseCaseError;

    async fn execute(&mut self, ctx: &NudgeContext) -> Result<Self::Response, Self::Errors> {
        let now = ctx.sys.get_timestamp_millis();
        let (start, end) = next_day_window(now, &ctx.config.digest_timezone)
            .ok_or(UseCaseError::InvalidWindow)?;

        let reminders = ctx.repos.reminders.find_in_window(start, end).await;
        let mut submitted = 0;
        for batch in group_for_digest(&reminders) {
            match ctx.repos.users.find(&batch.user_id).await {
                Some(user) if user.reminder_preferences.daily_digest => (),
                _ => continue,
            }
            let user_id = batch.user_id.clone();
            let job = DeliveryJob::SendDigest {
                user_id: batch.user_id,
                reminder_ids: batch.reminder_ids,
            };
            match ctx
                .repos
                .delivery_jobs
                .enqueue(job, EnqueueOptions::default())
                .await
            {
                Ok(_) => submitted += 1,
                Err(e) => error!("Unable to enqueue digest for user {}. Err: {:?}", user_id, e),
            }
        }

        info!("Submitted {} digests for [{}, {})", submitted, start, end);
        Ok(submitted)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reminder::CreateReminderUseCase;
    use crate::shared::{test_helpers::*, usecase::execute};
    use nudge_domain::{
        JobPriority, JobState, Reminder, ReminderPreferences, ReminderType, User, ID,
    };

    async fn create(ctx: &NudgeContext, user: &User, event_id: &ID, at: i64) -> Reminder {
        execute(
            CreateReminderUseCase {
                user: user.clone(),
                event_id: event_id.clone(),
                reminder_date: at,
                reminder_type: ReminderType::Email,
                custom_message: None,
            },
            ctx,
        )
        .await
        .unwrap()
    }

    fn digest_jobs(jobs: Vec<nudge_domain::QueuedJob>) -> Vec<nudge_domain::QueuedJob> {
        jobs.into_iter()
            .filter(|job| matches!(job.job, DeliveryJob::SendDigest { .. }))
            .collect()
    }

    #[actix_web::main]
    #[test]
    async fn submits_digests_for_busy_days() {
        let busy = User::new("Busy", "busy@example.com");
        let mut opted_out = User::new("Opted out", "out@example.com");
        opted_out.reminder_preferences = ReminderPreferences {
            email: true,
            push: false,
            daily_digest: false,
        };
        let calm = User::new("Calm", "calm@example.com");
        let TestContext { ctx, events, .. } =
            setup_with_users(vec![busy.clone(), opted_out.clone(), calm.clone()]);

        // START is noon, so tomorrow is [START + 12h, START + 36h)
        let late = create(&ctx, &busy, &events[0].id, START + DAY).await;
        let early = create(&ctx, &busy, &events[1].id, START + DAY - 2 * HOUR).await;
        create(&ctx, &busy, &events[2].id, START + 3 * DAY).await;
        create(&ctx, &opted_out, &events[0].id, START + DAY).await;
        create(&ctx, &opted_out, &events[1].id, START + DAY).await;
        create(&ctx, &calm, &events[0].id, START + DAY).await;

        assert_eq!(execute(SendDigestsUseCase {}, &ctx).await, Ok(1));

        let digests = digest_jobs(ctx.repos.delivery_jobs.find_by_state(JobState::Queued).await);
        assert_eq!(digests.len(), 1);
        assert_eq!(digests[0].priority, JobPriority::Low);
        assert_eq!(
            digests[0].job,
            DeliveryJob::SendDigest {
                user_id: busy.id.clone(),
                reminder_ids: vec![early.id, late.id],
            }
        );
    }

    #[actix_web::main]
    #[test]
    async fn quiet_days_submit_nothing() {
        let TestContext {
            ctx, user, events, ..
        } = setup();
        create(&ctx, &user, &events[0].id, START + HOUR).await;
        create(&ctx, &user, &events[1].id, START + 2 * HOUR).await;

        assert_eq!(execute(SendDigestsUseCase {}, &ctx).await, Ok(0));
        assert!(digest_jobs(ctx.repos.delivery_jobs.find_by_state(JobState::Queued).await).is_empty());
    }
}
