use crate::{
    delivery::process_next_job, digest::SendDigestsUseCase,
    reminder::mark_reminder::MarkReminderFailedUseCase, shared::usecase::execute,
};
use actix_web::rt::time::{interval, sleep};
use futures::future::join_all;
use nudge_domain::{millis_until_next_run, JobState, Tz};
use nudge_infra::NudgeContext;
use std::time::Duration;
use tracing::{error, info, info_span, warn};
use tracing_futures::Instrument;

const DAY_MILLIS: i64 = 1000 * 60 * 60 * 24;
const ABANDONED_REASON: &str = "Abandoned by worker";

/// Polls the delivery queue and drains it every `queue_poll_interval_millis`
pub fn start_delivery_job_scheduler(ctx: NudgeContext) {
    actix_web::rt::spawn(
        async move {
            let poll_interval = Duration::from_millis(ctx.config.queue_poll_interval_millis.max(1));
            let mut interval = interval(poll_interval);
            loop {
                interval.tick().await;
                drain_delivery_queue(&ctx).await;
            }
        }
        .instrument(info_span!("Delivery worker")),
    );
}

/// Runs due jobs, `delivery_concurrency` at a time, until none are left.
/// Returns the number of jobs that were run.
pub async fn drain_delivery_queue(ctx: &NudgeContext) -> usize {
    let concurrency = ctx.config.delivery_concurrency.max(1);
    let mut processed = 0;
    loop {
        let batch = join_all((0..concurrency).map(|_| process_next_job(ctx))).await;
        let ran = batch.iter().filter(|job| job.is_some()).count();
        processed += ran;
        if ran < concurrency {
            return processed;
        }
    }
}

/// Reconciles overdue reminders and abandoned jobs every `sweep_interval_secs`
pub fn start_sweep_job_scheduler(ctx: NudgeContext) {
    actix_web::rt::spawn(
        async move {
            let mut interval = interval(Duration::from_secs(ctx.config.sweep_interval_secs.max(1)));
            loop {
                interval.tick().await;
                sweep(&ctx).await;
            }
        }
        .instrument(info_span!("Sweep")),
    );
}

/// Returns the number of overdue reminders that were enqueued
pub async fn sweep(ctx: &NudgeContext) -> usize {
    let timeout_millis = (ctx.config.job_timeout_secs as i64).saturating_mul(1000);
    let started_before = ctx.sys.get_timestamp_millis() - 2 * timeout_millis;
    match ctx.repos.delivery_jobs.requeue_stale(started_before).await {
        Ok(stale) if stale.is_empty() => (),
        Ok(stale) => {
            info!("Requeued {} abandoned delivery jobs", stale.len());
            // Exhausted reminder jobs must not be picked up again as overdue
            for job in stale.iter().filter(|job| job.state == JobState::Dead) {
                warn!(
                    "Abandoned delivery job {} ({}) has no attempts left",
                    job.id,
                    job.job.kind()
                );
                if let Some(reminder_id) = job.job.reminder_id() {
                    let usecase = MarkReminderFailedUseCase {
                        reminder_id: reminder_id.clone(),
                        reason: ABANDONED_REASON.into(),
                    };
                    if let Ok(true) = execute(usecase, ctx).await {
                        info!("Reminder {} was marked as failed", reminder_id);
                    }
                }
            }
        }
        Err(e) => error!("Unable to requeue abandoned delivery jobs. Err: {:?}", e),
    }

    ctx.scheduler.sweep().await
}

/// Submits the daily digests at `digest_hour` in `digest_timezone`
pub fn start_digest_job_scheduler(ctx: NudgeContext) {
    actix_web::rt::spawn(
        async move {
            let mut last_run_at = None;
            loop {
                let now = ctx.sys.get_timestamp_millis();
                let run_at = next_digest_run(
                    now,
                    last_run_at,
                    ctx.config.digest_hour,
                    &ctx.config.digest_timezone,
                );
                sleep(Duration::from_millis((run_at - now).max(1) as u64)).await;

                let _ = execute(SendDigestsUseCase {}, &ctx).await;
                last_run_at = Some(run_at);
            }
        }
        .instrument(info_span!("Daily digest")),
    );
}

/// Timestamp of the next digest run. Counted from the previous scheduled
/// run so that waking up slightly early never runs the same day twice.
fn next_digest_run(now: i64, last_run_at: Option<i64>, hour: u32, tz: &Tz) -> i64 {
    let from = last_run_at.map_or(now, |last| last.max(now));
    from + millis_until_next_run(from, hour, tz).unwrap_or(DAY_MILLIS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::CreateReminderUseCase;
    use crate::shared::test_helpers::*;
    use nudge_domain::{
        DeliveryJob, EnqueueOptions, JobPriority, JobState, ReminderStatus, ReminderType, User,
    };

    #[actix_web::main]
    #[test]
    async fn drains_every_due_job() {
        let mut ctx = setup();
        ctx.ctx.config.delivery_concurrency = 2;
        let TestContext {
            ctx, composer, sys, ..
        } = ctx;
        let users = (0..5)
            .map(|i| User::new(format!("User {}", i), format!("user{}@example.com", i)))
            .collect::<Vec<_>>();
        // Unknown users are buried, they still count as run
        for user in &users {
            ctx.repos
                .delivery_jobs
                .enqueue(
                    DeliveryJob::SendWelcome {
                        user_id: user.id.clone(),
                    },
                    EnqueueOptions::default(),
                )
                .await
                .unwrap();
        }
        ctx.repos
            .delivery_jobs
            .enqueue(
                DeliveryJob::SendWelcome {
                    user_id: Default::default(),
                },
                EnqueueOptions::default().with_delay(MINUTE),
            )
            .await
            .unwrap();

        assert_eq!(drain_delivery_queue(&ctx).await, 5);
        assert_eq!(ctx.repos.delivery_jobs.find_by_state(JobState::Dead).await.len(), 5);
        assert_eq!(drain_delivery_queue(&ctx).await, 0);
        assert!(composer.sent().is_empty());

        sys.advance(MINUTE);
        assert_eq!(drain_delivery_queue(&ctx).await, 1);
    }

    #[actix_web::main]
    #[test]
    async fn sweep_enqueues_overdue_reminders_and_requeues_abandoned_jobs() {
        let TestContext {
            ctx,
            sys,
            user,
            events,
            ..
        } = setup();
        let reminder = crate::shared::usecase::execute(
            CreateReminderUseCase {
                user: user.clone(),
                event_id: events[0].id.clone(),
                reminder_date: START + HOUR,
                reminder_type: ReminderType::Email,
                custom_message: None,
            },
            &ctx,
        )
        .await
        .unwrap();
        // The confirmation is picked up by a worker that never reports back
        let abandoned = ctx.repos.delivery_jobs.dequeue(START).await.unwrap().unwrap();

        // The process was asleep while the timer should have fired
        ctx.scheduler.unschedule(&reminder.id);
        sys.set(START + 2 * HOUR);

        assert_eq!(sweep(&ctx).await, 1);
        let jobs = ctx.repos.delivery_jobs.find_by_reminder(&reminder.id).await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].priority, JobPriority::High);
        assert_eq!(
            ctx.repos.delivery_jobs.find(&abandoned.id).await.unwrap().state,
            JobState::Queued
        );

        assert_eq!(sweep(&ctx).await, 0);
        assert_eq!(ctx.repos.delivery_jobs.find_by_reminder(&reminder.id).await.len(), 1);
    }

    #[actix_web::main]
    #[test]
    async fn exhausted_abandoned_reminder_jobs_fail_the_reminder() {
        let TestContext {
            ctx,
            sys,
            user,
            events,
            ..
        } = setup();
        let reminder = crate::shared::usecase::execute(
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
        let mut now = START + MINUTE;
        sys.set(now);
        let reminder_job = |job: &nudge_domain::QueuedJob| job.job.reminder_id().is_some();

        // Every worker that picks up the reminder job dies before reporting back
        for _ in 0..ctx.config.delivery_max_attempts {
            loop {
                let job = ctx
                    .repos
                    .delivery_jobs
                    .dequeue(now)
                    .await
                    .unwrap()
                    .unwrap();
                if reminder_job(&job) {
                    break;
                }
                ctx.repos.delivery_jobs.complete(&job.id).await.unwrap();
            }
            now += 10 * MINUTE;
            sys.set(now);
            sweep(&ctx).await;
        }

        let jobs = ctx.repos.delivery_jobs.find_by_reminder(&reminder.id).await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].state, JobState::Dead);
        assert_eq!(jobs[0].attempts, ctx.config.delivery_max_attempts);
        let stored = ctx.repos.reminders.find(&reminder.id).await.unwrap();
        assert_eq!(stored.status, ReminderStatus::Failed);
        assert_eq!(stored.failure_reason.as_deref(), Some(ABANDONED_REASON));

        // A failed reminder is no longer overdue
        assert_eq!(sweep(&ctx).await, 0);
        assert!(ctx
            .repos
            .delivery_jobs
            .find_by_state(JobState::Queued)
            .await
            .is_empty());
    }

    #[test]
    fn digest_runs_once_a_day_even_when_waking_early() {
        let tz = nudge_domain::Tz::UTC;
        // START is 12:00 UTC
        let first = next_digest_run(START, None, 8, &tz);
        assert_eq!(first, START + 20 * HOUR);

        // The sleep ended a few millis before the scheduled instant
        assert_eq!(next_digest_run(first - 5, Some(first), 8, &tz), first + DAY);
        // The digest took a while to submit
        assert_eq!(next_digest_run(first + HOUR, Some(first), 8, &tz), first + DAY);
    }
}
