use super::IDeliveryQueue;
use crate::{repos::shared::inmemory_repo::*, system::ISys};
use nudge_domain::{DeliveryJob, EnqueueOptions, JobState, QueuedJob, ID};
use std::sync::{Arc, Mutex};

pub struct InMemoryDeliveryQueue {
    jobs: Mutex<Vec<QueuedJob>>,
    sys: Arc<dyn ISys>,
    default_max_attempts: i32,
}

impl InMemoryDeliveryQueue {
    pub fn new(sys: Arc<dyn ISys>, default_max_attempts: i32) -> Self {
        Self {
            jobs: Mutex::new(vec![]),
            sys,
            default_max_attempts,
        }
    }

    fn update(&self, job_id: &ID, update: impl FnMut(&mut QueuedJob)) -> anyhow::Result<()> {
        match update_many(&self.jobs, |job| &job.id == job_id, update) {
            0 => Err(anyhow::anyhow!("Delivery job {} not found", job_id)),
            _ => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl IDeliveryQueue for InMemoryDeliveryQueue {
    async fn enqueue(&self, job: DeliveryJob, options: EnqueueOptions) -> anyhow::Result<ID> {
        let job = QueuedJob::new(
            job,
            options,
            self.default_max_attempts,
            self.sys.get_timestamp_millis(),
        );
        insert(&job, &self.jobs);
        Ok(job.id)
    }

    async fn dequeue(&self, now: i64) -> anyhow::Result<Option<QueuedJob>> {
        let mut jobs = lock(&self.jobs);
        let next = jobs
            .iter_mut()
            .filter(|job| job.state == JobState::Queued && job.run_at <= now)
            .min_by_key(|job| (std::cmp::Reverse(job.priority), job.run_at, job.created));

        Ok(next.map(|job| {
            job.state = JobState::Processing;
            job.attempts += 1;
            job.started_at = Some(now);
            job.clone()
        }))
    }

    async fn complete(&self, job_id: &ID) -> anyhow::Result<()> {
        self.update(job_id, |job| job.state = JobState::Completed)
    }

    async fn retry(&self, job_id: &ID, run_at: i64, error: &str) -> anyhow::Result<()> {
        self.update(job_id, |job| {
            job.state = JobState::Queued;
            job.run_at = run_at;
            job.started_at = None;
            job.last_error = Some(error.to_string());
        })
    }

    async fn bury(&self, job_id: &ID, error: &str) -> anyhow::Result<()> {
        self.update(job_id, |job| {
            job.state = JobState::Dead;
            job.last_error = Some(error.to_string());
        })
    }

    async fn requeue_stale(&self, started_before: i64) -> anyhow::Result<Vec<QueuedJob>> {
        let mut stale = vec![];
        update_many(
            &self.jobs,
            |job| {
                job.state == JobState::Processing
                    && job.started_at.map(|at| at < started_before).unwrap_or(true)
            },
            |job| {
                job.state = if job.can_retry() {
                    JobState::Queued
                } else {
                    JobState::Dead
                };
                job.started_at = None;
                job.last_error = Some("Abandoned by worker".into());
                stale.push(job.clone());
            },
        );
        Ok(stale)
    }

    async fn find(&self, job_id: &ID) -> Option<QueuedJob> {
        find(job_id, &self.jobs)
    }

    async fn find_by_reminder(&self, reminder_id: &ID) -> Vec<QueuedJob> {
        find_by(&self.jobs, |job| job.job.reminder_id() == Some(reminder_id))
    }

    async fn find_by_state(&self, state: JobState) -> Vec<QueuedJob> {
        find_by(&self.jobs, |job| job.state == state)
    }

    async fn has_outstanding_reminder_job(&self, reminder_id: &ID) -> anyhow::Result<bool> {
        Ok(lock(&self.jobs)
            .iter()
            .any(|job| job.state.is_outstanding() && job.job.reminder_id() == Some(reminder_id)))
    }
}
