use super::IDeliveryQueue;
use crate::system::ISys;
use nudge_domain::{DeliveryJob, EnqueueOptions, JobPriority, JobState, QueuedJob, ID};
use sqlx::{
    types::{Json, Uuid},
    FromRow, PgPool,
};
use std::sync::Arc;
use tracing::error;

pub struct PostgresDeliveryQueue {
    pool: PgPool,
    sys: Arc<dyn ISys>,
    default_max_attempts: i32,
}

impl PostgresDeliveryQueue {
    pub fn new(pool: PgPool, sys: Arc<dyn ISys>, default_max_attempts: i32) -> Self {
        Self {
            pool,
            sys,
            default_max_attempts,
        }
    }
}

#[derive(Debug, FromRow)]
struct QueuedJobRaw {
    job_uid: Uuid,
    payload: Json<DeliveryJob>,
    priority: i16,
    state: String,
    attempts: i32,
    max_attempts: i32,
    run_at: i64,
    started_at: Option<i64>,
    last_error: Option<String>,
    created: i64,
}

impl TryFrom<QueuedJobRaw> for QueuedJob {
    type Error = anyhow::Error;

    fn try_from(j: QueuedJobRaw) -> Result<Self, Self::Error> {
        Ok(QueuedJob {
            id: j.job_uid.into(),
            job: j.payload.0,
            priority: JobPriority::from_i16(j.priority),
            state: j.state.parse()?,
            attempts: j.attempts,
            max_attempts: j.max_attempts,
            run_at: j.run_at,
            started_at: j.started_at,
            last_error: j.last_error,
            created: j.created,
        })
    }
}

fn into_jobs(jobs: Result<Vec<QueuedJobRaw>, sqlx::Error>) -> Vec<QueuedJob> {
    match jobs {
        Ok(jobs) => jobs
            .into_iter()
            .filter_map(|j| j.try_into().ok())
            .collect(),
        Err(e) => {
            error!("Unable to query delivery jobs. Err: {:?}", e);
            vec![]
        }
    }
}

#[async_trait::async_trait]
impl IDeliveryQueue for PostgresDeliveryQueue {
    async fn enqueue(&self, job: DeliveryJob, options: EnqueueOptions) -> anyhow::Result<ID> {
        let job = QueuedJob::new(
            job,
            options,
            self.default_max_attempts,
            self.sys.get_timestamp_millis(),
        );
        sqlx::query(
            r#"
            INSERT INTO delivery_jobs
            (job_uid, kind, reminder_uid, payload, priority, state, attempts,
             max_attempts, run_at, started_at, last_error, created)
            VALUES($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(job.id.inner_ref())
        .bind(job.job.kind())
        .bind(job.job.reminder_id().map(|id| *id.inner_ref()))
        .bind(Json(&job.job))
        .bind(job.priority.as_i16())
        .bind(job.state.as_str())
        .bind(job.attempts)
        .bind(job.max_attempts)
        .bind(job.run_at)
        .bind(job.started_at)
        .bind(&job.last_error)
        .bind(job.created)
        .execute(&self.pool)
        .await?;

        Ok(job.id)
    }

    async fn dequeue(&self, now: i64) -> anyhow::Result<Option<QueuedJob>> {
        let job = sqlx::query_as::<_, QueuedJobRaw>(
            r#"
            UPDATE delivery_jobs SET
                state = 'processing',
                attempts = attempts + 1,
                started_at = $1
            WHERE job_uid = (
                SELECT j.job_uid FROM delivery_jobs AS j
                WHERE j.state = 'queued' AND j.run_at <= $1
                ORDER BY j.priority DESC, j.run_at, j.created
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING *
            "#,
        )
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        job.map(|j| j.try_into()).transpose()
    }

    async fn complete(&self, job_id: &ID) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE delivery_jobs SET state = 'completed'
            WHERE job_uid = $1
            "#,
        )
        .bind(job_id.inner_ref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn retry(&self, job_id: &ID, run_at: i64, error: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE delivery_jobs SET
                state = 'queued',
                run_at = $2,
                started_at = NULL,
                last_error = $3
            WHERE job_uid = $1
            "#,
        )
        .bind(job_id.inner_ref())
        .bind(run_at)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn bury(&self, job_id: &ID, error: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE delivery_jobs SET state = 'dead', last_error = $2
            WHERE job_uid = $1
            "#,
        )
        .bind(job_id.inner_ref())
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn requeue_stale(&self, started_before: i64) -> anyhow::Result<Vec<QueuedJob>> {
        let jobs = sqlx::query_as::<_, QueuedJobRaw>(
            r#"
            UPDATE delivery_jobs SET
                state = CASE WHEN attempts < max_attempts THEN 'queued' ELSE 'dead' END,
                started_at = NULL,
                last_error = 'Abandoned by worker'
            WHERE state = 'processing' AND started_at < $1
            RETURNING *
            "#,
        )
        .bind(started_before)
        .fetch_all(&self.pool)
        .await?;
        Ok(jobs.into_iter().filter_map(|j| j.try_into().ok()).collect())
    }

    async fn find(&self, job_id: &ID) -> Option<QueuedJob> {
        let res = sqlx::query_as::<_, QueuedJobRaw>(
            r#"
            SELECT * FROM delivery_jobs AS j
            WHERE j.job_uid = $1
            "#,
        )
        .bind(job_id.inner_ref())
        .fetch_optional(&self.pool)
        .await;

        match res {
            Ok(job) => job.and_then(|j| j.try_into().ok()),
            Err(e) => {
                error!("Unable to find delivery job {}. Err: {:?}", job_id, e);
                None
            }
        }
    }

    async fn find_by_reminder(&self, reminder_id: &ID) -> Vec<QueuedJob> {
        into_jobs(
            sqlx::query_as::<_, QueuedJobRaw>(
                r#"
                SELECT * FROM delivery_jobs AS j
                WHERE j.reminder_uid = $1
                ORDER BY j.created
                "#,
            )
            .bind(reminder_id.inner_ref())
            .fetch_all(&self.pool)
            .await,
        )
    }

    async fn find_by_state(&self, state: JobState) -> Vec<QueuedJob> {
        into_jobs(
            sqlx::query_as::<_, QueuedJobRaw>(
                r#"
                SELECT * FROM delivery_jobs AS j
                WHERE j.state = $1
                ORDER BY j.created
                "#,
            )
            .bind(state.as_str())
            .fetch_all(&self.pool)
            .await,
        )
    }

    async fn has_outstanding_reminder_job(&self, reminder_id: &ID) -> anyhow::Result<bool> {
        let outstanding: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM delivery_jobs AS j
                WHERE j.reminder_uid = $1
                AND j.kind = 'send-reminder'
                AND j.state IN ('queued', 'processing')
            )
            "#,
        )
        .bind(reminder_id.inner_ref())
        .fetch_one(&self.pool)
        .await?;
        Ok(outstanding)
    }
}
