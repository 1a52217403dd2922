mod inmemory;
mod postgres;

pub use inmemory::InMemoryDeliveryQueue;
use nudge_domain::{DeliveryJob, EnqueueOptions, JobState, QueuedJob, ID};
pub use postgres::PostgresDeliveryQueue;

/// Durable queue of `DeliveryJob`s consumed by the delivery workers
#[async_trait::async_trait]
pub trait IDeliveryQueue: Send + Sync {
    async fn enqueue(&self, job: DeliveryJob, options: EnqueueOptions) -> anyhow::Result<ID>;
    /// Claims the next runnable job: highest priority first, then earliest
    /// `run_at`. The claimed job is `Processing` and its `attempts` is incremented.
    async fn dequeue(&self, now: i64) -> anyhow::Result<Option<QueuedJob>>;
    async fn complete(&self, job_id: &ID) -> anyhow::Result<()>;
    /// Puts the job back into the queue, not to be run before `run_at`
    async fn retry(&self, job_id: &ID, run_at: i64, error: &str) -> anyhow::Result<()>;
    /// Gives up on the job
    async fn bury(&self, job_id: &ID, error: &str) -> anyhow::Result<()>;
    /// Requeues jobs that have been `Processing` since before `started_before`.
    /// Jobs without attempts left are buried instead.
    /// Returns the affected jobs in their new state.
    async fn requeue_stale(&self, started_before: i64) -> anyhow::Result<Vec<QueuedJob>>;
    async fn find(&self, job_id: &ID) -> Option<QueuedJob>;
    async fn find_by_reminder(&self, reminder_id: &ID) -> Vec<QueuedJob>;
    async fn find_by_state(&self, state: JobState) -> Vec<QueuedJob>;
    /// Whether a `SendReminder` job for the reminder is queued or processing
    async fn has_outstanding_reminder_job(&self, reminder_id: &ID) -> anyhow::Result<bool>;
}
