use crate::{
    reminder::UnknownVariantError,
    shared::entity::{Entity, ID},
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Longest backoff between two delivery attempts
const MAX_BACKOFF_MILLIS: i64 = 1000 * 60 * 60;

/// A unit of work for the delivery queue.
///
/// Payloads only carry references, handlers always load the referenced
/// entities fresh before sending anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DeliveryJob {
    SendReminder { reminder_id: ID },
    SendDigest { user_id: ID, reminder_ids: Vec<ID> },
    SendConfirmation { user_id: ID, event_id: ID },
    SendCancellation { user_id: ID, event_id: ID },
    SendWelcome { user_id: ID },
}

impl DeliveryJob {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SendReminder { .. } => "send-reminder",
            Self::SendDigest { .. } => "send-digest",
            Self::SendConfirmation { .. } => "send-confirmation",
            Self::SendCancellation { .. } => "send-cancellation",
            Self::SendWelcome { .. } => "send-welcome",
        }
    }

    pub fn default_priority(&self) -> JobPriority {
        match self {
            Self::SendCancellation { .. } => JobPriority::High,
            Self::SendDigest { .. } => JobPriority::Low,
            _ => JobPriority::Normal,
        }
    }

    pub fn reminder_id(&self) -> Option<&ID> {
        match self {
            Self::SendReminder { reminder_id } => Some(reminder_id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobPriority {
    Low = 0,
    Normal = 1,
    High = 2,
    Critical = 3,
}

impl Default for JobPriority {
    fn default() -> Self {
        Self::Normal
    }
}

impl JobPriority {
    pub fn as_i16(&self) -> i16 {
        *self as i16
    }

    pub fn from_i16(value: i16) -> Self {
        match value {
            i16::MIN..=0 => Self::Low,
            1 => Self::Normal,
            2 => Self::High,
            _ => Self::Critical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Waiting for `run_at` and a free worker
    Queued,
    Processing,
    Completed,
    /// Gave up after exhausting its attempts or on a permanent error
    Dead,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Dead => "dead",
        }
    }

    pub fn is_outstanding(&self) -> bool {
        matches!(self, Self::Queued | Self::Processing)
    }
}

impl FromStr for JobState {
    type Err = UnknownVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "dead" => Ok(Self::Dead),
            _ => Err(UnknownVariantError(s.to_string())),
        }
    }
}

/// Options given when submitting a `DeliveryJob`
#[derive(Debug, Clone, Default)]
pub struct EnqueueOptions {
    /// Do not run the job before this many millis have passed
    pub delay_millis: Option<i64>,
    /// Falls back to `DeliveryJob::default_priority`
    pub priority: Option<JobPriority>,
    pub max_attempts: Option<i32>,
}

impl EnqueueOptions {
    pub fn with_delay(mut self, delay_millis: i64) -> Self {
        self.delay_millis = Some(delay_millis);
        self
    }

    pub fn with_priority(mut self, priority: JobPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: i32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

/// A `DeliveryJob` as stored in the delivery queue
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedJob {
    pub id: ID,
    pub job: DeliveryJob,
    pub priority: JobPriority,
    pub state: JobState,
    /// Number of times a worker has picked up this job
    pub attempts: i32,
    pub max_attempts: i32,
    /// The job is not handed out before this timestamp
    pub run_at: i64,
    pub started_at: Option<i64>,
    pub last_error: Option<String>,
    pub created: i64,
}

impl QueuedJob {
    pub fn new(job: DeliveryJob, options: EnqueueOptions, default_max_attempts: i32, now: i64) -> Self {
        let priority = options
            .priority
            .unwrap_or_else(|| job.default_priority());
        Self {
            id: Default::default(),
            priority,
            job,
            state: JobState::Queued,
            attempts: 0,
            max_attempts: options.max_attempts.unwrap_or(default_max_attempts).max(1),
            run_at: now + options.delay_millis.unwrap_or(0).max(0),
            started_at: None,
            last_error: None,
            created: now,
        }
    }

    pub fn can_retry(&self) -> bool {
        self.attempts < self.max_attempts
    }

    /// Exponential backoff: `base * 2^(attempts - 1)`, capped at one hour
    pub fn backoff_delay_millis(&self, base_millis: i64) -> i64 {
        let exponent = self.attempts.saturating_sub(1).clamp(0, 30) as u32;
        base_millis
            .saturating_mul(2_i64.pow(exponent))
            .min(MAX_BACKOFF_MILLIS)
    }
}

impl Entity for QueuedJob {
    fn id(&self) -> &ID {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reminder_job() -> DeliveryJob {
        DeliveryJob::SendReminder {
            reminder_id: ID::default(),
        }
    }

    #[test]
    fn kinds_and_default_priorities() {
        let user_id = ID::default();
        let event_id = ID::default();
        let cancellation = DeliveryJob::SendCancellation {
            user_id: user_id.clone(),
            event_id: event_id.clone(),
        };
        assert_eq!(cancellation.kind(), "send-cancellation");
        assert_eq!(cancellation.default_priority(), JobPriority::High);
        let digest = DeliveryJob::SendDigest {
            user_id,
            reminder_ids: vec![],
        };
        assert_eq!(digest.default_priority(), JobPriority::Low);
        assert_eq!(reminder_job().default_priority(), JobPriority::Normal);
        assert!(reminder_job().reminder_id().is_some());
        assert!(digest.reminder_id().is_none());
    }

    #[test]
    fn job_payload_is_tagged_by_kind() {
        let reminder_id = ID::default();
        let job = DeliveryJob::SendReminder {
            reminder_id: reminder_id.clone(),
        };
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["kind"], "send-reminder");
        assert_eq!(json["reminder_id"], reminder_id.as_string());
    }

    #[test]
    fn queued_job_applies_options() {
        let job = QueuedJob::new(
            reminder_job(),
            EnqueueOptions::default()
                .with_delay(500)
                .with_priority(JobPriority::High),
            3,
            1000,
        );
        assert_eq!(job.run_at, 1500);
        assert_eq!(job.priority, JobPriority::High);
        assert_eq!(job.max_attempts, 3);
        assert_eq!(job.state, JobState::Queued);

        let job = QueuedJob::new(reminder_job(), EnqueueOptions::default().with_delay(-50), 3, 1000);
        assert_eq!(job.run_at, 1000);
    }

    #[test]
    fn backoff_grows_exponentially_and_is_capped() {
        let mut job = QueuedJob::new(reminder_job(), Default::default(), 3, 0);
        job.attempts = 1;
        assert_eq!(job.backoff_delay_millis(1000), 1000);
        job.attempts = 2;
        assert_eq!(job.backoff_delay_millis(1000), 2000);
        job.attempts = 3;
        assert_eq!(job.backoff_delay_millis(1000), 4000);
        job.attempts = 40;
        assert_eq!(job.backoff_delay_millis(1000), MAX_BACKOFF_MILLIS);
    }

    #[test]
    fn retries_are_bounded() {
        let mut job = QueuedJob::new(reminder_job(), Default::default(), 3, 0);
        job.attempts = 2;
        assert!(job.can_retry());
        job.attempts = 3;
        assert!(!job.can_retry());
    }

    #[test]
    fn priorities_round_trip_through_storage_values() {
        for priority in [
            JobPriority::Low,
            JobPriority::Normal,
            JobPriority::High,
            JobPriority::Critical,
        ] {
            assert_eq!(JobPriority::from_i16(priority.as_i16()), priority);
        }
        assert!(JobPriority::High > JobPriority::Normal);
    }
}
