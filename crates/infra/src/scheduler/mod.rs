mod claims;
mod state;

use crate::{
    repos::{IDeliveryQueue, IEventRepo, IReminderRepo, IUserRepo, Repos},
    system::ISys,
};
use nudge_domain::{DeliveryJob, EnqueueOptions, JobPriority, Reminder, ID};
pub use claims::{DeliveryClaim, DeliveryClaims};
pub use state::SchedulerState;
use std::{sync::Arc, time::Duration};
use tracing::{error, info, warn};

/// What `ReminderScheduler::schedule` did with a `Reminder`
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleOutcome {
    /// The `Reminder` was due and a delivery job was submitted
    Enqueued(ID),
    /// Fires soon, handed to the delivery queue with a delay
    Deferred(ID),
    /// An in-process timer will submit the delivery job at fire time
    TimerRegistered,
    Skipped,
}

/// Maps active `Reminder`s to the moment their delivery job is submitted
pub struct ReminderScheduler {
    state: Arc<SchedulerState>,
    reminders: Arc<dyn IReminderRepo>,
    users: Arc<dyn IUserRepo>,
    events: Arc<dyn IEventRepo>,
    queue: Arc<dyn IDeliveryQueue>,
    sys: Arc<dyn ISys>,
    /// Reminders firing within this many millis do not get a timer
    near_term_window_millis: i64,
}

impl ReminderScheduler {
    pub fn new(repos: &Repos, sys: Arc<dyn ISys>, near_term_window_millis: i64) -> Self {
        Self {
            state: Arc::new(SchedulerState::new()),
            reminders: repos.reminders.clone(),
            users: repos.users.clone(),
            events: repos.events.clone(),
            queue: repos.delivery_jobs.clone(),
            sys,
            near_term_window_millis,
        }
    }

    /// Makes sure a delivery job is submitted when the `Reminder` fires.
    /// Problems are logged and the `Reminder` is skipped, the sweep
    /// provides eventual delivery.
    #[tracing::instrument(name = "ReminderScheduler::schedule", skip(self))]
    pub async fn schedule(&self, reminder_id: &ID) -> ScheduleOutcome {
        let reminder = match self.reminders.find(reminder_id).await {
            Some(reminder) => reminder,
            None => {
                warn!("Reminder {} not found, not scheduling it", reminder_id);
                self.state.cancel(reminder_id);
                return ScheduleOutcome::Skipped;
            }
        };
        if !reminder.status.is_active() {
            info!(
                "Reminder {} is {}, not scheduling it",
                reminder_id, reminder.status
            );
            self.state.cancel(reminder_id);
            return ScheduleOutcome::Skipped;
        }
        if self.users.find(&reminder.user_id).await.is_none() {
            warn!(
                "User {} of reminder {} not found, not scheduling it",
                reminder.user_id, reminder_id
            );
            self.state.cancel(reminder_id);
            return ScheduleOutcome::Skipped;
        }
        if self.events.find(&reminder.event_id).await.is_none() {
            warn!(
                "Event {} of reminder {} not found, not scheduling it",
                reminder.event_id, reminder_id
            );
            self.state.cancel(reminder_id);
            return ScheduleOutcome::Skipped;
        }

        let delay = reminder.effective_fire_time() - self.sys.get_timestamp_millis();
        if delay <= 0 {
            self.state.cancel(reminder_id);
            return match self.enqueue_overdue(&reminder).await {
                Some(job_id) => ScheduleOutcome::Enqueued(job_id),
                None => ScheduleOutcome::Skipped,
            };
        }
        if delay < self.near_term_window_millis {
            self.state.cancel(reminder_id);
            let options = EnqueueOptions::default()
                .with_delay(delay)
                .with_priority(JobPriority::Normal);
            return match self.queue.enqueue(send_reminder(&reminder), options).await {
                Ok(job_id) => ScheduleOutcome::Deferred(job_id),
                Err(e) => {
                    error!("Unable to enqueue reminder {}. Err: {:?}", reminder_id, e);
                    ScheduleOutcome::Skipped
                }
            };
        }

        self.register_timer(reminder.id.clone(), delay);
        ScheduleOutcome::TimerRegistered
    }

    fn register_timer(&self, reminder_id: ID, delay_millis: i64) {
        let state = self.state.clone();
        let queue = self.queue.clone();
        let delay = Duration::from_millis(delay_millis as u64);
        self.state.register(reminder_id.clone(), move |generation| {
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let job = DeliveryJob::SendReminder {
                    reminder_id: reminder_id.clone(),
                };
                if let Err(e) = queue.enqueue(job, EnqueueOptions::default()).await {
                    error!(
                        "Timer for reminder {} was unable to enqueue it. Err: {:?}",
                        reminder_id, e
                    );
                }
                state.remove_if_current(&reminder_id, generation);
            })
        });
    }

    /// Enqueues a high priority delivery job unless one is already outstanding
    async fn enqueue_overdue(&self, reminder: &Reminder) -> Option<ID> {
        match self.queue.has_outstanding_reminder_job(&reminder.id).await {
            Ok(true) => return None,
            Ok(false) => (),
            Err(e) => {
                error!(
                    "Unable to look up delivery jobs of reminder {}. Err: {:?}",
                    reminder.id, e
                );
                return None;
            }
        }
        let options = EnqueueOptions::default().with_priority(JobPriority::High);
        match self.queue.enqueue(send_reminder(reminder), options).await {
            Ok(job_id) => Some(job_id),
            Err(e) => {
                error!("Unable to enqueue reminder {}. Err: {:?}", reminder.id, e);
                None
            }
        }
    }

    /// Stops the live timer of the `Reminder`. Jobs already in the delivery
    /// queue stay there, their handler re-checks the `Reminder` status.
    pub fn unschedule(&self, reminder_id: &ID) -> bool {
        self.state.cancel(reminder_id)
    }

    /// Schedules every active `Reminder` that fires in the future.
    /// Returns how many were scheduled.
    #[tracing::instrument(name = "ReminderScheduler::initialize", skip(self))]
    pub async fn initialize(&self) -> usize {
        let now = self.sys.get_timestamp_millis();
        let reminders = self.reminders.find_pending_future(now).await;
        let mut scheduled = 0;
        for reminder in reminders {
            if self.schedule(&reminder.id).await != ScheduleOutcome::Skipped {
                scheduled += 1;
            }
        }
        info!("Scheduled {} reminders on startup", scheduled);
        scheduled
    }

    /// Enqueues every overdue `Reminder` that has no outstanding delivery job.
    /// Returns how many jobs were enqueued.
    #[tracing::instrument(name = "ReminderScheduler::sweep", skip(self))]
    pub async fn sweep(&self) -> usize {
        let now = self.sys.get_timestamp_millis();
        let overdue = self.reminders.find_overdue(now).await;
        let mut enqueued = 0;
        for reminder in &overdue {
            if self.enqueue_overdue(reminder).await.is_some() {
                enqueued += 1;
            }
        }
        if enqueued > 0 {
            info!(
                "Sweep enqueued {} of {} overdue reminders",
                enqueued,
                overdue.len()
            );
        }
        enqueued
    }

    pub fn is_scheduled(&self, reminder_id: &ID) -> bool {
        self.state.contains(reminder_id)
    }

    pub fn timer_count(&self) -> usize {
        self.state.len()
    }
}

fn send_reminder(reminder: &Reminder) -> DeliveryJob {
    DeliveryJob::SendReminder {
        reminder_id: reminder.id.clone(),
    }
}
