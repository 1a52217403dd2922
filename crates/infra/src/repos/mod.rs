mod delivery_job;
mod event;
mod reminder;
mod shared;
mod user;

use crate::system::ISys;
pub use delivery_job::IDeliveryQueue;
use delivery_job::{InMemoryDeliveryQueue, PostgresDeliveryQueue};
pub use event::IEventRepo;
use event::{InMemoryEventRepo, PostgresEventRepo};
use nudge_domain::{Event, User};
pub use reminder::{IReminderRepo, InsertReminderError};
use reminder::{InMemoryReminderRepo, PostgresReminderRepo};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;
pub use user::IUserRepo;
use user::{InMemoryUserRepo, PostgresUserRepo};

#[derive(Clone)]
pub struct Repos {
    pub reminders: Arc<dyn IReminderRepo>,
    pub users: Arc<dyn IUserRepo>,
    pub events: Arc<dyn IEventRepo>,
    pub delivery_jobs: Arc<dyn IDeliveryQueue>,
}

impl Repos {
    pub async fn create_postgres(
        connection_string: &str,
        sys: Arc<dyn ISys>,
        default_max_attempts: i32,
    ) -> anyhow::Result<Self> {
        info!("DB CHECKING CONNECTION ...");
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(connection_string)
            .await?;
        info!("DB CHECKING CONNECTION ... [done]");

        Ok(Self {
            reminders: Arc::new(PostgresReminderRepo::new(pool.clone())),
            users: Arc::new(PostgresUserRepo::new(pool.clone())),
            events: Arc::new(PostgresEventRepo::new(pool.clone())),
            delivery_jobs: Arc::new(PostgresDeliveryQueue::new(
                pool,
                sys,
                default_max_attempts,
            )),
        })
    }

    /// The `User`s and `Event`s are owned by the directory, so the inmemory
    /// repositories are seeded up front.
    pub fn create_inmemory(
        users: Vec<User>,
        events: Vec<Event>,
        sys: Arc<dyn ISys>,
        default_max_attempts: i32,
    ) -> Self {
        Self {
            reminders: Arc::new(InMemoryReminderRepo::new()),
            users: Arc::new(InMemoryUserRepo::new(users)),
            events: Arc::new(InMemoryEventRepo::new(events)),
            delivery_jobs: Arc::new(InMemoryDeliveryQueue::new(sys, default_max_attempts)),
        }
    }
}
