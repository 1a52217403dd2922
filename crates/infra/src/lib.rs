mod config;
mod repos;
mod scheduler;
mod services;
mod system;

pub use config::{Config, NotificationWebhookConfig};
pub use repos::{
    IDeliveryQueue, IEventRepo, IReminderRepo, IUserRepo, InsertReminderError, Repos,
};
pub use scheduler::{
    DeliveryClaim, DeliveryClaims, ReminderScheduler, ScheduleOutcome, SchedulerState,
};
pub use services::notification::*;
use nudge_domain::{Event, User};
use sqlx::migrate::MigrateError;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
pub use system::{FakeSys, ISys, RealSys};
use tracing::{info, warn};

#[derive(Clone)]
pub struct NudgeContext {
    pub repos: Repos,
    pub scheduler: Arc<ReminderScheduler>,
    /// Deliveries in progress in this process
    pub claims: Arc<DeliveryClaims>,
    pub composer: Arc<dyn INotificationComposer>,
    pub config: Config,
    pub sys: Arc<dyn ISys>,
}

impl NudgeContext {
    pub fn new(
        repos: Repos,
        config: Config,
        sys: Arc<dyn ISys>,
        composer: Arc<dyn INotificationComposer>,
    ) -> Self {
        let scheduler = Arc::new(ReminderScheduler::new(
            &repos,
            sys.clone(),
            config.near_term_window_millis,
        ));
        Self {
            repos,
            scheduler,
            claims: Arc::new(DeliveryClaims::new()),
            composer,
            config,
            sys,
        }
    }

    /// Context backed by inmemory repositories seeded with the given
    /// `User`s and `Event`s
    pub fn create_inmemory(users: Vec<User>, events: Vec<Event>) -> Self {
        let config = Config::new();
        let sys: Arc<dyn ISys> = Arc::new(RealSys {});
        let repos =
            Repos::create_inmemory(users, events, sys.clone(), config.delivery_max_attempts);
        let composer = create_composer(&config);
        Self::new(repos, config, sys, composer)
    }

    async fn create(params: ContextParams) -> anyhow::Result<Self> {
        let config = Config::new();
        let sys: Arc<dyn ISys> = Arc::new(RealSys {});
        let repos = Repos::create_postgres(
            &params.postgres_connection_string,
            sys.clone(),
            config.delivery_max_attempts,
        )
        .await?;
        let composer = create_composer(&config);
        Ok(Self::new(repos, config, sys, composer))
    }
}

fn create_composer(config: &Config) -> Arc<dyn INotificationComposer> {
    match &config.notification_webhook {
        Some(webhook) => {
            info!("Notifications will be posted to: {}", webhook.url);
            Arc::new(WebhookNotificationComposer::new(
                webhook.url.clone(),
                webhook.key.clone(),
            ))
        }
        None => {
            warn!("Did not find NOTIFICATION_WEBHOOK_URL environment variable. Notifications will only be logged.");
            Arc::new(LogNotificationComposer {})
        }
    }
}

struct ContextParams {
    pub postgres_connection_string: String,
}

const PSQL_CONNECTION_STRING: &str = "DATABASE_URL";

/// Will setup the infrastructure context given the environment
pub async fn setup_context() -> anyhow::Result<NudgeContext> {
    match std::env::var(PSQL_CONNECTION_STRING) {
        Ok(postgres_connection_string) => {
            NudgeContext::create(ContextParams {
                postgres_connection_string,
            })
            .await
        }
        Err(_) => {
            warn!(
                "Did not find {} environment variable. Going to use inmemory repositories.",
                PSQL_CONNECTION_STRING
            );
            Ok(NudgeContext::create_inmemory(vec![], vec![]))
        }
    }
}

/// Runs the migrations when the service is backed by postgres
pub async fn run_migration() -> Result<(), MigrateError> {
    let connection_string = match std::env::var(PSQL_CONNECTION_STRING) {
        Ok(connection_string) => connection_string,
        Err(_) => return Ok(()),
    };
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&connection_string)
        .await?;

    sqlx::migrate!().run(&pool).await
}
