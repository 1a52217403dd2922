use nudge_domain::Tz;
use nudge_utils::create_random_secret;
use std::{fmt::Display, str::FromStr};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Config {
    /// Secret key used by administrators of the service
    pub admin_key: String,
    /// Secret used to verify the `Authorization` tokens of `User`s
    pub jwt_secret: Option<String>,
    /// Port for the application to run on
    pub port: usize,
    /// Reminders firing within this many millis are handed to the delivery
    /// queue with a delay instead of getting an in-process timer
    pub near_term_window_millis: i64,
    /// How often overdue reminders are reconciled
    pub sweep_interval_secs: u64,
    /// Local hour of the day at which the daily digest goes out
    pub digest_hour: u32,
    pub digest_timezone: Tz,
    pub queue_poll_interval_millis: u64,
    pub delivery_max_attempts: i32,
    pub delivery_backoff_base_millis: i64,
    /// Maximum number of jobs processed at the same time
    pub delivery_concurrency: usize,
    /// A job that runs longer than this is abandoned
    pub job_timeout_secs: u64,
    pub notification_webhook: Option<NotificationWebhookConfig>,
}

#[derive(Debug, Clone)]
pub struct NotificationWebhookConfig {
    pub url: String,
    pub key: Option<String>,
}

fn parse_env<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
{
    match std::env::var(name) {
        Ok(value) => match value.parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!(
                    "The given {}: {} is not valid, falling back to the default value: {}.",
                    name, value, default
                );
                default
            }
        },
        Err(_) => default,
    }
}

impl Config {
    pub fn new() -> Self {
        let admin_key = match std::env::var("NUDGE_ADMIN_KEY") {
            Ok(key) => key,
            Err(_) => {
                info!("Did not find NUDGE_ADMIN_KEY environment variable. Going to create one.");
                let key = create_random_secret(16);
                info!("Admin key was generated and set to: {}", key);
                key
            }
        };
        let jwt_secret = std::env::var("JWT_SECRET").ok();
        if jwt_secret.is_none() {
            warn!("Did not find JWT_SECRET environment variable. User requests will be rejected.");
        }

        let mut digest_hour = parse_env::<u32>("DIGEST_HOUR", 8);
        if digest_hour > 23 {
            warn!(
                "The given DIGEST_HOUR: {} is not an hour of the day, falling back to 8.",
                digest_hour
            );
            digest_hour = 8;
        }

        let notification_webhook =
            std::env::var("NOTIFICATION_WEBHOOK_URL")
                .ok()
                .map(|url| NotificationWebhookConfig {
                    url,
                    key: std::env::var("NOTIFICATION_WEBHOOK_KEY").ok(),
                });

        Self {
            admin_key,
            jwt_secret,
            port: parse_env("PORT", 5000),
            near_term_window_millis: parse_env("NEAR_TERM_WINDOW_MILLIS", 1000 * 60 * 5),
            sweep_interval_secs: parse_env("SWEEP_INTERVAL_SECS", 60 * 5),
            digest_hour,
            digest_timezone: parse_env("DIGEST_TIMEZONE", Tz::UTC),
            queue_poll_interval_millis: parse_env("QUEUE_POLL_INTERVAL_MILLIS", 1000),
            delivery_max_attempts: parse_env::<i32>("DELIVERY_MAX_ATTEMPTS", 3).max(1),
            delivery_backoff_base_millis: parse_env("DELIVERY_BACKOFF_BASE_MILLIS", 1000),
            delivery_concurrency: parse_env::<usize>("DELIVERY_CONCURRENCY", 4).max(1),
            job_timeout_secs: parse_env("JOB_TIMEOUT_SECS", 60),
            notification_webhook,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
