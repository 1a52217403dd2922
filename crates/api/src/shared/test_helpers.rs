use async_trait::async_trait;
use nudge_domain::{Event, NotificationChannel, User, ID};
use nudge_infra::{
    Config, DeliveryError, FakeSys, INotificationComposer, Notification, NotificationKind,
    NudgeContext, Repos,
};
use std::sync::{Arc, Mutex};

pub const SECOND: i64 = 1000;
pub const MINUTE: i64 = 60 * SECOND;
pub const HOUR: i64 = 60 * MINUTE;
pub const DAY: i64 = 24 * HOUR;
/// 2021-01-04T12:00:00Z
pub const START: i64 = 1_609_761_600_000;

#[derive(Debug, Clone)]
pub struct SentNotification {
    pub kind: NotificationKind,
    pub user_id: ID,
    pub channels: Vec<NotificationChannel>,
    pub event_ids: Vec<ID>,
}

/// Remembers every notification instead of sending it
#[derive(Default)]
pub struct RecordingComposer {
    sent: Mutex<Vec<SentNotification>>,
    failure: Mutex<Option<DeliveryError>>,
}

impl RecordingComposer {
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_of_kind(&self, kind: NotificationKind) -> Vec<SentNotification> {
        self.sent()
            .into_iter()
            .filter(|n| n.kind == kind)
            .collect()
    }

    pub fn fail_with(&self, failure: Option<DeliveryError>) {
        *self.failure.lock().unwrap() = failure;
    }
}

#[async_trait]
impl INotificationComposer for RecordingComposer {
    async fn send(
        &self,
        kind: NotificationKind,
        notification: Notification,
    ) -> Result<(), DeliveryError> {
        // Give concurrent deliveries a chance to interleave
        tokio::task::yield_now().await;
        if let Some(failure) = self.failure.lock().unwrap().clone() {
            return Err(failure);
        }
        self.sent.lock().unwrap().push(SentNotification {
            kind,
            user_id: notification.user.id.clone(),
            channels: notification.channels.clone(),
            event_ids: notification
                .items
                .iter()
                .map(|item| item.event.id.clone())
                .collect(),
        });
        Ok(())
    }
}

pub struct TestContext {
    pub ctx: NudgeContext,
    pub sys: Arc<FakeSys>,
    pub composer: Arc<RecordingComposer>,
    pub user: User,
    pub events: Vec<Event>,
}

pub fn event(title: &str) -> Event {
    Event {
        id: Default::default(),
        title: title.into(),
        date: START + 7 * DAY,
        location: "Main hall".into(),
        image_url: None,
        description: Some("Live music".into()),
        price: Some("200 NOK".into()),
    }
}

pub fn setup() -> TestContext {
    setup_with_users(vec![User::new("Ola Nordmann", "ola@example.com")])
}

/// The first `User` is the one acting in the tests
pub fn setup_with_users(users: Vec<User>) -> TestContext {
    let sys = Arc::new(FakeSys::new(START));
    let composer = Arc::new(RecordingComposer::default());
    let events = vec![event("Jazz night"), event("Food festival"), event("Quiz")];
    let mut config = Config::new();
    config.near_term_window_millis = 5 * MINUTE;
    config.delivery_max_attempts = 3;
    config.delivery_backoff_base_millis = SECOND;
    config.digest_hour = 8;
    config.digest_timezone = nudge_domain::Tz::UTC;

    let repos = Repos::create_inmemory(
        users.clone(),
        events.clone(),
        sys.clone(),
        config.delivery_max_attempts,
    );
    let ctx = NudgeContext::new(repos, config, sys.clone(), composer.clone());
    TestContext {
        ctx,
        sys,
        composer,
        user: users[0].clone(),
        events,
    }
}
