use super::utils::create_token;
use nudge_api::Application;
use nudge_domain::{Event, User};
use nudge_infra::{Config, NudgeContext};
use nudge_sdk::NudgeSDK;

pub const JWT_SECRET: &str = "integration-test-secret";

pub struct TestApp {
    pub config: Config,
    pub address: String,
    pub user: User,
    pub events: Vec<Event>,
}

impl TestApp {
    /// Client acting as the seeded `User`
    pub fn user_client(&self) -> NudgeSDK {
        NudgeSDK::with_token(self.address.clone(), create_token(JWT_SECRET, &self.user))
    }

    pub fn admin_client(&self) -> NudgeSDK {
        NudgeSDK::with_admin_key(self.address.clone(), self.config.admin_key.clone())
    }
}

pub fn event(title: &str, date: i64) -> Event {
    Event {
        id: Default::default(),
        title: title.into(),
        date,
        location: "Oslo Spektrum".into(),
        image_url: None,
        description: None,
        price: Some("350 NOK".into()),
    }
}

// Launch the application as a background task
pub async fn spawn_app() -> (TestApp, NudgeSDK) {
    let user = User::new("Ola Nordmann", "ola@example.com");
    let in_a_week = chrono::Utc::now().timestamp_millis() + 1000 * 60 * 60 * 24 * 7;
    let events = vec![
        event("Jazz night", in_a_week),
        event("Food festival", in_a_week),
    ];

    let mut ctx = NudgeContext::create_inmemory(vec![user.clone()], events.clone());
    ctx.config.port = 0; // Random port
    ctx.config.jwt_secret = Some(JWT_SECRET.into());
    ctx.config.queue_poll_interval_millis = 100;

    let config = ctx.config.clone();
    let application = Application::new(ctx)
        .await
        .expect("Failed to build application.");

    let address = format!("http://localhost:{}/api/v1", application.port());
    let _ = actix_web::rt::spawn(async move {
        application
            .start()
            .await
            .expect("Expected application to start");
    });

    let app = TestApp {
        config,
        address: address.clone(),
        user,
        events,
    };
    let sdk = NudgeSDK::new(address);
    (app, sdk)
}
