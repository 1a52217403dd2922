use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use nudge_domain::{User, ID};
use serde::Serialize;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Claims {
    exp: usize,
    user_id: ID,
}

pub fn create_token(secret: &str, user: &User) -> String {
    let claims = Claims {
        exp: (Utc::now().timestamp() + 60 * 60) as usize,
        user_id: user.id.clone(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("To encode token")
}

pub fn now() -> i64 {
    Utc::now().timestamp_millis()
}
