use crate::error::NudgeError;
use actix_web::HttpRequest;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use nudge_domain::{User, ID};
use nudge_infra::NudgeContext;
use serde::{Deserialize, Serialize};

pub const ADMIN_KEY_HEADER: &str = "nudge-admin-key";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Expiration time (as UTC timestamp in seconds)
    pub exp: usize,
    /// The `User` the token was issued to
    pub user_id: ID,
}

fn parse_authtoken_header(token_header_value: &str) -> String {
    token_header_value
        .trim_start_matches("Bearer")
        .trim_start_matches("bearer")
        .trim()
        .to_string()
}

fn decode_token(secret: &str, token: &str) -> anyhow::Result<Claims> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let claims = decode::<Claims>(token, &decoding_key, &Validation::new(Algorithm::HS256))?.claims;

    Ok(claims)
}

async fn auth_user_req(req: &HttpRequest, ctx: &NudgeContext) -> Option<User> {
    let secret = ctx.config.jwt_secret.as_ref()?;
    let token = req.headers().get("authorization")?;
    let token = match token.to_str() {
        Ok(token) => parse_authtoken_header(token),
        Err(_) => return None,
    };
    match decode_token(secret, &token) {
        Ok(claims) => ctx.repos.users.find(&claims.user_id).await,
        Err(_) => None,
    }
}

/// Finds the `User` making the request from the `Authorization` bearer token
pub async fn protect_route(req: &HttpRequest, ctx: &NudgeContext) -> Result<User, NudgeError> {
    match auth_user_req(req, ctx).await {
        Some(user) => Ok(user),
        None => Err(NudgeError::Unauthorized(
            "Unable to find user from credentials".into(),
        )),
    }
}

/// Only lets through requests carrying the admin key
pub fn protect_admin_route(req: &HttpRequest, ctx: &NudgeContext) -> Result<(), NudgeError> {
    match req.headers().get(ADMIN_KEY_HEADER) {
        Some(key) if key.as_bytes() == ctx.config.admin_key.as_bytes() => Ok(()),
        Some(_) => Err(NudgeError::Unauthorized("Invalid admin key".into())),
        None => Err(NudgeError::Unauthorized(format!(
            "Missing the `{}` header",
            ADMIN_KEY_HEADER
        ))),
    }
}
