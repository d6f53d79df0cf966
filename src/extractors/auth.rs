//! Require a valid bearer token (HS256, shared secret) on admin routes.

use crate::error::AppError;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Claims issued by the token provider. Only `exp` is mandatory.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub exp: u64,
    #[serde(default)]
    pub user_id: Option<serde_json::Value>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Authenticated caller. Rejects with 401 when the header is missing or the token does not verify.
#[derive(Clone, Debug)]
pub struct AuthUser(pub Claims);

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| {
        tracing::warn!("token verification failed: {}", e);
        AppError::Unauthorized("invalid or expired token".into())
    })?;
    match data.claims.token_type.as_deref() {
        None | Some("access") => Ok(data.claims),
        Some(other) => Err(AppError::Unauthorized(format!("{} token cannot be used here", other))),
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Unauthorized("authentication credentials were not provided".into()))?;
        let claims = verify_token(token, &state.settings.secret_key)?;
        Ok(AuthUser(claims))
    }
}
