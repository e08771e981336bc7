//! Bearer-Token Authentication
//!
//! Token issuance and revocation belong to the external auth service;
//! this extractor only resolves a presented token to a user row.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::database::UserOps;
use crate::server::error::ApiError;
use crate::server::AppState;

/// The authenticated caller, resolved from the `Authorization` header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("missing authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("expected a bearer token"))?;

        let user = state
            .db
            .user_for_token(token)
            .await?
            .ok_or_else(|| ApiError::unauthorized("invalid or expired token"))?;

        Ok(AuthUser {
            id: user.id,
            username: user.username,
        })
    }
}
