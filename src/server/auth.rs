//! Bearer token authentication
//!
//! Handlers that need a user take an [`AuthUser`] argument; the extractor
//! resolves `Authorization: Bearer <token>` through the [`UserDirectory`].
//!
//! [`UserDirectory`]: crate::storage::UserDirectory

use super::error::ApiError;
use super::AppState;
use crate::storage::User;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

/// The authenticated caller
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token =
            bearer_token(parts).ok_or_else(|| ApiError::unauthorized("Not authorized, no token"))?;

        match state.users.authenticate(token)? {
            Some(user) => Ok(AuthUser(user)),
            None => {
                tracing::debug!("Rejected request with unknown bearer token");
                Err(ApiError::unauthorized("Invalid token"))
            }
        }
    }
}
