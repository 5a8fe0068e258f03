//! Caller identity extraction
//!
//! Handlers that act on behalf of a user take a [`Caller`] argument. The
//! caller is resolved from the `X-User-Id` header through the user directory.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use crate::error::ApiError;
use crate::voting::Caller;
use crate::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";

#[axum::async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("missing X-User-Id header".to_string()))?;

        match state.directory.get(user_id) {
            Some(user) => Ok(Caller::from(user)),
            None => {
                warn!(user_id = %user_id, path = %parts.uri.path(), "Request from unknown user");
                Err(ApiError::Unauthorized(format!("unknown user '{}'", user_id)))
            }
        }
    }
}
