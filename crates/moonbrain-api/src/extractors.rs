//! Request extractors for bearer authentication and request ids.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::header;
use moonbrain_core::{extract_bearer_token, User};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// AUTHENTICATION
// =============================================================================

/// Optional authentication.
///
/// Resolves the bearer token, if any, against session and API tokens. An
/// unknown token leaves `user` empty rather than rejecting the request.
#[derive(Debug, Clone)]
pub struct Auth {
    pub token: Option<String>,
    pub user: Option<User>,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Auth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(extract_bearer_token)
            .map(str::to_string);

        let user = match token.as_deref() {
            Some(token) => state
                .users
                .find_by_token(token)
                .await
                .map_err(|e| ApiError::with_message(e, "Couldn't verify token"))?,
            None => None,
        };

        Ok(Auth { token, user })
    }
}

/// Extractor that requires a resolved user.
#[derive(Debug, Clone)]
pub struct RequireAuth {
    pub user: User,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = Auth::from_request_parts(parts, state).await?;

        match auth.user {
            Some(user) => Ok(RequireAuth { user }),
            None => Err(ApiError::Unauthorized("Unauthorized".to_string())),
        }
    }
}
