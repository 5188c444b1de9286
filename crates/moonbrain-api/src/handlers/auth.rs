//! GitHub login, sessions, and API token handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::response::Redirect;
use axum::Json;
use moonbrain_core::{ApiToken, PublicUser, User};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::extractors::{Auth, RequireAuth};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRedirect {
    pub redirect_url: String,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTokenRequest {
    pub token_id: Uuid,
}

/// Frontend URL that completes login with the session token and profile.
pub fn client_login_url(client_address: &str, user: &User, token: &str) -> String {
    format!(
        "{}/auth/login?token={}&username={}&avatarUrl={}&email={}&profileUrl={}",
        client_address.trim_end_matches('/'),
        urlencoding::encode(token),
        urlencoding::encode(&user.nick_name),
        urlencoding::encode(&user.avatar_url),
        urlencoding::encode(&user.email),
        urlencoding::encode(&user.profile_url)
    )
}

/// Start GitHub login.
///
/// GET /v1/auth/github/login
#[utoipa::path(get, path = "/v1/auth/github/login", tag = "Auth",
    responses((status = 200, description = "Provider authorize URL", body = LoginRedirect)))]
pub async fn github_login(
    State(state): State<AppState>,
) -> Result<DataResponse<LoginRedirect>, ApiError> {
    let oauth_state = state
        .oauth_state
        .issue()
        .map_err(|e| ApiError::with_message(e, "Can't start login"))?;

    Ok(DataResponse::new(LoginRedirect {
        redirect_url: state.oauth.authorize_url(&oauth_state),
    }))
}

/// Finish GitHub login and hand the session to the frontend.
///
/// GET /v1/auth/github/callback
#[utoipa::path(get, path = "/v1/auth/github/callback", tag = "Auth",
    params(CallbackQuery),
    responses(
        (status = 303, description = "Redirect to the frontend login page"),
        (status = 400, description = "Missing code or invalid state")))]
pub async fn github_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Redirect, ApiError> {
    let state_valid = query
        .state
        .as_deref()
        .is_some_and(|s| state.oauth_state.verify(s));
    if !state_valid {
        return Err(ApiError::BadRequest("Invalid OAuth state".to_string()));
    }
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Code doesn't provided".to_string()))?;

    let failed = "Can't authorize via GitHub";
    let access_token = state
        .oauth
        .exchange_code(&code)
        .await
        .map_err(|e| ApiError::with_message(e.context("github: exchange code"), failed))?;
    let profile = state
        .oauth
        .fetch_profile(&access_token)
        .await
        .map_err(|e| ApiError::with_message(e.context("github: fetch profile"), failed))?;

    let user = state
        .users
        .login(&profile)
        .await
        .map_err(|e| ApiError::with_message(e, failed))?;
    let token = user
        .token
        .as_deref()
        .ok_or_else(|| ApiError::Internal(failed.to_string()))?;

    Ok(Redirect::to(&client_login_url(
        &state.config.client_address,
        &user,
        token,
    )))
}

/// End the caller's session.
///
/// GET /v1/auth/logout
#[utoipa::path(get, path = "/v1/auth/logout", tag = "Auth",
    responses((status = 200, description = "Logged out")))]
pub async fn logout(
    State(state): State<AppState>,
    auth: Auth,
) -> Result<DataResponse<()>, ApiError> {
    if let Some(user) = auth.user {
        state
            .users
            .logout(&user)
            .await
            .map_err(|e| ApiError::with_message(e, "Can't logout"))?;
    }
    Ok(DataResponse::new(()))
}

/// Issue a new API token for the caller.
///
/// POST /v1/auth/token
#[utoipa::path(post, path = "/v1/auth/token", tag = "Auth",
    responses((status = 200, description = "Token", body = ApiToken)))]
pub async fn create_token(
    State(state): State<AppState>,
    RequireAuth { user }: RequireAuth,
) -> Result<DataResponse<ApiToken>, ApiError> {
    let token = state
        .users
        .create_api_token(&user)
        .await
        .map_err(|e| ApiError::with_message(e, "Can't create token"))?;
    Ok(DataResponse::new(token))
}

/// Delete one of the caller's API tokens.
///
/// DELETE /v1/auth/token
#[utoipa::path(delete, path = "/v1/auth/token", tag = "Auth",
    request_body = DeleteTokenRequest,
    responses(
        (status = 200, description = "Deleted"),
        (status = 400, description = "Malformed body"),
        (status = 404, description = "No such token")))]
pub async fn delete_token(
    State(state): State<AppState>,
    RequireAuth { user }: RequireAuth,
    body: Result<Json<DeleteTokenRequest>, JsonRejection>,
) -> Result<DataResponse<()>, ApiError> {
    let Json(req) =
        body.map_err(|_| ApiError::BadRequest("Token doesn't provided".to_string()))?;

    let deleted = state
        .users
        .delete_api_token(&user, req.token_id)
        .await
        .map_err(|e| ApiError::with_message(e, "Can't delete token"))?;

    if !deleted {
        return Err(ApiError::NotFound("Token not found".to_string()));
    }
    Ok(DataResponse::new(()))
}

/// Resolve the bearer token to its user.
///
/// GET /v1/auth/verify
#[utoipa::path(get, path = "/v1/auth/verify", tag = "Auth",
    responses(
        (status = 200, description = "Token owner", body = PublicUser),
        (status = 400, description = "Unknown token"),
        (status = 401, description = "No token")))]
pub async fn verify(auth: Auth) -> Result<DataResponse<PublicUser>, ApiError> {
    if auth.token.is_none() {
        return Err(ApiError::Unauthorized("Token doesn't provided".to_string()));
    }
    let user = auth
        .user
        .ok_or_else(|| ApiError::BadRequest("Invalid token".to_string()))?;
    Ok(DataResponse::new(PublicUser::from(&user)))
}

/// The caller's API tokens.
///
/// GET /v1/auth/api-tokens
#[utoipa::path(get, path = "/v1/auth/api-tokens", tag = "Auth",
    responses((status = 200, description = "Tokens", body = [ApiToken])))]
pub async fn list_api_tokens(
    State(state): State<AppState>,
    RequireAuth { user }: RequireAuth,
) -> Result<DataResponse<Vec<ApiToken>>, ApiError> {
    let tokens = state
        .users
        .list_api_tokens(&user)
        .await
        .map_err(|e| ApiError::with_message(e, "Could not find api tokens for current user"))?;
    Ok(DataResponse::new(tokens))
}
