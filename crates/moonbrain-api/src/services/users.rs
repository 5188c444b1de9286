//! Service for users, sessions, and API tokens.

use std::collections::HashMap;
use std::sync::Arc;

use moonbrain_core::auth::{generate_api_token, generate_session_token};
use moonbrain_core::defaults::API_TOKEN_PERMISSIONS;
use moonbrain_core::{ApiToken, NoteGraph, PublicUser, Result, User, UserProfile, UserRepository};
use tracing::info;
use uuid::Uuid;

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub(crate) fn repository(&self) -> Arc<dyn UserRepository> {
        Arc::clone(&self.users)
    }

    /// Create or update the user behind `profile` and start a new session.
    pub async fn login(&self, profile: &UserProfile) -> Result<User> {
        let user = self
            .users
            .create_or_update(profile, &generate_session_token())
            .await
            .map_err(|e| e.context("user service: create or update user"))?;

        info!(
            subsystem = "service",
            component = "user_service",
            op = "login",
            user_id = %user.id,
            "User logged in"
        );
        Ok(user)
    }

    pub async fn logout(&self, user: &User) -> Result<()> {
        self.users
            .clear_session_token(user.id)
            .await
            .map_err(|e| e.context("user service: logout"))
    }

    pub async fn find_by_token(&self, token: &str) -> Result<Option<User>> {
        self.users
            .find_by_token(token)
            .await
            .map_err(|e| e.context("user service: find user by token"))
    }

    /// Public profiles for `ids`, keyed by user id.
    pub async fn public_users(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, PublicUser>> {
        let users = self
            .users
            .get_by_ids(ids)
            .await
            .map_err(|e| e.context("user service: get users by ids"))?;

        Ok(users
            .iter()
            .map(|user| (user.id, PublicUser::from(user)))
            .collect())
    }

    pub async fn public_user(&self, id: Uuid) -> Result<Option<PublicUser>> {
        let user = self
            .users
            .get_by_id(id)
            .await
            .map_err(|e| e.context("user service: get user"))?;
        Ok(user.as_ref().map(PublicUser::from))
    }

    pub async fn create_api_token(&self, user: &User) -> Result<ApiToken> {
        let token = self
            .users
            .create_api_token(user.id, &generate_api_token(), API_TOKEN_PERMISSIONS)
            .await
            .map_err(|e| e.context("user service: create api token"))?;

        info!(
            subsystem = "service",
            component = "user_service",
            op = "create_api_token",
            user_id = %user.id,
            token_id = %token.id,
            "API token issued"
        );
        Ok(token)
    }

    pub async fn delete_api_token(&self, user: &User, token_id: Uuid) -> Result<bool> {
        self.users
            .delete_api_token(user.id, token_id)
            .await
            .map_err(|e| e.context("user service: delete api token"))
    }

    pub async fn list_api_tokens(&self, user: &User) -> Result<Vec<ApiToken>> {
        self.users
            .list_api_tokens(user.id)
            .await
            .map_err(|e| e.context("user service: get api tokens"))
    }

    pub async fn note_graph(&self, user: &User) -> Result<NoteGraph> {
        self.users
            .get_note_graph(user.id)
            .await
            .map_err(|e| e.context("user service: get note graph"))
    }
}
