//! User repository implementation.
//!
//! Covers user records, their API tokens, and the per-user note graph.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{Pool, Postgres, Row};
use tracing::{debug, info};
use uuid::Uuid;

use moonbrain_core::{
    merge_links, merge_nodes, new_v7, ApiToken, Error, GraphNodeLinks, NoteGraph, Result, User,
    UserProfile, UserRepository,
};

const USER_COLUMNS: &str = "id, provider, email, name, first_name, last_name, nick_name, \
     external_id, avatar_url, token, refresh_token, token_expiration, profile_url, \
     created_at, updated_at";

fn user_from_row(row: &PgRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id").map_err(Error::Database)?,
        provider: row.try_get("provider").map_err(Error::Database)?,
        email: row.try_get("email").map_err(Error::Database)?,
        name: row.try_get("name").map_err(Error::Database)?,
        first_name: row.try_get("first_name").map_err(Error::Database)?,
        last_name: row.try_get("last_name").map_err(Error::Database)?,
        nick_name: row.try_get("nick_name").map_err(Error::Database)?,
        external_id: row.try_get("external_id").map_err(Error::Database)?,
        avatar_url: row.try_get("avatar_url").map_err(Error::Database)?,
        token: row.try_get("token").map_err(Error::Database)?,
        refresh_token: row.try_get("refresh_token").map_err(Error::Database)?,
        token_expiration: row.try_get("token_expiration").map_err(Error::Database)?,
        profile_url: row.try_get("profile_url").map_err(Error::Database)?,
        created_at: row.try_get("created_at").map_err(Error::Database)?,
        updated_at: row.try_get("updated_at").map_err(Error::Database)?,
    })
}

fn api_token_from_row(row: &PgRow) -> Result<ApiToken> {
    Ok(ApiToken {
        id: row.try_get("id").map_err(Error::Database)?,
        token: row.try_get("token").map_err(Error::Database)?,
        permissions: row.try_get("permissions").map_err(Error::Database)?,
        created_at: row.try_get("created_at").map_err(Error::Database)?,
    })
}

/// PostgreSQL implementation of UserRepository.
pub struct PgUserRepository {
    pool: Pool<Postgres>,
}

impl PgUserRepository {
    /// Create a new PgUserRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_or_update(&self, profile: &UserProfile, session_token: &str) -> Result<User> {
        let now = Utc::now();
        let query = format!(
            "INSERT INTO app_user (id, provider, email, name, first_name, last_name, nick_name,
                                   external_id, avatar_url, token, refresh_token,
                                   token_expiration, profile_url, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $14)
             ON CONFLICT (email, provider) DO UPDATE
             SET name = EXCLUDED.name,
                 first_name = EXCLUDED.first_name,
                 last_name = EXCLUDED.last_name,
                 nick_name = EXCLUDED.nick_name,
                 external_id = EXCLUDED.external_id,
                 avatar_url = EXCLUDED.avatar_url,
                 token = EXCLUDED.token,
                 refresh_token = EXCLUDED.refresh_token,
                 token_expiration = EXCLUDED.token_expiration,
                 profile_url = EXCLUDED.profile_url,
                 updated_at = EXCLUDED.updated_at
             RETURNING {USER_COLUMNS}"
        );

        let row = sqlx::query(&query)
            .bind(new_v7())
            .bind(&profile.provider)
            .bind(&profile.email)
            .bind(&profile.name)
            .bind(&profile.first_name)
            .bind(&profile.last_name)
            .bind(&profile.nick_name)
            .bind(&profile.external_id)
            .bind(&profile.avatar_url)
            .bind(session_token)
            .bind(&profile.refresh_token)
            .bind(profile.token_expiration)
            .bind(&profile.profile_url)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;

        let user = user_from_row(&row)?;
        info!(
            subsystem = "db",
            component = "user_repository",
            op = "create_or_update",
            user_id = %user.id,
            provider = %user.provider,
            "User signed in"
        );
        Ok(user)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM app_user WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!("SELECT {USER_COLUMNS} FROM app_user WHERE id = ANY($1)");
        let rows = sqlx::query(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        rows.iter().map(user_from_row).collect()
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<User>> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM app_user u
             WHERE u.token = $1
                OR EXISTS (SELECT 1 FROM api_token t WHERE t.user_id = u.id AND t.token = $1)
             LIMIT 1"
        );
        let row = sqlx::query(&query)
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn clear_session_token(&self, user_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE app_user SET token = NULL, updated_at = $2 WHERE id = $1")
            .bind(user_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "user_repository",
            op = "clear_session_token",
            user_id = %user_id,
            "Session token cleared"
        );
        Ok(())
    }

    async fn list_api_tokens(&self, user_id: Uuid) -> Result<Vec<ApiToken>> {
        let rows = sqlx::query(
            "SELECT id, token, permissions, created_at FROM api_token
             WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(api_token_from_row).collect()
    }

    async fn create_api_token(
        &self,
        user_id: Uuid,
        token: &str,
        permissions: &str,
    ) -> Result<ApiToken> {
        let row = sqlx::query(
            "INSERT INTO api_token (id, user_id, token, permissions, created_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, token, permissions, created_at",
        )
        .bind(new_v7())
        .bind(user_id)
        .bind(token)
        .bind(permissions)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        let api_token = api_token_from_row(&row)?;
        info!(
            subsystem = "db",
            component = "user_repository",
            op = "create_api_token",
            user_id = %user_id,
            token_id = %api_token.id,
            "API token created"
        );
        Ok(api_token)
    }

    async fn delete_api_token(&self, user_id: Uuid, token_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM api_token WHERE id = $1 AND user_id = $2")
            .bind(token_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_note_graph(&self, user_id: Uuid) -> Result<NoteGraph> {
        let graph: Option<Json<NoteGraph>> =
            sqlx::query_scalar("SELECT note_graph FROM app_user WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(Error::Database)?;

        Ok(graph.map(|g| g.0).unwrap_or_default())
    }

    async fn upsert_graph_node(&self, user_id: Uuid, update: &GraphNodeLinks) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // Row lock serializes concurrent merges for the same user.
        let current: Option<Json<NoteGraph>> =
            sqlx::query_scalar("SELECT note_graph FROM app_user WHERE id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(Error::Database)?;

        let Some(Json(graph)) = current else {
            return Err(Error::NotFound(format!("User {} not found", user_id)));
        };

        let merged = NoteGraph {
            nodes: merge_nodes(&graph.nodes, update.node.clone()),
            links: merge_links(&graph.links, &update.links),
        };

        sqlx::query("UPDATE app_user SET note_graph = $2 WHERE id = $1")
            .bind(user_id)
            .bind(Json(&merged))
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "user_repository",
            op = "upsert_graph_node",
            user_id = %user_id,
            note_id = %update.node.id,
            node_count = merged.nodes.len(),
            link_count = merged.links.len(),
            "Note graph updated"
        );
        Ok(())
    }
}
