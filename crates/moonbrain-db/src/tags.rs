//! Tag repository implementation.

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use tracing::debug;

use moonbrain_core::{Error, Result, TagRepository};

/// PostgreSQL implementation of TagRepository.
pub struct PgTagRepository {
    pool: Pool<Postgres>,
}

impl PgTagRepository {
    /// Create a new PgTagRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TagRepository for PgTagRepository {
    async fn list_all(&self) -> Result<Vec<String>> {
        sqlx::query_scalar::<_, String>("SELECT name FROM tag ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)
    }

    async fn bulk_upsert(&self, tags: &[String]) -> Result<()> {
        if tags.is_empty() {
            return Ok(());
        }

        sqlx::query(
            "INSERT INTO tag (name)
             SELECT DISTINCT UNNEST($1::text[])
             ON CONFLICT (name) DO NOTHING",
        )
        .bind(tags)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "tag_repository",
            op = "bulk_upsert",
            batch_size = tags.len(),
            "Tags upserted"
        );
        Ok(())
    }
}
