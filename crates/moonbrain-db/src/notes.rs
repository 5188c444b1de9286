//! Note repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{Pool, Postgres, Row};
use tracing::{debug, info};
use uuid::Uuid;

use moonbrain_core::{Error, Note, NoteFilter, NoteMeta, NoteRepository, Result};

const NOTE_COLUMNS: &str =
    "id, author_id, content, meta, created_at, updated_at, views, likes";

/// Bind parameter for a generated note filter.
#[derive(Debug, Clone, PartialEq)]
pub enum NoteQueryParam {
    Uuid(Uuid),
    String(String),
}

/// WHERE clause for a [`NoteFilter`], numbered from `$1`.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteFilterClause {
    pub sql: String,
    pub params: Vec<NoteQueryParam>,
}

impl NoteFilterClause {
    /// Build the clause. Unpublished notes match only with `include_private`.
    pub fn build(filter: &NoteFilter, include_private: bool) -> Self {
        let mut conditions: Vec<String> = Vec::new();
        let mut params = Vec::new();

        if !include_private {
            conditions.push("published = TRUE".to_string());
        }
        if let Some(user_id) = filter.user_id {
            params.push(NoteQueryParam::Uuid(user_id));
            conditions.push(format!("author_id = ${}", params.len()));
        }
        if let Some(search) = filter.search() {
            params.push(NoteQueryParam::String(search.to_string()));
            conditions.push(format!(
                "search_vector @@ plainto_tsquery('simple'::regconfig, ${})",
                params.len()
            ));
        }

        let sql = if conditions.is_empty() {
            "TRUE".to_string()
        } else {
            conditions.join(" AND ")
        };
        Self { sql, params }
    }

    /// Index of the next free bind parameter.
    pub fn next_param(&self) -> usize {
        self.params.len() + 1
    }
}

fn bind_params<'q>(
    mut q: sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>,
    params: &'q [NoteQueryParam],
) -> sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments> {
    for param in params {
        q = match param {
            NoteQueryParam::Uuid(id) => q.bind(id),
            NoteQueryParam::String(s) => q.bind(s),
        };
    }
    q
}

fn note_from_row(row: &PgRow) -> Result<Note> {
    let meta: Json<NoteMeta> = row.try_get("meta").map_err(Error::Database)?;
    Ok(Note {
        id: row.try_get("id").map_err(Error::Database)?,
        author_id: row.try_get("author_id").map_err(Error::Database)?,
        content: row.try_get::<JsonValue, _>("content").map_err(Error::Database)?,
        meta: meta.0,
        created_at: row.try_get("created_at").map_err(Error::Database)?,
        updated_at: row.try_get("updated_at").map_err(Error::Database)?,
        views: row.try_get("views").map_err(Error::Database)?,
        likes: row.try_get("likes").map_err(Error::Database)?,
    })
}

/// PostgreSQL implementation of NoteRepository.
pub struct PgNoteRepository {
    pool: Pool<Postgres>,
}

impl PgNoteRepository {
    /// Create a new PgNoteRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn list(&self, filter: &NoteFilter, include_private: bool) -> Result<Vec<Note>> {
        let clause = NoteFilterClause::build(filter, include_private);
        let (limit, offset) = filter.limit_offset();
        let limit_idx = clause.next_param();

        let query = format!(
            "SELECT {NOTE_COLUMNS} FROM note WHERE {} ORDER BY created_at DESC, id LIMIT ${} OFFSET ${}",
            clause.sql,
            limit_idx,
            limit_idx + 1
        );

        let rows = bind_params(sqlx::query(&query), &clause.params)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "note_repository",
            op = "list",
            result_count = rows.len(),
            "Listed notes"
        );

        rows.iter().map(note_from_row).collect()
    }

    async fn count(&self, filter: &NoteFilter, include_private: bool) -> Result<i64> {
        let clause = NoteFilterClause::build(filter, include_private);
        let query = format!("SELECT COUNT(*) FROM note WHERE {}", clause.sql);

        let row = bind_params(sqlx::query(&query), &clause.params)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.try_get::<i64, _>(0).map_err(Error::Database)
    }

    async fn get(&self, id: &str, caller: Option<Uuid>) -> Result<Option<Note>> {
        let query = format!(
            "SELECT {NOTE_COLUMNS} FROM note WHERE id = $1 AND (published OR author_id = $2)"
        );
        let row = sqlx::query(&query)
            .bind(id)
            .bind(caller)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.as_ref().map(note_from_row).transpose()
    }

    async fn insert(&self, note: &Note) -> Result<Note> {
        let query = format!(
            "INSERT INTO note (id, author_id, content, meta, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $5)
             RETURNING {NOTE_COLUMNS}"
        );
        let row = sqlx::query(&query)
            .bind(&note.id)
            .bind(note.author_id)
            .bind(&note.content)
            .bind(Json(&note.meta))
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match Error::Database(e) {
                err if err.is_unique_violation() => {
                    Error::Conflict(format!("note {} already exists", note.id))
                }
                err => err,
            })?;

        info!(
            subsystem = "db",
            component = "note_repository",
            op = "insert",
            note_id = %note.id,
            user_id = %note.author_id,
            "Note created"
        );
        note_from_row(&row)
    }

    async fn update(&self, note: &Note) -> Result<Option<Note>> {
        let query = format!(
            "UPDATE note SET content = $3, meta = $4, updated_at = $5
             WHERE id = $1 AND author_id = $2
             RETURNING {NOTE_COLUMNS}"
        );
        let row = sqlx::query(&query)
            .bind(&note.id)
            .bind(note.author_id)
            .bind(&note.content)
            .bind(Json(&note.meta))
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.as_ref().map(note_from_row).transpose()
    }

    async fn bulk_upsert(&self, notes: &[Note]) -> Result<Vec<String>> {
        if notes.is_empty() {
            return Ok(Vec::new());
        }

        let now = Utc::now();
        let mut written = Vec::with_capacity(notes.len());
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        for note in notes {
            // Rows owned by another author fail the WHERE guard and return nothing.
            let row = sqlx::query(
                "INSERT INTO note (id, author_id, content, meta, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $5)
                 ON CONFLICT (id) DO UPDATE
                 SET content = EXCLUDED.content,
                     meta = EXCLUDED.meta,
                     updated_at = EXCLUDED.updated_at
                 WHERE note.author_id = EXCLUDED.author_id
                 RETURNING id",
            )
            .bind(&note.id)
            .bind(note.author_id)
            .bind(&note.content)
            .bind(Json(&note.meta))
            .bind(now)
            .fetch_optional(&mut *tx)
            .await
            .map_err(Error::Database)?;

            if let Some(row) = row {
                written.push(row.try_get::<String, _>("id").map_err(Error::Database)?);
            }
        }

        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "note_repository",
            op = "bulk_upsert",
            batch_size = notes.len(),
            result_count = written.len(),
            "Notes upserted"
        );
        Ok(written)
    }
}
