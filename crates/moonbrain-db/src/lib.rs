//! # moonbrain-db
//!
//! PostgreSQL database layer for moonbrain.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for notes, tags, and users
//! - Full-text note search with a PostgreSQL tsvector column
//! - Atomic per-user note graph merges
//!
//! ## Example
//!
//! ```rust,ignore
//! use moonbrain_db::{Database, NoteFilter, NoteRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/moonbrain").await?;
//!     db.migrate().await?;
//!
//!     let notes = db.notes.list(&NoteFilter::default(), false).await?;
//!     println!("{} published notes on the first page", notes.len());
//!     Ok(())
//! }
//! ```
pub mod notes;
pub mod pool;
pub mod tags;
pub mod users;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use moonbrain_core::*;

pub use notes::{NoteFilterClause, NoteQueryParam, PgNoteRepository};
pub use pool::{PoolConfig, PoolHealth};
pub use tags::PgTagRepository;
pub use users::PgUserRepository;

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    pub notes: PgNoteRepository,
    pub tags: PgTagRepository,
    /// Users, API tokens, and note graphs.
    pub users: PgUserRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            notes: PgNoteRepository::new(pool.clone()),
            tags: PgTagRepository::new(pool.clone()),
            users: PgUserRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PoolConfig::default().connect(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = config.connect(url).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}
