//! Core traits for moonbrain storage abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, so services can run against PostgreSQL or test doubles.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// NOTE REPOSITORY
// =============================================================================

/// Repository for note storage.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// List one page of notes matching `filter`, newest first.
    ///
    /// Unpublished notes are included only when `include_private` is set.
    async fn list(&self, filter: &NoteFilter, include_private: bool) -> Result<Vec<Note>>;

    /// Count all notes matching `filter`, ignoring the page window.
    async fn count(&self, filter: &NoteFilter, include_private: bool) -> Result<i64>;

    /// Get a note visible to `caller`: published, or authored by the caller.
    async fn get(&self, id: &str, caller: Option<Uuid>) -> Result<Option<Note>>;

    /// Insert a single new note. Fails on a duplicate id.
    async fn insert(&self, note: &Note) -> Result<Note>;

    /// Replace content and meta of a note owned by `note.author_id`.
    ///
    /// Returns `None` when no such note exists for that author.
    async fn update(&self, note: &Note) -> Result<Option<Note>>;

    /// Insert or update notes keyed by id in one batch.
    ///
    /// `created_at` is written only on insert, and notes owned by another
    /// author are left untouched. Returns the ids of the notes written.
    async fn bulk_upsert(&self, notes: &[Note]) -> Result<Vec<String>>;
}

// =============================================================================
// TAG REPOSITORY
// =============================================================================

/// Repository for the global tag set.
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// All tag names, sorted.
    async fn list_all(&self) -> Result<Vec<String>>;

    /// Add tag names to the set. Existing names are ignored.
    async fn bulk_upsert(&self, tags: &[String]) -> Result<()>;
}

// =============================================================================
// USER REPOSITORY
// =============================================================================

/// Repository for users, their API tokens, and their note graphs.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create or update the user keyed by `(email, provider)` and store a new
    /// session token.
    async fn create_or_update(&self, profile: &UserProfile, session_token: &str) -> Result<User>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Batch lookup. Unknown ids are omitted from the result.
    async fn get_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>>;

    /// Resolve a bearer token, matching either the session token or any API
    /// token.
    async fn find_by_token(&self, token: &str) -> Result<Option<User>>;

    /// Invalidate the user's session token.
    async fn clear_session_token(&self, user_id: Uuid) -> Result<()>;

    async fn list_api_tokens(&self, user_id: Uuid) -> Result<Vec<ApiToken>>;

    async fn create_api_token(
        &self,
        user_id: Uuid,
        token: &str,
        permissions: &str,
    ) -> Result<ApiToken>;

    /// Delete one of the user's API tokens. Returns `false` if it did not
    /// exist or belongs to someone else.
    async fn delete_api_token(&self, user_id: Uuid, token_id: Uuid) -> Result<bool>;

    /// The user's note graph. Empty when the user has none yet.
    async fn get_note_graph(&self, user_id: Uuid) -> Result<NoteGraph>;

    /// Merge a node and its links into the user's note graph atomically.
    async fn upsert_graph_node(&self, user_id: Uuid, update: &GraphNodeLinks) -> Result<()>;
}
