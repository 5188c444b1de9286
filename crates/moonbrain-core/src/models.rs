//! Core data models for moonbrain.
//!
//! These types are shared across all moonbrain crates and represent the
//! core domain entities. JSON field names are camelCase to match the
//! clients that publish notes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::defaults::{PAGE_LIMIT, PAGE_OFFSET};

// =============================================================================
// NOTE TYPES
// =============================================================================

/// A heading extracted from note content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct NoteHeading {
    #[serde(default, deserialize_with = "null_as_default")]
    pub level: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
}

/// A link from a note to an article or external resource.
///
/// Links to other notes use the `id:<note-id>` URL form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct NoteLink {
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

/// Coarse note category.
///
/// Categories are free-form on the wire. Values outside the known set are
/// kept verbatim in `Other` so they round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NoteCategory {
    Article,
    Book,
    Schedule,
    Other(String),
}

impl From<String> for NoteCategory {
    fn from(value: String) -> Self {
        match value.as_str() {
            "article" => Self::Article,
            "book" => Self::Book,
            "schedule" => Self::Schedule,
            _ => Self::Other(value),
        }
    }
}

impl From<NoteCategory> for String {
    fn from(category: NoteCategory) -> Self {
        match category {
            NoteCategory::Article => "article".to_string(),
            NoteCategory::Book => "book".to_string(),
            NoteCategory::Schedule => "schedule".to_string(),
            NoteCategory::Other(value) => value,
        }
    }
}

/// Metadata attached to a note.
///
/// Clients send `null` for empty lists and flags; those read as the
/// field's default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoteMeta {
    pub preview_img: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<String>)]
    pub category: Option<NoteCategory>,
    pub headings: Option<Vec<NoteHeading>>,
    pub linked_articles: Option<Vec<NoteLink>>,
    /// Visibility to users other than the author.
    #[serde(default, deserialize_with = "null_as_default")]
    pub published: bool,
    pub external_links: Option<Vec<NoteLink>>,
    pub startup: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// A stored note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub author_id: Uuid,
    /// Parsed document tree as produced by the publishing client.
    #[schema(value_type = Object)]
    pub content: JsonValue,
    pub meta: NoteMeta,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub views: i32,
    pub likes: i32,
}

/// A note as submitted by a client for create, update, or bulk upsert.
///
/// The author is always taken from the authenticated caller, never from
/// the payload. A missing `id` deserializes to an empty string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpsertNoteRequest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub content: JsonValue,
    #[serde(default)]
    pub meta: NoteMeta,
}

impl UpsertNoteRequest {
    /// Build the stored form of this note for `author_id` at `now`.
    pub fn into_note(self, author_id: Uuid, now: DateTime<Utc>) -> Note {
        Note {
            id: self.id,
            author_id,
            content: self.content,
            meta: self.meta,
            created_at: now,
            updated_at: now,
            views: 0,
            likes: 0,
        }
    }
}

/// A note as exposed to API consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PublicNote {
    pub id: String,
    pub author: PublicUser,
    #[schema(value_type = Object)]
    pub content: JsonValue,
    pub meta: NoteMeta,
}

impl PublicNote {
    pub fn from_note(note: Note, author: PublicUser) -> Self {
        Self {
            id: note.id,
            author,
            content: note.content,
            meta: note.meta,
        }
    }
}

/// Filter for listing notes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteFilter {
    /// Restrict to notes authored by this user.
    pub user_id: Option<Uuid>,
    /// Full-text query over title, description, and tags.
    pub search_text: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl NoteFilter {
    /// Page window with defaults applied (`limit = 10`, `offset = 0`).
    pub fn limit_offset(&self) -> (i64, i64) {
        (
            self.limit.unwrap_or(PAGE_LIMIT),
            self.offset.unwrap_or(PAGE_OFFSET),
        )
    }

    /// Search text, if present and non-blank.
    pub fn search(&self) -> Option<&str> {
        self.search_text
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

// =============================================================================
// PAGINATION
// =============================================================================

/// Pagination metadata returned alongside list data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
    pub total: i64,
}

/// One page of results plus the total count across all pages.
#[derive(Debug, Clone, PartialEq)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

// =============================================================================
// USER TYPES
// =============================================================================

/// A stored user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub provider: String,
    pub email: String,
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub nick_name: String,
    pub external_id: String,
    pub avatar_url: String,
    /// Session bearer token issued at the last login.
    #[serde(skip_serializing)]
    pub token: Option<String>,
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
    pub token_expiration: Option<DateTime<Utc>>,
    pub profile_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Identity reported by an OAuth provider at login.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserProfile {
    pub provider: String,
    pub email: String,
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub nick_name: String,
    pub external_id: String,
    pub avatar_url: String,
    pub refresh_token: Option<String>,
    pub token_expiration: Option<DateTime<Utc>>,
    pub profile_url: String,
}

/// A user as exposed to API consumers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    /// Provider-side user id.
    pub id: String,
    pub name: String,
    pub nick_name: String,
    pub avatar_url: String,
    pub email: String,
    pub profile_url: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.external_id.clone(),
            name: user.name.clone(),
            nick_name: user.nick_name.clone(),
            avatar_url: user.avatar_url.clone(),
            email: user.email.clone(),
            profile_url: user.profile_url.clone(),
        }
    }
}

/// An additional bearer token created by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiToken {
    pub id: Uuid,
    pub token: String,
    pub permissions: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// NOTE GRAPH TYPES
// =============================================================================

/// A note in a user's note graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct GraphNoteNode {
    pub id: String,
    pub title: String,
    /// Number of articles the note links to.
    pub weight: i32,
}

/// A directed edge between two notes, unique per `(source, target)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
pub struct GraphNoteLink {
    pub source: String,
    pub target: String,
}

/// Per-user link structure between notes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct NoteGraph {
    #[serde(default)]
    pub nodes: Vec<GraphNoteNode>,
    #[serde(default)]
    pub links: Vec<GraphNoteLink>,
}

/// A node and the links derived from it, merged into a graph as one update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNodeLinks {
    pub node: GraphNoteNode,
    pub links: Vec<GraphNoteLink>,
}
