//! Note HTTP handlers.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use moonbrain_core::{NoteFilter, NoteGraph, PublicNote, UpsertNoteRequest};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extractors::{Auth, RequireAuth};
use crate::response::DataResponse;
use crate::services::UploadedFile;
use crate::state::AppState;

/// Query string of `GET /v1/notes`.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListNotesQuery {
    /// Only notes by this author. Private notes are included when this is
    /// the caller's own id.
    pub user_id: Option<Uuid>,
    /// Full-text search over title, description, and tags.
    pub search_text: Option<String>,
    /// Page size, default 10.
    pub limit: Option<i64>,
    /// Page offset, default 0.
    pub offset: Option<i64>,
}

impl ListNotesQuery {
    pub fn into_filter(self) -> Result<NoteFilter, ApiError> {
        if self.limit.is_some_and(|l| l < 1) {
            return Err(ApiError::BadRequest("limit must be at least 1".to_string()));
        }
        if self.offset.is_some_and(|o| o < 0) {
            return Err(ApiError::BadRequest("offset must not be negative".to_string()));
        }
        Ok(NoteFilter {
            user_id: self.user_id,
            search_text: self.search_text,
            limit: self.limit,
            offset: self.offset,
        })
    }
}

/// Counts reported by a bulk upsert.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct BulkUpsertSummary {
    pub upserted: usize,
    pub skipped: usize,
    pub images: usize,
}

/// List notes.
///
/// GET /v1/notes
#[utoipa::path(get, path = "/v1/notes", tag = "Notes",
    params(ListNotesQuery),
    responses((status = 200, description = "Page of notes with pagination meta")))]
pub async fn list_notes(
    State(state): State<AppState>,
    auth: Auth,
    query: Result<Query<ListNotesQuery>, QueryRejection>,
) -> Result<DataResponse<Vec<PublicNote>>, ApiError> {
    let Query(query) =
        query.map_err(|_| ApiError::BadRequest("Incorrect input query".to_string()))?;
    let filter = query.into_filter()?;

    let page = state
        .notes
        .get_notes(&filter, auth.user.as_ref())
        .await
        .map_err(|e| ApiError::with_message(e, "Couldn't get notes, something went wrong"))?;
    Ok(page.into())
}

/// Get a note visible to the caller.
///
/// GET /v1/notes/:id
#[utoipa::path(get, path = "/v1/notes/{id}", tag = "Notes",
    params(("id" = String, Path, description = "Note id")),
    responses(
        (status = 200, description = "Note", body = PublicNote),
        (status = 404, description = "Not found or not visible")))]
pub async fn get_note(
    State(state): State<AppState>,
    auth: Auth,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let note = state
        .notes
        .get_note(&id, auth.user.as_ref())
        .await
        .map_err(|e| ApiError::with_message(e, "Couldn't get note, something went wrong"))?;

    Ok(match note {
        Some(note) => DataResponse::new(note).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            DataResponse::<Option<PublicNote>>::new(None),
        )
            .into_response(),
    })
}

/// Create a single note owned by the caller.
///
/// POST /v1/notes
#[utoipa::path(post, path = "/v1/notes", tag = "Notes",
    request_body = UpsertNoteRequest,
    responses(
        (status = 201, description = "Created", body = PublicNote),
        (status = 400, description = "Missing id or malformed body"),
        (status = 409, description = "Note id already exists")))]
pub async fn create_note(
    State(state): State<AppState>,
    RequireAuth { user }: RequireAuth,
    body: Result<Json<UpsertNoteRequest>, JsonRejection>,
) -> Result<(StatusCode, DataResponse<PublicNote>), ApiError> {
    let Json(req) = body.map_err(|_| ApiError::BadRequest("Can't parse body".to_string()))?;

    let note = state
        .notes
        .create_note(req, &user)
        .await
        .map_err(|e| ApiError::with_message(e, "Can't create note:("))?;
    Ok((StatusCode::CREATED, DataResponse::new(note)))
}

/// Replace content and meta of one of the caller's notes.
///
/// PUT /v1/notes/:id
#[utoipa::path(put, path = "/v1/notes/{id}", tag = "Notes",
    params(("id" = String, Path, description = "Note id")),
    request_body = UpsertNoteRequest,
    responses(
        (status = 200, description = "Updated", body = PublicNote),
        (status = 404, description = "Not found or not owned by the caller")))]
pub async fn update_note(
    State(state): State<AppState>,
    RequireAuth { user }: RequireAuth,
    Path(id): Path<String>,
    body: Result<Json<UpsertNoteRequest>, JsonRejection>,
) -> Result<DataResponse<PublicNote>, ApiError> {
    let Json(req) = body.map_err(|_| ApiError::BadRequest("Can't parse body".to_string()))?;

    state
        .notes
        .update_note(&id, req, &user)
        .await
        .map_err(|e| ApiError::with_message(e, "Can't update note"))?
        .map(DataResponse::new)
        .ok_or_else(|| ApiError::NotFound("Note not found".to_string()))
}

/// Upsert notes and upload images from a multipart form.
///
/// PUT /v1/notes/bulk-upsert
///
/// Notes that fail to decode are skipped.
///
/// # Multipart Fields
/// - `notes`: one JSON note per field (repeatable, at least one required)
/// - `files`: image stored under its sanitized file name (repeatable)
#[utoipa::path(put, path = "/v1/notes/bulk-upsert", tag = "Notes",
    responses((status = 200, description = "Upserted", body = BulkUpsertSummary)))]
pub async fn bulk_upsert_notes(
    State(state): State<AppState>,
    RequireAuth { user }: RequireAuth,
    multipart: Result<Multipart, axum::extract::multipart::MultipartRejection>,
) -> Result<DataResponse<BulkUpsertSummary>, ApiError> {
    let malformed = || ApiError::BadRequest("Can't parse multipart form data".to_string());
    let mut multipart = multipart.map_err(|_| malformed())?;

    let mut notes = Vec::new();
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(|_| malformed())? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("notes") => {
                let text = field.text().await.map_err(|_| malformed())?;
                match serde_json::from_str::<UpsertNoteRequest>(&text) {
                    Ok(note) => notes.push(note),
                    Err(e) => warn!(
                        subsystem = "api",
                        component = "notes",
                        op = "bulk_upsert",
                        error = %e,
                        "Skipping note that failed to decode"
                    ),
                }
            }
            Some("files") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|_| malformed())?;
                files.push(UploadedFile { file_name, bytes });
            }
            _ => {}
        }
    }

    if notes.is_empty() {
        return Err(ApiError::BadRequest("Notes doesn't provided".to_string()));
    }

    let outcome = state
        .notes
        .bulk_upsert(notes, &user)
        .await
        .map_err(|e| ApiError::with_message(e, "Can't create notes"))?;

    let images = state
        .notes
        .upload_images(files)
        .await
        .map_err(|e| ApiError::with_message(e, "Can't upload images"))?;

    Ok(DataResponse::new(BulkUpsertSummary {
        upserted: outcome.upserted,
        skipped: outcome.skipped,
        images,
    }))
}

/// The caller's note graph.
///
/// GET /v1/notes/graph
#[utoipa::path(get, path = "/v1/notes/graph", tag = "Notes",
    responses((status = 200, description = "Note graph", body = NoteGraph)))]
pub async fn note_graph(
    State(state): State<AppState>,
    RequireAuth { user }: RequireAuth,
) -> Result<DataResponse<NoteGraph>, ApiError> {
    let graph = state
        .users
        .note_graph(&user)
        .await
        .map_err(|e| ApiError::with_message(e, "Couldn't get note graph"))?;
    Ok(DataResponse::new(graph))
}
