//! Service for note reads, writes, and the background graph updates they
//! trigger.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use chrono::Utc;
use moonbrain_core::{
    graph_update_for_note, sanitize_filename, Error, Note, NoteFilter, NoteRepository,
    Paginated, Pagination, PublicNote, PublicUser, Result, UpsertNoteRequest, User,
};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use super::{TagService, UserService};

/// An image received with a bulk upsert.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Bytes,
}

/// Result of a bulk upsert.
///
/// Graph updates run detached; dropping the handles does not cancel them.
#[derive(Debug)]
pub struct BulkUpsertOutcome {
    pub upserted: usize,
    pub skipped: usize,
    pub graph_updates: Vec<JoinHandle<()>>,
}

#[derive(Clone)]
pub struct NoteService {
    notes: Arc<dyn NoteRepository>,
    users: UserService,
    tags: TagService,
    media_path: PathBuf,
}

impl NoteService {
    pub fn new(
        notes: Arc<dyn NoteRepository>,
        users: UserService,
        tags: TagService,
        media_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            notes,
            users,
            tags,
            media_path: media_path.into(),
        }
    }

    /// One page of notes plus the total count for the same filter.
    ///
    /// Private notes are included only when `caller` asks for their own.
    pub async fn get_notes(
        &self,
        filter: &NoteFilter,
        caller: Option<&User>,
    ) -> Result<Paginated<PublicNote>> {
        let start = Instant::now();
        let include_private = matches!(
            (caller, filter.user_id),
            (Some(caller), Some(user_id)) if caller.id == user_id
        );

        let notes = self
            .notes
            .list(filter, include_private)
            .await
            .map_err(|e| e.context("note service: get notes"))?;
        let total = self
            .notes
            .count(filter, include_private)
            .await
            .map_err(|e| e.context("note service: count notes"))?;
        let data = self.with_authors(notes).await?;

        let (limit, offset) = filter.limit_offset();
        debug!(
            subsystem = "service",
            component = "note_service",
            op = "get_notes",
            query = filter.search().unwrap_or(""),
            result_count = data.len(),
            total,
            duration_ms = start.elapsed().as_millis() as u64,
            "Listed notes"
        );

        Ok(Paginated {
            data,
            pagination: Pagination {
                limit,
                offset,
                total,
            },
        })
    }

    pub async fn get_note(&self, id: &str, caller: Option<&User>) -> Result<Option<PublicNote>> {
        let Some(note) = self
            .notes
            .get(id, caller.map(|u| u.id))
            .await
            .map_err(|e| e.context("note service: get note"))?
        else {
            return Ok(None);
        };

        let author = self
            .users
            .public_user(note.author_id)
            .await?
            .unwrap_or_default();
        Ok(Some(PublicNote::from_note(note, author)))
    }

    /// Insert a single new note owned by `author`.
    pub async fn create_note(&self, req: UpsertNoteRequest, author: &User) -> Result<PublicNote> {
        if req.id.trim().is_empty() {
            return Err(Error::InvalidInput("Note id is empty".to_string()));
        }

        let note = req.into_note(author.id, Utc::now());
        let stored = self
            .notes
            .insert(&note)
            .await
            .map_err(|e| e.context("note service: create note"))?;

        self.tags.upsert(&stored.meta.tags).await?;
        self.spawn_graph_update(author.id, &stored);
        Ok(PublicNote::from_note(stored, PublicUser::from(author)))
    }

    /// Replace content and meta of a note owned by `author`.
    pub async fn update_note(
        &self,
        id: &str,
        mut req: UpsertNoteRequest,
        author: &User,
    ) -> Result<Option<PublicNote>> {
        req.id = id.to_string();
        let note = req.into_note(author.id, Utc::now());

        let Some(stored) = self
            .notes
            .update(&note)
            .await
            .map_err(|e| e.context("note service: update note"))?
        else {
            return Ok(None);
        };

        self.tags.upsert(&stored.meta.tags).await?;
        self.spawn_graph_update(author.id, &stored);
        Ok(Some(PublicNote::from_note(stored, PublicUser::from(author))))
    }

    /// Upsert notes for `author`, skipping those without an id.
    ///
    /// Notes whose id belongs to another author are left untouched by the
    /// repository and count as skipped. Tags of the written notes are added to
    /// the tag set, and a graph update is spawned for each written note
    /// without waiting for it.
    pub async fn bulk_upsert(
        &self,
        reqs: Vec<UpsertNoteRequest>,
        author: &User,
    ) -> Result<BulkUpsertOutcome> {
        let submitted = reqs.len();
        let now = Utc::now();
        let notes: Vec<Note> = reqs
            .into_iter()
            .filter(|req| {
                let keep = !req.id.trim().is_empty();
                if !keep {
                    trace!(
                        subsystem = "service",
                        component = "note_service",
                        "Skipping note without id"
                    );
                }
                keep
            })
            .map(|req| req.into_note(author.id, now))
            .collect();

        let written: HashSet<String> = if notes.is_empty() {
            HashSet::new()
        } else {
            self.notes
                .bulk_upsert(&notes)
                .await
                .map_err(|e| e.context("note service: bulk create or update"))?
                .into_iter()
                .collect()
        };

        let (upserted, foreign): (Vec<Note>, Vec<Note>) = notes
            .into_iter()
            .partition(|note| written.contains(&note.id));
        for note in &foreign {
            debug!(
                subsystem = "service",
                component = "note_service",
                op = "bulk_upsert",
                note_id = %note.id,
                user_id = %author.id,
                "Skipping note owned by another author"
            );
        }

        if !upserted.is_empty() {
            self.tags
                .upsert(upserted.iter().flat_map(|n| n.meta.tags.iter()))
                .await?;
        }

        let graph_updates = upserted
            .iter()
            .map(|note| self.spawn_graph_update(author.id, note))
            .collect();

        info!(
            subsystem = "service",
            component = "note_service",
            op = "bulk_upsert",
            user_id = %author.id,
            batch_size = submitted,
            result_count = upserted.len(),
            "Bulk upsert complete"
        );

        Ok(BulkUpsertOutcome {
            upserted: upserted.len(),
            skipped: submitted - upserted.len(),
            graph_updates,
        })
    }

    /// Merge the note's node and links into the author's graph in the
    /// background. Failures are logged and not retried.
    pub fn spawn_graph_update(&self, user_id: Uuid, note: &Note) -> JoinHandle<()> {
        let users = self.users.repository();
        let update = graph_update_for_note(note);

        tokio::spawn(async move {
            if let Err(e) = users.upsert_graph_node(user_id, &update).await {
                warn!(
                    subsystem = "service",
                    component = "note_service",
                    op = "upsert_graph_node",
                    user_id = %user_id,
                    note_id = %update.node.id,
                    error = %e,
                    "Note graph update failed"
                );
            }
        })
    }

    /// Write uploaded images to the media directory.
    ///
    /// Files with unusable names or failed writes are logged and skipped.
    /// Returns the number of files written.
    pub async fn upload_images(&self, files: Vec<UploadedFile>) -> Result<usize> {
        if files.is_empty() {
            return Ok(0);
        }

        tokio::fs::create_dir_all(&self.media_path)
            .await
            .map_err(|e| Error::Io(e).context("note service: create media directory"))?;

        let mut saved = 0;
        for file in files {
            let Some(name) = sanitize_filename(&file.file_name) else {
                warn!(
                    subsystem = "service",
                    component = "note_service",
                    file_name = %file.file_name,
                    "Skipping image with unusable file name"
                );
                continue;
            };

            match tokio::fs::write(self.media_path.join(&name), &file.bytes).await {
                Ok(()) => saved += 1,
                Err(e) => warn!(
                    subsystem = "service",
                    component = "note_service",
                    file_name = %name,
                    error = %e,
                    "Failed to save image"
                ),
            }
        }
        Ok(saved)
    }

    /// Attach public author profiles, resolved in one batch.
    async fn with_authors(&self, notes: Vec<Note>) -> Result<Vec<PublicNote>> {
        let mut author_ids: Vec<Uuid> = notes.iter().map(|n| n.author_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();

        let authors = self.users.public_users(&author_ids).await?;
        Ok(notes
            .into_iter()
            .map(|note| {
                let author = authors.get(&note.author_id).cloned().unwrap_or_default();
                PublicNote::from_note(note, author)
            })
            .collect())
    }
}
