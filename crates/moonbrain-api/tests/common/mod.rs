//! In-memory repositories and a scripted OAuth provider for router tests.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::Router;
use chrono::Utc;
use serde_json::Value;
use tempfile::TempDir;
use uuid::Uuid;

use moonbrain_api::oauth::OAuthProvider;
use moonbrain_api::{build_router, AppState, Config};
use moonbrain_core::{
    merge_links, merge_nodes, ApiToken, Error, GraphNodeLinks, Note, NoteFilter, NoteGraph,
    NoteRepository, Result, TagRepository, User, UserProfile, UserRepository,
};

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryNotes {
    pub notes: Mutex<HashMap<String, Note>>,
}

impl MemoryNotes {
    fn matching(&self, filter: &NoteFilter, include_private: bool) -> Vec<Note> {
        let search = filter.search().map(str::to_lowercase);
        let mut notes: Vec<Note> = self
            .notes
            .lock()
            .unwrap()
            .values()
            .filter(|n| include_private || n.meta.published)
            .filter(|n| filter.user_id.map_or(true, |id| n.author_id == id))
            .filter(|n| match &search {
                Some(q) => {
                    let title = n.meta.title.as_deref().unwrap_or("").to_lowercase();
                    let description = n.meta.description.as_deref().unwrap_or("").to_lowercase();
                    title.contains(q)
                        || description.contains(q)
                        || n.meta.tags.iter().any(|t| t.to_lowercase() == *q)
                }
                None => true,
            })
            .cloned()
            .collect();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        notes
    }
}

#[async_trait]
impl NoteRepository for MemoryNotes {
    async fn list(&self, filter: &NoteFilter, include_private: bool) -> Result<Vec<Note>> {
        let (limit, offset) = filter.limit_offset();
        Ok(self
            .matching(filter, include_private)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count(&self, filter: &NoteFilter, include_private: bool) -> Result<i64> {
        Ok(self.matching(filter, include_private).len() as i64)
    }

    async fn get(&self, id: &str, caller: Option<Uuid>) -> Result<Option<Note>> {
        Ok(self
            .notes
            .lock()
            .unwrap()
            .get(id)
            .filter(|n| n.meta.published || Some(n.author_id) == caller)
            .cloned())
    }

    async fn insert(&self, note: &Note) -> Result<Note> {
        let mut notes = self.notes.lock().unwrap();
        if notes.contains_key(&note.id) {
            return Err(Error::Conflict(format!("note {} already exists", note.id)));
        }
        notes.insert(note.id.clone(), note.clone());
        Ok(note.clone())
    }

    async fn update(&self, note: &Note) -> Result<Option<Note>> {
        let mut notes = self.notes.lock().unwrap();
        match notes.get_mut(&note.id) {
            Some(stored) if stored.author_id == note.author_id => {
                stored.content = note.content.clone();
                stored.meta = note.meta.clone();
                stored.updated_at = Utc::now();
                Ok(Some(stored.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn bulk_upsert(&self, batch: &[Note]) -> Result<Vec<String>> {
        let mut notes = self.notes.lock().unwrap();
        let mut written = Vec::new();
        for note in batch {
            match notes.get_mut(&note.id) {
                Some(stored) if stored.author_id != note.author_id => continue,
                Some(stored) => {
                    stored.content = note.content.clone();
                    stored.meta = note.meta.clone();
                    stored.updated_at = note.updated_at;
                }
                None => {
                    notes.insert(note.id.clone(), note.clone());
                }
            }
            written.push(note.id.clone());
        }
        Ok(written)
    }
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryTags {
    pub tags: Mutex<BTreeSet<String>>,
}

#[async_trait]
impl TagRepository for MemoryTags {
    async fn list_all(&self) -> Result<Vec<String>> {
        Ok(self.tags.lock().unwrap().iter().cloned().collect())
    }

    async fn bulk_upsert(&self, tags: &[String]) -> Result<()> {
        self.tags.lock().unwrap().extend(tags.iter().cloned());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryUsers {
    pub users: Mutex<Vec<User>>,
    pub api_tokens: Mutex<Vec<(Uuid, ApiToken)>>,
    pub graphs: Mutex<HashMap<Uuid, NoteGraph>>,
}

impl MemoryUsers {
    pub fn graph(&self, user_id: Uuid) -> NoteGraph {
        self.graphs
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl UserRepository for MemoryUsers {
    async fn create_or_update(&self, profile: &UserProfile, session_token: &str) -> Result<User> {
        let mut users = self.users.lock().unwrap();
        let now = Utc::now();
        if let Some(user) = users
            .iter_mut()
            .find(|u| u.email == profile.email && u.provider == profile.provider)
        {
            user.name = profile.name.clone();
            user.nick_name = profile.nick_name.clone();
            user.avatar_url = profile.avatar_url.clone();
            user.profile_url = profile.profile_url.clone();
            user.token = Some(session_token.to_string());
            user.updated_at = now;
            return Ok(user.clone());
        }

        let user = User {
            id: Uuid::now_v7(),
            provider: profile.provider.clone(),
            email: profile.email.clone(),
            name: profile.name.clone(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            nick_name: profile.nick_name.clone(),
            external_id: profile.external_id.clone(),
            avatar_url: profile.avatar_url.clone(),
            token: Some(session_token.to_string()),
            refresh_token: profile.refresh_token.clone(),
            token_expiration: profile.token_expiration,
            profile_url: profile.profile_url.clone(),
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn get_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<User>> {
        let owner = self
            .api_tokens
            .lock()
            .unwrap()
            .iter()
            .find(|(_, t)| t.token == token)
            .map(|(user_id, _)| *user_id);
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.token.as_deref() == Some(token) || Some(u.id) == owner)
            .cloned())
    }

    async fn clear_session_token(&self, user_id: Uuid) -> Result<()> {
        if let Some(user) = self
            .users
            .lock()
            .unwrap()
            .iter_mut()
            .find(|u| u.id == user_id)
        {
            user.token = None;
        }
        Ok(())
    }

    async fn list_api_tokens(&self, user_id: Uuid) -> Result<Vec<ApiToken>> {
        Ok(self
            .api_tokens
            .lock()
            .unwrap()
            .iter()
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, t)| t.clone())
            .collect())
    }

    async fn create_api_token(
        &self,
        user_id: Uuid,
        token: &str,
        permissions: &str,
    ) -> Result<ApiToken> {
        let api_token = ApiToken {
            id: Uuid::now_v7(),
            token: token.to_string(),
            permissions: permissions.to_string(),
            created_at: Utc::now(),
        };
        self.api_tokens
            .lock()
            .unwrap()
            .push((user_id, api_token.clone()));
        Ok(api_token)
    }

    async fn delete_api_token(&self, user_id: Uuid, token_id: Uuid) -> Result<bool> {
        let mut tokens = self.api_tokens.lock().unwrap();
        let before = tokens.len();
        tokens.retain(|(owner, t)| !(*owner == user_id && t.id == token_id));
        Ok(tokens.len() != before)
    }

    async fn get_note_graph(&self, user_id: Uuid) -> Result<NoteGraph> {
        Ok(self.graph(user_id))
    }

    async fn upsert_graph_node(&self, user_id: Uuid, update: &GraphNodeLinks) -> Result<()> {
        let mut graphs = self.graphs.lock().unwrap();
        let graph = graphs.entry(user_id).or_default();
        graph.nodes = merge_nodes(&graph.nodes, update.node.clone());
        graph.links = merge_links(&graph.links, &update.links);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// OAuth
// ---------------------------------------------------------------------------

pub const GOOD_CODE: &str = "good-code";

/// Accepts only [`GOOD_CODE`] and always returns the same GitHub profile.
pub struct FakeGitHub;

#[async_trait]
impl OAuthProvider for FakeGitHub {
    fn authorize_url(&self, state: &str) -> String {
        format!("https://github.test/login/oauth/authorize?state={state}")
    }

    async fn exchange_code(&self, code: &str) -> Result<String> {
        if code == GOOD_CODE {
            Ok("gh-access-token".to_string())
        } else {
            Err(Error::Request("bad_verification_code".to_string()))
        }
    }

    async fn fetch_profile(&self, _access_token: &str) -> Result<UserProfile> {
        Ok(github_profile("ada@example.com"))
    }
}

pub fn github_profile(email: &str) -> UserProfile {
    UserProfile {
        provider: "github".to_string(),
        email: email.to_string(),
        name: "Ada Lovelace".to_string(),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        nick_name: "ada".to_string(),
        external_id: "1815".to_string(),
        avatar_url: "https://avatars.test/u/1815".to_string(),
        profile_url: "https://github.com/ada".to_string(),
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub notes: Arc<MemoryNotes>,
    pub tags: Arc<MemoryTags>,
    pub users: Arc<MemoryUsers>,
    pub media: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let media = TempDir::new().expect("tempdir");
        let config = Config::from_lookup(|key| match key {
            "GITHUB_ID" => Some("client-id".to_string()),
            "GITHUB_SECRET" => Some("client-secret".to_string()),
            "CLIENT_ADDRESS" => Some("https://notes.test".to_string()),
            "MEDIA_PATH" => Some(media.path().to_string_lossy().into_owned()),
            _ => None,
        });

        let notes = Arc::new(MemoryNotes::default());
        let tags = Arc::new(MemoryTags::default());
        let users = Arc::new(MemoryUsers::default());
        let state = AppState::new(
            notes.clone(),
            tags.clone(),
            users.clone(),
            Arc::new(FakeGitHub),
            config,
        );

        Self {
            router: build_router(state.clone()),
            state,
            notes,
            tags,
            users,
            media,
        }
    }

    /// Log a user in through the service and return it with its session token.
    pub async fn login(&self, email: &str) -> (User, String) {
        let user = self
            .state
            .users
            .login(&github_profile(email))
            .await
            .expect("login");
        let token = user.token.clone().expect("session token");
        (user, token)
    }
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(val) => builder.body(Body::from(val.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
}
