//! Shared application state.

use std::sync::Arc;

use moonbrain_core::{NoteRepository, TagRepository, UserRepository};
use moonbrain_db::Database;

use crate::config::Config;
use crate::oauth::{GitHubProvider, OAuthProvider, StateSigner};
use crate::services::{NoteService, TagService, UserService};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub notes: NoteService,
    pub tags: TagService,
    pub users: UserService,
    pub oauth: Arc<dyn OAuthProvider>,
    pub oauth_state: StateSigner,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire services over the given repositories and OAuth provider.
    pub fn new(
        notes: Arc<dyn NoteRepository>,
        tags: Arc<dyn TagRepository>,
        users: Arc<dyn UserRepository>,
        oauth: Arc<dyn OAuthProvider>,
        config: Config,
    ) -> Self {
        let users = UserService::new(users);
        let tags = TagService::new(tags);
        let notes = NoteService::new(notes, users.clone(), tags.clone(), &config.media_path);

        Self {
            notes,
            tags,
            users,
            oauth,
            oauth_state: StateSigner::new(&config.github_secret),
            config: Arc::new(config),
        }
    }

    /// Production wiring: PostgreSQL repositories and GitHub login.
    pub fn from_database(db: Database, config: Config) -> Self {
        let github = GitHubProvider::new(
            &config.github_id,
            &config.github_secret,
            &config.backend_host,
        );
        let Database {
            notes, tags, users, ..
        } = db;

        Self::new(
            Arc::new(notes),
            Arc::new(tags),
            Arc::new(users),
            Arc::new(github),
            config,
        )
    }
}
