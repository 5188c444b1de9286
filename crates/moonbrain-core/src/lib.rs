//! # moonbrain-core
//!
//! Core types, traits, and abstractions for the moonbrain note backend.
//!
//! This crate provides the domain models shared by the database and API
//! crates, the repository trait definitions, and the pure note-graph logic.

pub mod auth;
pub mod defaults;
pub mod error;
pub mod file_safety;
pub mod graph;
pub mod logging;
pub mod models;
pub mod traits;
pub mod uuid_utils;

// Re-export commonly used types at crate root
pub use auth::extract_bearer_token;
pub use error::{Error, Result};
pub use file_safety::sanitize_filename;
pub use graph::{
    extract_link_id, graph_update_for_note, merge_links, merge_nodes, node_for_note, related_links,
};
pub use models::*;
pub use traits::*;
pub use uuid_utils::new_v7;
