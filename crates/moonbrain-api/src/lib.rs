//! # moonbrain-api
//!
//! HTTP server for moonbrain: note publishing, search, tags, and GitHub login.
//!
//! The binary in `main.rs` wires [`state::AppState::from_database`] into
//! [`router::build_router`]; tests build the same router over in-memory
//! repositories with [`state::AppState::new`].

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod oauth;
pub mod response;
pub mod router;
pub mod services;
pub mod state;
pub mod telemetry;

pub use config::Config;
pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
