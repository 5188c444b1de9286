//! HTTP handlers for moonbrain-api.
//!
//! Handlers decode requests, call services, and shape responses. They hold no
//! business logic.

pub mod auth;
pub mod health;
pub mod notes;
pub mod tags;
