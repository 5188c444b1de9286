//! Tracing subscriber setup.
//!
//! Environment variables:
//!   LOG_FORMAT  - "json" or "text" (default: "text")
//!   LOG_FILE    - path to log file (optional, enables daily-rotated file logging)
//!   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
//!   RUST_LOG    - standard env filter (default: "moonbrain_api=debug,moonbrain_db=info,tower_http=debug")

use std::path::Path;

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "moonbrain_api=debug,moonbrain_db=info,tower_http=debug";

/// Logging options read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub json: bool,
    pub file: Option<String>,
    pub ansi: Option<bool>,
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            json: lookup("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
            file: lookup("LOG_FILE").filter(|f| !f.trim().is_empty()),
            ansi: lookup("LOG_ANSI").map(|v| v == "true" || v == "1"),
        }
    }
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer and must be held until exit.
pub fn init_tracing(settings: &LogSettings) -> Option<WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_FILTER.into());

    let registry = tracing_subscriber::registry().with(env_filter);

    let guard = if let Some(ref path) = settings.file {
        let path = Path::new(path);
        let file_dir = path.parent().unwrap_or(Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("moonbrain-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if settings.json {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            // No ANSI in files unless asked for.
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(settings.ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if settings.json {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = settings.ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = if settings.json { "json" } else { "text" },
        log_file = settings.file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );
    guard
}
