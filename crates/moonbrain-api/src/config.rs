//! Server configuration loaded from environment variables.
//!
//! | variable | default |
//! |----------|---------|
//! | `APP_ADDRESS` | `127.0.0.1:3000` |
//! | `DATABASE_URL` | composed from `POSTGRES_*`, else `postgres://localhost/moonbrain` |
//! | `MODE` | `DEBUG` enables debug mode |
//! | `MEDIA_PATH` | `./media` |
//! | `GITHUB_ID` / `GITHUB_SECRET` | empty |
//! | `BACKEND_HOST` | `http://{APP_ADDRESS}` |
//! | `CLIENT_ADDRESS` | `http://{APP_ADDRESS}` |
//! | `ALLOWED_ORIGINS` | `CLIENT_ADDRESS` |
//! | `MAX_UPLOAD_BYTES` | 50 MiB |

use std::path::PathBuf;

use axum::http::HeaderValue;
use moonbrain_core::defaults::MEDIA_PATH;

/// Default listen address.
pub const DEFAULT_APP_ADDRESS: &str = "127.0.0.1:3000";

/// Database used when neither `DATABASE_URL` nor `POSTGRES_HOST` is set.
pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/moonbrain";

/// Default request body limit for note and image uploads.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub app_address: String,
    pub database_url: String,
    pub debug: bool,
    pub media_path: PathBuf,
    pub github_id: String,
    pub github_secret: String,
    /// Public URL of this server, used to build the OAuth callback URL.
    pub backend_host: String,
    /// Frontend URL that receives the post-login redirect.
    pub client_address: String,
    pub allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let app_address = get("APP_ADDRESS").unwrap_or_else(|| DEFAULT_APP_ADDRESS.to_string());
        let default_url = format!("http://{app_address}");
        let client_address = get("CLIENT_ADDRESS").unwrap_or_else(|| default_url.clone());

        let allowed_origins = get("ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_else(|| vec![client_address.clone()]);

        let max_upload_bytes = match get("MAX_UPLOAD_BYTES") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "Invalid MAX_UPLOAD_BYTES, using default");
                DEFAULT_MAX_UPLOAD_BYTES
            }),
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Self {
            database_url: database_url(&get),
            debug: get("MODE").is_some_and(|m| m.eq_ignore_ascii_case("DEBUG")),
            media_path: get("MEDIA_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(MEDIA_PATH)),
            github_id: get("GITHUB_ID").unwrap_or_default(),
            github_secret: get("GITHUB_SECRET").unwrap_or_default(),
            backend_host: get("BACKEND_HOST").unwrap_or(default_url),
            client_address,
            allowed_origins,
            max_upload_bytes,
            app_address,
        }
    }

    /// True when both OAuth app credentials are present.
    pub fn github_configured(&self) -> bool {
        !self.github_id.is_empty() && !self.github_secret.is_empty()
    }

    /// Parse the CORS whitelist, dropping invalid entries with a warning.
    pub fn cors_origins(&self) -> Vec<HeaderValue> {
        self.allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!("Invalid CORS origin '{}': {}", origin, e);
                    None
                }
            })
            .collect()
    }
}

fn database_url(get: &impl Fn(&str) -> Option<String>) -> String {
    if let Some(url) = get("DATABASE_URL") {
        return url;
    }
    let Some(host) = get("POSTGRES_HOST") else {
        return DEFAULT_DATABASE_URL.to_string();
    };

    let user = get("POSTGRES_USER").unwrap_or_else(|| "postgres".to_string());
    let port = get("POSTGRES_PORT").unwrap_or_else(|| "5432".to_string());
    let db = get("POSTGRES_DB").unwrap_or_else(|| "moonbrain".to_string());
    match get("POSTGRES_PASSWORD") {
        Some(password) => format!(
            "postgres://{}:{}@{}:{}/{}",
            urlencoding::encode(&user),
            urlencoding::encode(&password),
            host,
            port,
            db
        ),
        None => format!("postgres://{}@{}:{}/{}", urlencoding::encode(&user), host, port, db),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let c = config(&[]);
        assert_eq!(c.app_address, "127.0.0.1:3000");
        assert_eq!(c.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(c.client_address, "http://127.0.0.1:3000");
        assert_eq!(c.backend_host, "http://127.0.0.1:3000");
        assert_eq!(c.allowed_origins, vec!["http://127.0.0.1:3000".to_string()]);
        assert_eq!(c.media_path, PathBuf::from("./media"));
        assert_eq!(c.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert!(!c.debug);
        assert!(!c.github_configured());
    }

    #[test]
    fn test_database_url_from_parts() {
        let c = config(&[
            ("POSTGRES_HOST", "db"),
            ("POSTGRES_USER", "brain"),
            ("POSTGRES_PASSWORD", "p@ss"),
            ("POSTGRES_DB", "notes"),
        ]);
        assert_eq!(c.database_url, "postgres://brain:p%40ss@db:5432/notes");
    }

    #[test]
    fn test_database_url_explicit_wins() {
        let c = config(&[
            ("DATABASE_URL", "postgres://x/y"),
            ("POSTGRES_HOST", "db"),
        ]);
        assert_eq!(c.database_url, "postgres://x/y");
    }

    #[test]
    fn test_debug_mode_and_origins() {
        let c = config(&[
            ("MODE", "debug"),
            ("ALLOWED_ORIGINS", "https://a.dev, ,https://b.dev"),
        ]);
        assert!(c.debug);
        assert_eq!(c.allowed_origins, vec!["https://a.dev", "https://b.dev"]);
        assert_eq!(c.cors_origins().len(), 2);
    }

    #[test]
    fn test_invalid_upload_limit_falls_back() {
        let c = config(&[("MAX_UPLOAD_BYTES", "lots")]);
        assert_eq!(c.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    }

    #[test]
    fn test_blank_values_ignored() {
        let c = config(&[("APP_ADDRESS", "  "), ("GITHUB_ID", "")]);
        assert_eq!(c.app_address, DEFAULT_APP_ADDRESS);
        assert!(c.github_id.is_empty());
    }
}
