//! PostgreSQL connection pool sizing and health reporting.
//!
//! | variable | default |
//! |----------|---------|
//! | `DB_MAX_CONNECTIONS` | 10 |
//! | `DB_MIN_CONNECTIONS` | 1 |
//! | `DB_CONNECT_TIMEOUT_SECS` | 30 |

use std::str::FromStr;
use std::time::{Duration, Instant};

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info, warn};

use moonbrain_core::{Error, Result};

/// Pool size when `DB_MAX_CONNECTIONS` is unset.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Seconds to wait for a free connection before failing the query.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

const IDLE_TIMEOUT: Duration = Duration::from_secs(10 * 60);
const MAX_LIFETIME: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    /// Never above `max_connections`.
    pub min_connections: u32,
    pub connect_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: 1,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl PoolConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build pool settings from an arbitrary variable source.
    ///
    /// Unparseable values keep the default and log a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let max_connections =
            setting(&lookup, "DB_MAX_CONNECTIONS").map_or(defaults.max_connections, |n: u32| n.max(1));
        let min_connections =
            setting(&lookup, "DB_MIN_CONNECTIONS").unwrap_or(defaults.min_connections);
        let connect_timeout = setting(&lookup, "DB_CONNECT_TIMEOUT_SECS")
            .map_or(defaults.connect_timeout, Duration::from_secs);

        Self {
            max_connections,
            min_connections: min_connections.min(max_connections),
            connect_timeout,
        }
    }

    pub fn max_connections(mut self, n: u32) -> Self {
        self.max_connections = n.max(1);
        self.min_connections = self.min_connections.min(self.max_connections);
        self
    }

    fn options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.connect_timeout)
            .idle_timeout(IDLE_TIMEOUT)
            .max_lifetime(MAX_LIFETIME)
    }

    /// Open a pool against `database_url`.
    pub async fn connect(&self, database_url: &str) -> Result<PgPool> {
        let start = Instant::now();
        debug!(
            subsystem = "db",
            component = "pool",
            op = "connect",
            max_connections = self.max_connections,
            min_connections = self.min_connections,
            connect_timeout_secs = self.connect_timeout.as_secs(),
            "Opening connection pool"
        );

        let pool = self
            .options()
            .connect(database_url)
            .await
            .map_err(|e| Error::Database(e).context("connect to database"))?;

        info!(
            subsystem = "db",
            component = "pool",
            op = "connect",
            pool_size = pool.size(),
            pool_idle = pool.num_idle(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Connection pool ready"
        );
        Ok(pool)
    }
}

fn setting<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key).filter(|v| !v.trim().is_empty())?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(
                subsystem = "db",
                component = "pool",
                key,
                value = %raw,
                "Ignoring unparseable pool setting"
            );
            None
        }
    }
}

/// Point-in-time connection counts for a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolHealth {
    pub size: u32,
    pub idle: usize,
}

impl PoolHealth {
    pub fn sample(pool: &PgPool) -> Self {
        Self {
            size: pool.size(),
            idle: pool.num_idle(),
        }
    }

    /// Every open connection is checked out.
    pub fn exhausted(&self) -> bool {
        self.size > 0 && self.idle == 0
    }

    pub fn log(&self) {
        debug!(
            subsystem = "db",
            component = "pool",
            op = "metrics",
            pool_size = self.size,
            pool_idle = self.idle,
            "Pool health check"
        );
        if self.exhausted() {
            warn!(
                subsystem = "db",
                component = "pool",
                pool_size = self.size,
                "No idle database connections left"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> PoolConfig {
        let map: HashMap<&str, &str> = vars.iter().copied().collect();
        PoolConfig::from_lookup(|key| map.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn test_unset_variables_keep_defaults() {
        assert_eq!(config(&[]), PoolConfig::default());
    }

    #[test]
    fn test_variables_override_defaults() {
        let c = config(&[
            ("DB_MAX_CONNECTIONS", "25"),
            ("DB_MIN_CONNECTIONS", "4"),
            ("DB_CONNECT_TIMEOUT_SECS", " 5 "),
        ]);
        assert_eq!(c.max_connections, 25);
        assert_eq!(c.min_connections, 4);
        assert_eq!(c.connect_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_garbage_and_zero_are_sanitized() {
        let c = config(&[("DB_MAX_CONNECTIONS", "0"), ("DB_CONNECT_TIMEOUT_SECS", "soon")]);
        assert_eq!(c.max_connections, 1);
        assert_eq!(c.connect_timeout, Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS));
    }

    #[test]
    fn test_min_connections_capped_by_max() {
        let c = config(&[("DB_MAX_CONNECTIONS", "2"), ("DB_MIN_CONNECTIONS", "8")]);
        assert_eq!(c.min_connections, 2);

        let c = PoolConfig {
            min_connections: 3,
            ..Default::default()
        }
        .max_connections(2);
        assert_eq!((c.max_connections, c.min_connections), (2, 2));
    }

    #[test]
    fn test_options_carry_settings() {
        let options = config(&[("DB_MAX_CONNECTIONS", "7")]).options();
        assert_eq!(options.get_max_connections(), 7);
        assert_eq!(options.get_min_connections(), 1);
        assert_eq!(options.get_idle_timeout(), Some(IDLE_TIMEOUT));
        assert_eq!(options.get_max_lifetime(), Some(MAX_LIFETIME));
    }

    #[test]
    fn test_pool_health_exhaustion() {
        assert!(PoolHealth { size: 3, idle: 0 }.exhausted());
        assert!(!PoolHealth { size: 3, idle: 1 }.exhausted());
        assert!(!PoolHealth { size: 0, idle: 0 }.exhausted());
    }
}
