//! Relay configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`), with sensible defaults matching the
//! original deployment values.

use std::time::Duration;

use crate::db::ConnectionFactory;
use crate::error::RelayError;
use crate::sink::SinkContext;
use crate::source::SourceContext;

/// Top-level relay configuration.
///
/// Loaded once at startup via [`RelayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// PostgreSQL connection string.
    pub database_url: String,

    /// Whether to drop and recreate the relay tables at startup.
    pub provision_schema: bool,

    /// Number of load-producer tasks to run.
    pub producer_count: usize,

    /// Backoff after a failed connection attempt (both roles).
    pub connection_error_timeout: Duration,

    /// Bound on the source's skip-locked select.
    pub select_query_timeout: Duration,

    /// Bound on each acknowledgment delete.
    pub delete_timeout: Duration,

    /// Shared acknowledgment budget for one whole batch.
    pub session_timeout: Duration,

    /// Advisory delay returned with an empty batch.
    pub empty_select_timeout: Duration,

    /// Bound on each sink insert.
    pub insert_timeout: Duration,
}

impl RelayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults when a variable is not set. Calls
    /// `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Config`] if `DATABASE_URL` is missing.
    pub fn from_env() -> Result<Self, RelayError> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| RelayError::Config("DATABASE_URL is not set".to_string()))?;

        Ok(Self {
            database_url,
            provision_schema: parse_env_bool("PROVISION_SCHEMA", true),
            producer_count: parse_env("PRODUCER_COUNT", 10),
            connection_error_timeout: duration_env("CONNECTION_ERROR_TIMEOUT_MS", 1000),
            select_query_timeout: duration_env("SELECT_QUERY_TIMEOUT_MS", 1000),
            delete_timeout: duration_env("DELETE_TIMEOUT_MS", 1000),
            session_timeout: duration_env("SESSION_TIMEOUT_MS", 30_000),
            empty_select_timeout: duration_env("EMPTY_SELECT_TIMEOUT_MS", 100),
            insert_timeout: duration_env("INSERT_TIMEOUT_MS", 1000),
        })
    }

    /// Builds the source-role context from this configuration.
    #[must_use]
    pub fn source_context(&self, factory: ConnectionFactory) -> SourceContext {
        SourceContext {
            factory,
            connection_error_timeout: self.connection_error_timeout,
            select_query_timeout: self.select_query_timeout,
            delete_timeout: self.delete_timeout,
            session_timeout: self.session_timeout,
            empty_select_timeout: self.empty_select_timeout,
        }
    }

    /// Builds the sink-role context from this configuration.
    #[must_use]
    pub fn sink_context(&self, factory: ConnectionFactory) -> SinkContext {
        SinkContext {
            factory,
            connection_error_timeout: self.connection_error_timeout,
            insert_timeout: self.insert_timeout,
        }
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as milliseconds.
fn duration_env(key: &str, default_ms: u64) -> Duration {
    Duration::from_millis(parse_env(key, default_ms))
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().as_deref() {
        Some("true") | Some("TRUE") | Some("1") => true,
        Some("false") | Some("FALSE") | Some("0") => false,
        _ => default,
    }
}
