//! Database collaborators: connection factory and schema provisioning.
//!
//! The relay works on single owned [`PgConnection`]s rather than a pool:
//! each role's state machine exclusively owns one connection for the
//! lifetime of a Connecting→Closing cycle, and transactional discipline
//! (commit on success, rollback-on-drop on every error path) is provided
//! by [`sqlx::Transaction`].

pub mod schema;

use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection};

use crate::error::RelayError;

/// Factory producing live transactional PostgreSQL connections.
#[derive(Debug, Clone)]
pub struct ConnectionFactory {
    options: PgConnectOptions,
}

impl ConnectionFactory {
    /// Creates a factory from prepared connect options.
    #[must_use]
    pub fn new(options: PgConnectOptions) -> Self {
        Self { options }
    }

    /// Creates a factory from a `postgres://` connection URL.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Config`] if the URL cannot be parsed.
    pub fn from_url(url: &str) -> Result<Self, RelayError> {
        let options = url
            .parse::<PgConnectOptions>()
            .map_err(|e| RelayError::Config(format!("invalid database URL: {e}")))?;
        Ok(Self { options })
    }

    /// Opens a fresh connection.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`sqlx::Error`] if the connection cannot be
    /// established.
    pub async fn connect(&self) -> Result<PgConnection, sqlx::Error> {
        PgConnection::connect_with(&self.options).await
    }
}
