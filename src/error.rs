//! Relay error types.
//!
//! [`RelayError`] is the central error type for the relay. Database and
//! timeout failures are converted into a lifecycle [`Outcome`] at the
//! state-processing boundary and never escape to batch-request callers.
//!
//! [`Outcome`]: crate::lifecycle::Outcome

use std::time::Duration;

/// Central error type for the relay library.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Database connection or query failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A bounded database operation exceeded its configured limit.
    #[error("{operation} timed out after {limit:?}")]
    Timeout {
        /// Name of the operation that timed out (`select`, `delete`, ...).
        operation: &'static str,
        /// The configured limit that was exceeded.
        limit: Duration,
    },

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// No live connection is held where one was required.
    #[error("not connected to the database")]
    NotConnected,
}
