//! PostgreSQL event sink: idempotent per-event persistence.
//!
//! The sink runs the same three-state lifecycle as the source but is a
//! pure consumer: no batch reply of its own to resolve. Each event is
//! inserted in its own transaction keyed by `serial_id`; a unique-key
//! violation means the event already arrived through an earlier delivery
//! and is acknowledged as success, which is what makes redelivery safe.

use std::sync::Arc;
use std::time::Duration;

use sqlx::{Connection, PgConnection};
use tokio::sync::{oneshot, watch};

use crate::db::ConnectionFactory;
use crate::error::RelayError;
use crate::event::{Event, EventResult};
use crate::lifecycle::{Lifecycle, ProcessResult, State};
use crate::source::Source;

const INSERT_EVENT: &str =
    "INSERT INTO domain_sink (serial_id, id, hash, data) VALUES ($1, $2, $3, $4)";

/// Immutable configuration of a [`PgSink`].
#[derive(Debug, Clone)]
pub struct SinkContext {
    /// Factory for the sink's connection.
    pub factory: ConnectionFactory,
    /// Backoff after a failed connection attempt, also used when the
    /// upstream source drops a batch reply.
    pub connection_error_timeout: Duration,
    /// Bound on each event insert.
    pub insert_timeout: Duration,
}

impl SinkContext {
    /// Context with the default timeouts.
    #[must_use]
    pub fn new(factory: ConnectionFactory) -> Self {
        Self {
            factory,
            connection_error_timeout: Duration::from_secs(1),
            insert_timeout: Duration::from_secs(1),
        }
    }
}

/// PostgreSQL-backed sink consuming batches from an upstream [`Source`].
#[derive(Debug)]
pub struct PgSink<S> {
    context: SinkContext,
    source: Arc<S>,
    connection: Option<PgConnection>,
}

impl<S: Source> PgSink<S> {
    /// Creates a sink reading from `source`.
    #[must_use]
    pub fn new(context: SinkContext, source: Arc<S>) -> Self {
        Self {
            context,
            source,
            connection: None,
        }
    }

    /// Drives the lifecycle loop until `shutdown` fires, then forces one
    /// Closing pass so the connection is released deterministically.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut lifecycle = Lifecycle::new();

        loop {
            lifecycle.begin_step();
            let result = tokio::select! {
                result = self.process(lifecycle.current()) => result,
                _ = shutdown.changed() => break,
            };

            if !result.delay.is_zero() {
                tracing::debug!(
                    delay_ms = u64::try_from(result.delay.as_millis()).unwrap_or(u64::MAX),
                    "sleeping before next cycle"
                );
                tokio::select! {
                    () = tokio::time::sleep(result.delay) => {}
                    _ = shutdown.changed() => break,
                }
            }

            lifecycle.advance(result.outcome);
        }

        tracing::info!("sink shutting down");
        self.close().await;
    }

    async fn process(&mut self, state: State) -> ProcessResult {
        match state {
            State::Connecting => self.connect().await,
            State::Processing => self.process_batch().await,
            State::Closing => self.close().await,
        }
    }

    async fn connect(&mut self) -> ProcessResult {
        match self.context.factory.connect().await {
            Ok(connection) => {
                tracing::info!("sink connected");
                self.connection = Some(connection);
                ProcessResult::success(Duration::ZERO)
            }
            Err(error) => {
                tracing::error!(%error, "sink failed to connect");
                ProcessResult::error(self.context.connection_error_timeout)
            }
        }
    }

    async fn close(&mut self) -> ProcessResult {
        if let Some(connection) = self.connection.take() {
            if let Err(error) = connection.close().await {
                tracing::error!(%error, "error while closing connection (ignored)");
            }
        }
        ProcessResult::success(Duration::ZERO)
    }

    /// Requests one batch and persists its events.
    ///
    /// Blocks only on the batch reply, never on individual result slots —
    /// the sink is the one completing those. A hard database error
    /// abandons the rest of the batch (those slots stay unresolved and
    /// the upstream sweep cancels them) and cycles the connection.
    async fn process_batch(&mut self) -> ProcessResult {
        let (reply, batch) = oneshot::channel();
        self.source.request_data(reply);

        let Ok(batch) = batch.await else {
            tracing::error!("upstream source dropped the batch reply");
            return ProcessResult::error(self.context.connection_error_timeout);
        };
        let advisory = batch.timeout;

        let Some(connection) = self.connection.as_mut() else {
            return ProcessResult::error(self.context.connection_error_timeout);
        };

        if !batch.events.is_empty() {
            tracing::debug!(count = batch.events.len(), "consuming events");
        }

        for transit in &batch.events {
            match persist_event(connection, &transit.event, self.context.insert_timeout).await {
                Ok(()) => {
                    transit.result.complete(EventResult {
                        serial_id: transit.event.serial_id,
                        success: true,
                    });
                }
                Err(error) => {
                    tracing::error!(
                        serial_id = transit.event.serial_id,
                        %error,
                        "failed to persist event, abandoning batch"
                    );
                    return ProcessResult::error(advisory);
                }
            }
        }

        ProcessResult::success(advisory)
    }
}

/// Inserts one event in its own transaction.
///
/// A unique-key violation is success: the event was already persisted by
/// a previous delivery.
async fn persist_event(
    connection: &mut PgConnection,
    event: &Event,
    limit: Duration,
) -> Result<(), RelayError> {
    tracing::debug!(serial_id = event.serial_id, "persisting event");

    let mut tx = connection.begin().await?;
    let insert = sqlx::query(INSERT_EVENT)
        .bind(event.serial_id)
        .bind(&event.id)
        .bind(event.hash)
        .bind(&event.data)
        .execute(&mut *tx);

    match tokio::time::timeout(limit, insert).await {
        Ok(Ok(_)) => {
            tx.commit().await?;
            Ok(())
        }
        Ok(Err(error)) => {
            if is_unique_violation(&error) {
                tracing::warn!(
                    serial_id = event.serial_id,
                    "event already persisted, acknowledging anyway"
                );
                // The failed insert aborted this transaction; discard it.
                let _ = tx.rollback().await;
                Ok(())
            } else {
                Err(error.into())
            }
        }
        Err(_) => Err(RelayError::Timeout {
            operation: "insert",
            limit,
        }),
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}
