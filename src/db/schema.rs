//! Schema provisioning for the relay tables.
//!
//! `domain_out` is the durable queue the producers write into and the
//! source polls; `domain_sink` receives the relayed copies. The sink
//! table's `serial_id` is not generated: it is copied verbatim from the
//! queue row, and the primary key enforces the uniqueness the idempotent
//! insert relies on.

use sqlx::PgConnection;

use crate::error::RelayError;

const DROP_DOMAIN_OUT: &str = "DROP TABLE IF EXISTS domain_out";

const CREATE_DOMAIN_OUT: &str = "\
    CREATE TABLE domain_out (\
      serial_id BIGSERIAL PRIMARY KEY,\
      id VARCHAR(36) NOT NULL,\
      hash INT NOT NULL,\
      data VARCHAR(1000) NOT NULL\
    )";

const DROP_DOMAIN_SINK: &str = "DROP TABLE IF EXISTS domain_sink";

const CREATE_DOMAIN_SINK: &str = "\
    CREATE TABLE domain_sink (\
      serial_id BIGINT PRIMARY KEY,\
      id VARCHAR(36) NOT NULL,\
      hash INT NOT NULL,\
      data VARCHAR(1000) NOT NULL\
    )";

/// Drops and recreates the queue and sink tables.
///
/// # Errors
///
/// Returns [`RelayError::Database`] if a statement fails.
pub async fn provision(connection: &mut PgConnection) -> Result<(), RelayError> {
    tracing::info!("dropping existing relay tables");
    sqlx::query(DROP_DOMAIN_OUT).execute(&mut *connection).await?;
    sqlx::query(DROP_DOMAIN_SINK)
        .execute(&mut *connection)
        .await?;

    tracing::info!("creating relay tables");
    sqlx::query(CREATE_DOMAIN_OUT)
        .execute(&mut *connection)
        .await?;
    sqlx::query(CREATE_DOMAIN_SINK)
        .execute(&mut *connection)
        .await?;

    Ok(())
}
