//! pg-relay demo binary.
//!
//! Provisions the schema, starts a producer pool feeding the queue table,
//! and runs the source → sink relay until Ctrl-C.

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use pg_relay::config::RelayConfig;
use pg_relay::db::{ConnectionFactory, schema};
use pg_relay::producer::ProducerPool;
use pg_relay::sink::PgSink;
use pg_relay::source::PgSource;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = RelayConfig::from_env()?;
    let factory = ConnectionFactory::from_url(&config.database_url)?;

    if config.provision_schema {
        tracing::info!("provisioning schema");
        let mut connection = factory.connect().await?;
        schema::provision(&mut connection).await?;
        sqlx::Connection::close(connection).await?;
    }

    tracing::info!(producers = config.producer_count, "starting producer pool");
    let producers = ProducerPool::spawn(factory.clone(), config.producer_count);

    let source = Arc::new(PgSource::spawn(config.source_context(factory.clone())));
    let sink = PgSink::new(config.sink_context(factory), Arc::clone(&source));

    let (shutdown, watcher) = watch::channel(false);
    let sink_task = tokio::spawn(sink.run(watcher));

    tracing::info!("relay running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    tracing::info!("stopping producers");
    producers.shutdown().await;

    tracing::info!("stopping sink");
    let _ = shutdown.send(true);
    sink_task.await?;

    source.close().await;
    tracing::info!("done");

    Ok(())
}
