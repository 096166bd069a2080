//! Load-generating producer pool.
//!
//! Each producer task owns one connection and inserts one or two random
//! events into the queue table every 100–200 ms, in its own transaction.
//! This is test/load tooling, not part of the relay core.

use std::time::Duration;

use rand::Rng;
use sqlx::{Connection, PgConnection};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::db::ConnectionFactory;
use crate::error::RelayError;
use crate::event::hash_bucket;

const INSERT_DOMAIN_EVENT: &str =
    "INSERT INTO domain_out (id, hash, data) VALUES ($1, $2, $3) RETURNING serial_id";

/// Pool of producer tasks writing random events into the queue table.
#[derive(Debug)]
pub struct ProducerPool {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl ProducerPool {
    /// Spawns `producers` producer tasks.
    #[must_use]
    pub fn spawn(factory: ConnectionFactory, producers: usize) -> Self {
        let (shutdown, _) = watch::channel(false);
        let tasks = (0..producers)
            .map(|worker| {
                tokio::spawn(produce(factory.clone(), shutdown.subscribe(), worker))
            })
            .collect();
        Self { shutdown, tasks }
    }

    /// Stops and joins all producer tasks.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            let _ = task.await;
        }
        tracing::info!("producer pool stopped");
    }
}

async fn produce(factory: ConnectionFactory, mut shutdown: watch::Receiver<bool>, worker: usize) {
    let mut connection = match factory.connect().await {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!(worker, %error, "producer failed to connect");
            return;
        }
    };

    loop {
        let pause = Duration::from_millis(rand::thread_rng().gen_range(100..200));
        tokio::select! {
            () = tokio::time::sleep(pause) => {}
            _ = shutdown.changed() => break,
        }
        if let Err(error) = insert_events(&mut connection, worker).await {
            tracing::error!(worker, %error, "producer errored, stopping");
            break;
        }
    }

    let _ = connection.close().await;
    tracing::info!(worker, "producer stopped");
}

async fn insert_events(connection: &mut PgConnection, worker: usize) -> Result<(), RelayError> {
    let count = rand::thread_rng().gen_range(1..3);
    tracing::debug!(worker, count, "inserting events");

    let mut tx = connection.begin().await?;
    for _ in 0..count {
        let id = Uuid::new_v4().to_string();
        let payload = serde_json::json!({ "origin": format!("producer-{worker}") }).to_string();
        let serial_id: i64 = sqlx::query_scalar(INSERT_DOMAIN_EVENT)
            .bind(&id)
            .bind(hash_bucket(&id))
            .bind(payload)
            .fetch_one(&mut *tx)
            .await?;
        tracing::debug!(worker, serial_id, "inserted event");
    }
    tx.commit().await?;
    Ok(())
}
