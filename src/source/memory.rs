//! In-memory source generating synthetic events.
//!
//! No database involved: each request is served by a spawned task that
//! resolves the batch immediately and then waits for every acknowledgment,
//! counting successful acks. Used to exercise the batch handoff protocol
//! and consumers in tests and demos.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use uuid::Uuid;

use crate::event::{Event, EventBatch, TransitEvent, hash_bucket};
use crate::source::{BatchReply, Source};

/// How long a request task waits for the acks of its batch.
const ACK_WAIT: Duration = Duration::from_secs(30);

/// Source producing batches of synthetic events without a database.
///
/// Serial ids are monotonic across batches. There is no redelivery: an
/// event that is not acknowledged is simply gone.
#[derive(Debug)]
pub struct InMemorySource {
    batch_size: usize,
    next_serial: Arc<AtomicI64>,
    acked: Arc<AtomicU64>,
}

impl InMemorySource {
    /// Creates a source emitting `batch_size` events per request.
    #[must_use]
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            next_serial: Arc::new(AtomicI64::new(1)),
            acked: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of events acknowledged with success so far.
    #[must_use]
    pub fn acked(&self) -> u64 {
        self.acked.load(Ordering::Relaxed)
    }
}

impl Source for InMemorySource {
    fn request_data(&self, reply: BatchReply) {
        let events: Vec<TransitEvent> = (0..self.batch_size)
            .map(|_| {
                let serial_id = self.next_serial.fetch_add(1, Ordering::Relaxed);
                let id = Uuid::new_v4().to_string();
                let hash = hash_bucket(&id);
                TransitEvent::new(Event {
                    serial_id,
                    id: id.clone(),
                    hash,
                    data: id,
                })
            })
            .collect();

        let acked = Arc::clone(&self.acked);
        tokio::spawn(async move {
            let retained: Vec<_> = events.iter().map(|t| t.result.clone()).collect();
            if reply
                .send(EventBatch {
                    events,
                    timeout: Duration::ZERO,
                })
                .is_err()
            {
                return;
            }
            for slot in retained {
                if slot.wait_for(ACK_WAIT).await.is_some_and(|r| r.success) {
                    acked.fetch_add(1, Ordering::Relaxed);
                }
            }
        });
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::event::EventResult;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn emits_batches_with_monotonic_serial_ids() {
        let source = InMemorySource::new(5);

        let (reply, batch) = oneshot::channel();
        source.request_data(reply);
        let Ok(batch) = batch.await else {
            panic!("batch reply dropped");
        };

        assert_eq!(batch.events.len(), 5);
        assert_eq!(batch.timeout, Duration::ZERO);
        let serials: Vec<i64> = batch.events.iter().map(|t| t.event.serial_id).collect();
        assert!(serials.windows(2).all(|w| w.first() < w.last()));

        let (reply, next) = oneshot::channel();
        source.request_data(reply);
        let Ok(next) = next.await else {
            panic!("batch reply dropped");
        };
        let Some(first_of_next) = next.events.first() else {
            panic!("second batch empty");
        };
        assert!(first_of_next.event.serial_id > serials.iter().copied().max().unwrap_or(0));
    }

    #[tokio::test]
    async fn counts_successful_acks() {
        let source = InMemorySource::new(3);

        let (reply, batch) = oneshot::channel();
        source.request_data(reply);
        let Ok(batch) = batch.await else {
            panic!("batch reply dropped");
        };

        for transit in &batch.events {
            transit.result.complete(EventResult {
                serial_id: transit.event.serial_id,
                success: true,
            });
        }

        // The counting task runs concurrently; poll until it catches up.
        for _ in 0..100 {
            if source.acked() == 3 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("acks were not counted, got {}", source.acked());
    }
}
