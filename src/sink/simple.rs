//! Ack-everything consumer for demos and tests.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, watch};

use crate::event::EventResult;
use crate::source::Source;

/// Fallback delay when the upstream drops a batch reply.
const REPLY_DROPPED_BACKOFF: Duration = Duration::from_millis(100);

/// Consumer that acknowledges every event successfully, optionally after
/// a simulated processing delay on a spawned task per event.
///
/// Per-event processing overlaps with the source's ack-waiting, so a
/// non-zero delay exercises the session-budget logic upstream.
#[derive(Debug)]
pub struct SimpleSink<S> {
    source: Arc<S>,
    processing_delay: Duration,
}

impl<S: Source> SimpleSink<S> {
    /// Creates a sink that acknowledges immediately.
    #[must_use]
    pub fn new(source: Arc<S>) -> Self {
        Self::with_delay(source, Duration::ZERO)
    }

    /// Creates a sink that waits `processing_delay` before each ack.
    #[must_use]
    pub fn with_delay(source: Arc<S>, processing_delay: Duration) -> Self {
        Self {
            source,
            processing_delay,
        }
    }

    /// Requests and acknowledges batches until `shutdown` fires.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        loop {
            let delay = tokio::select! {
                delay = self.process() => delay,
                _ = shutdown.changed() => break,
            };
            if !delay.is_zero() {
                tokio::select! {
                    () = tokio::time::sleep(delay) => {}
                    _ = shutdown.changed() => break,
                }
            }
        }
        tracing::info!("simple sink stopped");
    }

    /// Requests one batch, spawns the per-event acks, and returns the
    /// batch's advisory delay.
    pub async fn process(&self) -> Duration {
        let (reply, batch) = oneshot::channel();
        self.source.request_data(reply);

        let Ok(batch) = batch.await else {
            tracing::error!("upstream source dropped the batch reply");
            return REPLY_DROPPED_BACKOFF;
        };

        let advisory = batch.timeout;
        let processing_delay = self.processing_delay;
        for transit in batch.events {
            tokio::spawn(async move {
                if !processing_delay.is_zero() {
                    tokio::time::sleep(processing_delay).await;
                }
                tracing::debug!(serial_id = transit.event.serial_id, "processing event");
                transit.result.complete(EventResult {
                    serial_id: transit.event.serial_id,
                    success: true,
                });
            });
        }
        advisory
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::source::InMemorySource;

    #[tokio::test]
    async fn acknowledges_every_event_in_a_batch() {
        let source = Arc::new(InMemorySource::new(4));
        let sink = SimpleSink::new(Arc::clone(&source));

        let delay = sink.process().await;
        assert_eq!(delay, Duration::ZERO);

        for _ in 0..100 {
            if source.acked() == 4 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected 4 acks, got {}", source.acked());
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let source = Arc::new(InMemorySource::new(1));
        let sink = SimpleSink::with_delay(Arc::clone(&source), Duration::from_millis(1));

        let (shutdown, watcher) = watch::channel(false);
        let task = tokio::spawn(sink.run(watcher));

        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = shutdown.send(true);
        let Ok(()) = task.await else {
            panic!("sink task panicked");
        };

        assert!(source.acked() > 0);
    }
}
