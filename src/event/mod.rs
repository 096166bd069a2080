//! Batch handoff types connecting a source to a consumer.
//!
//! A source answers each batch request with an [`EventBatch`]. Every
//! [`TransitEvent`] inside the batch couples the delivered [`Event`] to a
//! [`ResultSlot`], the single-resolution acknowledgment slot through which
//! the consumer reports an [`EventResult`] back to the source.

mod slot;

pub use slot::{CancelOutcome, ResultSlot};

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A single relay event as read from the queue table.
///
/// Immutable once read; `serial_id` is assigned by the store and is
/// monotonic and unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Store-assigned row id.
    pub serial_id: i64,
    /// Application-level event id (UUID string).
    pub id: String,
    /// Hash bucket derived from the id (0..20).
    pub hash: i32,
    /// Opaque event payload.
    pub data: String,
}

/// The result of processing a single event, produced by the consumer and
/// consumed by the source to decide row deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventResult {
    /// Row id of the processed event.
    pub serial_id: i64,
    /// Whether processing succeeded. Only `true` leads to row deletion.
    pub success: bool,
}

/// A delivered event coupled to its acknowledgment slot.
///
/// Cloning shares the slot: the source retains one clone to wait on while
/// the consumer completes the other.
#[derive(Debug, Clone)]
pub struct TransitEvent {
    /// The event itself, already resolved when produced by the source.
    pub event: Event,
    /// Single-resolution acknowledgment slot for this event.
    pub result: ResultSlot,
}

impl TransitEvent {
    /// Wraps an event with a fresh pending result slot.
    #[must_use]
    pub fn new(event: Event) -> Self {
        Self {
            event,
            result: ResultSlot::new(),
        }
    }
}

/// A batch of events plus an advisory delay.
///
/// `timeout` tells the caller how long to wait before requesting the next
/// batch; it is advisory, not a deadline. An empty batch is valid (the
/// poll found nothing).
#[derive(Debug, Clone)]
pub struct EventBatch {
    /// Events in ascending `serial_id` order.
    pub events: Vec<TransitEvent>,
    /// Advisory delay before the next batch request.
    pub timeout: Duration,
}

impl EventBatch {
    /// An empty batch carrying the given advisory delay.
    #[must_use]
    pub fn empty(timeout: Duration) -> Self {
        Self {
            events: Vec::new(),
            timeout,
        }
    }
}

/// Derives the 0..20 hash bucket for an event id.
#[must_use]
pub fn hash_bucket(id: &str) -> i32 {
    id.bytes()
        .fold(0i32, |h, b| h.wrapping_mul(31).wrapping_add(i32::from(b)))
        .rem_euclid(20)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn empty_batch_has_no_events() {
        let batch = EventBatch::empty(Duration::from_millis(100));
        assert!(batch.events.is_empty());
        assert_eq!(batch.timeout, Duration::from_millis(100));
    }

    #[test]
    fn hash_bucket_stays_in_range() {
        for id in ["", "a", "8f14e45f-ceea-467f-9dcd-b0c4e1e0f1a1", "hello"] {
            let bucket = hash_bucket(id);
            assert!((0..20).contains(&bucket), "bucket {bucket} for id {id:?}");
        }
    }

    #[test]
    fn cloned_transit_event_shares_the_slot() {
        let transit = TransitEvent::new(Event {
            serial_id: 7,
            id: "x".to_string(),
            hash: 0,
            data: String::new(),
        });
        let clone = transit.clone();

        assert!(clone.result.complete(EventResult {
            serial_id: 7,
            success: true,
        }));
        let Some(result) = transit.result.result() else {
            panic!("slot should be resolved through the clone");
        };
        assert!(result.success);
    }
}
