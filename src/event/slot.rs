//! Single-resolution acknowledgment slot.
//!
//! [`ResultSlot`] is the mailbox connecting a consumer (who completes it)
//! to the source session that waits on it. It resolves at most once:
//! pending → done or pending → cancelled. Both the resolved/cancelled
//! decision and its inspection happen under one lock, so a cancellation
//! that loses the race against a concurrent completion always observes the
//! real result instead of discarding it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;

use super::EventResult;

/// Resolution state of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Pending,
    Done(EventResult),
    Cancelled,
}

/// Outcome of a cancellation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The slot is now (or already was) cancelled.
    Cancelled,
    /// Cancellation lost the race: the slot had already completed with
    /// this result, which must be honored.
    AlreadyDone(EventResult),
}

/// Single-writer, single-resolution acknowledgment slot.
///
/// Cloning is cheap and shares the underlying state.
#[derive(Debug, Clone)]
pub struct ResultSlot {
    inner: Arc<SlotInner>,
}

#[derive(Debug)]
struct SlotInner {
    state: Mutex<SlotState>,
    notify: Notify,
}

impl ResultSlot {
    /// Creates a new pending slot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SlotInner {
                state: Mutex::new(SlotState::Pending),
                notify: Notify::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Completes the slot with `result`.
    ///
    /// Returns `true` if this call resolved the slot, `false` if it was
    /// already done or cancelled (the call is then a no-op).
    pub fn complete(&self, result: EventResult) -> bool {
        let mut state = self.lock();
        if *state != SlotState::Pending {
            return false;
        }
        *state = SlotState::Done(result);
        drop(state);
        self.inner.notify.notify_waiters();
        true
    }

    /// Attempts to cancel the slot.
    ///
    /// Cancelling an already-resolved slot is a no-op: if the slot had
    /// completed, the real result is returned so the caller can honor it.
    pub fn cancel(&self) -> CancelOutcome {
        let mut state = self.lock();
        match *state {
            SlotState::Pending => {
                *state = SlotState::Cancelled;
                drop(state);
                self.inner.notify.notify_waiters();
                CancelOutcome::Cancelled
            }
            SlotState::Done(result) => CancelOutcome::AlreadyDone(result),
            SlotState::Cancelled => CancelOutcome::Cancelled,
        }
    }

    /// The completed result, if the slot resolved with one.
    #[must_use]
    pub fn result(&self) -> Option<EventResult> {
        match *self.lock() {
            SlotState::Done(result) => Some(result),
            SlotState::Pending | SlotState::Cancelled => None,
        }
    }

    /// Whether the slot has resolved (done or cancelled).
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        *self.lock() != SlotState::Pending
    }

    /// Waits up to `limit` for the slot to resolve.
    ///
    /// Returns the completed result, or `None` if the wait timed out or
    /// the slot was cancelled.
    pub async fn wait_for(&self, limit: Duration) -> Option<EventResult> {
        let resolved = async {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            loop {
                notified.as_mut().enable();
                match *self.lock() {
                    SlotState::Done(result) => return Some(result),
                    SlotState::Cancelled => return None,
                    SlotState::Pending => {}
                }
                notified.as_mut().await;
                notified.set(self.inner.notify.notified());
            }
        };
        tokio::time::timeout(limit, resolved).await.unwrap_or(None)
    }
}

impl Default for ResultSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn result(serial_id: i64) -> EventResult {
        EventResult {
            serial_id,
            success: true,
        }
    }

    #[test]
    fn completes_exactly_once() {
        let slot = ResultSlot::new();
        assert!(slot.complete(result(1)));
        assert!(!slot.complete(EventResult {
            serial_id: 1,
            success: false,
        }));

        let Some(first) = slot.result() else {
            panic!("slot should hold the first result");
        };
        assert!(first.success);
    }

    #[test]
    fn cancel_after_complete_returns_the_real_result() {
        let slot = ResultSlot::new();
        assert!(slot.complete(result(2)));

        match slot.cancel() {
            CancelOutcome::AlreadyDone(r) => assert_eq!(r, result(2)),
            CancelOutcome::Cancelled => panic!("cancel must not discard a real result"),
        }
    }

    #[test]
    fn complete_after_cancel_is_rejected() {
        let slot = ResultSlot::new();
        assert_eq!(slot.cancel(), CancelOutcome::Cancelled);
        assert!(!slot.complete(result(3)));
        assert!(slot.result().is_none());
        assert!(slot.is_resolved());
    }

    #[test]
    fn repeated_cancel_is_a_noop() {
        let slot = ResultSlot::new();
        assert_eq!(slot.cancel(), CancelOutcome::Cancelled);
        assert_eq!(slot.cancel(), CancelOutcome::Cancelled);
    }

    #[tokio::test]
    async fn wait_observes_completion_from_another_task() {
        let slot = ResultSlot::new();
        let writer = slot.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            writer.complete(result(4));
        });

        let waited = slot.wait_for(Duration::from_secs(5)).await;
        assert_eq!(waited, Some(result(4)));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_times_out_on_a_pending_slot() {
        let slot = ResultSlot::new();
        let waited = slot.wait_for(Duration::from_millis(50)).await;
        assert!(waited.is_none());
        // The slot itself is still pending; only an explicit cancel resolves it.
        assert!(!slot.is_resolved());
    }

    #[tokio::test]
    async fn wait_returns_none_when_cancelled() {
        let slot = ResultSlot::new();
        let canceller = slot.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let waited = slot.wait_for(Duration::from_secs(5)).await;
        assert!(waited.is_none());
        assert!(slot.is_resolved());
    }

    #[tokio::test]
    async fn wait_returns_immediately_when_already_done() {
        let slot = ResultSlot::new();
        slot.complete(result(5));
        let waited = slot.wait_for(Duration::ZERO).await;
        assert_eq!(waited, Some(result(5)));
    }
}
