//! Event sources.
//!
//! A [`Source`] answers batch requests asynchronously: the caller submits
//! a one-shot reply sender and is guaranteed an answer, possibly an empty
//! batch, on every path. [`PgSource`] is the production implementation
//! polling the queue table; [`InMemorySource`] generates synthetic events
//! for tests and demos.

mod memory;
mod postgres;

pub use memory::InMemorySource;
pub use postgres::{PgSource, SourceContext};

use tokio::sync::oneshot;

use crate::event::EventBatch;

/// Reply channel for one batch request.
pub type BatchReply = oneshot::Sender<EventBatch>;

/// A producer of event batches.
pub trait Source: Send + Sync + 'static {
    /// Submits one batch request.
    ///
    /// The request is answered asynchronously through `reply`. Every
    /// submitted request is eventually answered — with an empty batch on
    /// connection failure, session failure or after close — so callers
    /// never hang on a pending request.
    fn request_data(&self, reply: BatchReply);
}
