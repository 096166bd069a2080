//! Event sinks.
//!
//! A sink drives its own loop: request a batch from the upstream source,
//! persist or process each event, complete each event's result slot, then
//! sleep the batch's advisory delay before the next request. [`PgSink`]
//! persists events idempotently into the sink table; [`SimpleSink`] just
//! acknowledges everything.

mod postgres;
mod simple;

pub use postgres::{PgSink, SinkContext};
pub use simple::SimpleSink;
