//! # pg-relay
//!
//! Database-backed, at-least-once event relay over PostgreSQL.
//!
//! A [`PgSource`](source::PgSource) polls the queue table for pending
//! events with `FOR UPDATE SKIP LOCKED` and offers them to a consumer
//! under a bounded session — one open transaction per batch, rows deleted
//! only when acknowledged before the shared session budget runs out. A
//! [`PgSink`](sink::PgSink) requests those batches and persists each
//! event idempotently into the sink table, acknowledging it back through
//! a single-resolution result slot.
//!
//! ## Architecture
//!
//! ```text
//! Producers ──insert──> domain_out
//!                          │
//!                   PgSource (source/)
//!                     │ skip-locked select, session ack/timeout
//!                     │
//!                 EventBatch / ResultSlot (event/)
//!                     │
//!                   PgSink (sink/)
//!                     │ idempotent insert, per-event ack
//!                     │
//!                       domain_sink
//! ```
//!
//! Unacknowledged rows stay in `domain_out` and are redelivered once the
//! holding transaction ends; the sink's insert is keyed by `serial_id`,
//! so a redelivered event is acknowledged without a second copy.

pub mod config;
pub mod db;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod producer;
pub mod sink;
pub mod source;
