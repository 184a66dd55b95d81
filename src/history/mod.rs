//! Durable, queryable log of operation records.
//!
//! The history is an append-only NDJSON event log stored in
//! `.reclaim/history/operations.ndjson`. Each line is one `HistoryEntry`:
//!
//! - `created`: a full [`OperationRecord`](crate::record::OperationRecord) as produced by a clean
//! - `status_changed`: a later status transition with its failed items
//!
//! The current state of every record is the replay of the log in order.
//! Nothing is ever rewritten in place, so the log doubles as the audit trail.
//!
//! # Concurrency
//!
//! [`HistoryStore`] serializes writers in-process with a mutex and across
//! processes with the `history.lock` file (see [`crate::locks`]). Reads replay
//! the log without locking; a reader that races an append at worst sees a
//! truncated trailing line, which replay ignores.
//!
//! # Backends
//!
//! Persistence goes through the `HistoryBackend` trait. `NdjsonBackend` is
//! the durable one; an in-memory backend backs unit tests.

mod backend;
mod entry;
mod store;

#[cfg(test)]
mod tests;

#[cfg(test)]
pub(crate) use backend::MemoryBackend;
pub use store::{HistoryFilter, HistoryStore};
