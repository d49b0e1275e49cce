//! Durable, concurrency-safe issuer of ticket numbers.
//!
//! The counter is the only state that survives a restart. Every increment is a
//! single SQLite write transaction, so numbers stay unique across threads and
//! across processes sharing the same database file.

mod legacy;
mod sqlite;
mod store;

pub use legacy::import_legacy_counter;
pub use sqlite::SqliteSequenceStore;
pub use store::{SequenceError, SequenceStore};
