use thiserror::Error;

use crate::ticket::TicketNumber;

#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Sequence lock poisoned")]
    Poisoned,

    #[error("Invalid legacy counter file {path}: {reason}")]
    LegacyCounter { path: String, reason: String },
}

impl From<rusqlite::Error> for SequenceError {
    fn from(e: rusqlite::Error) -> Self {
        SequenceError::Database(e.to_string())
    }
}

/// Issuer of ticket numbers.
///
/// Implementations must never return the same number twice, including across
/// restarts, and start at 1 when no prior state exists.
pub trait SequenceStore: Send + Sync {
    /// Atomically advance the counter and return the new value.
    fn next(&self) -> Result<TicketNumber, SequenceError>;

    /// Last issued value, 0 if nothing was issued yet.
    fn current(&self) -> Result<u64, SequenceError>;
}
