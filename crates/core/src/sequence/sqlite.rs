//! SQLite-backed sequence store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::{SequenceError, SequenceStore};
use crate::ticket::TicketNumber;

/// How long a writer waits for another process holding the database lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed sequence store.
///
/// The in-process mutex serializes callers sharing this instance; the
/// `BEGIN IMMEDIATE` transaction serializes writers from other connections and
/// other processes on the same file.
pub struct SqliteSequenceStore {
    conn: Mutex<Connection>,
}

impl SqliteSequenceStore {
    /// Open (or create) the sequence table in the database at `path`.
    pub fn new(path: &Path) -> Result<Self, SequenceError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory sequence store (useful for testing).
    pub fn in_memory() -> Result<Self, SequenceError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), SequenceError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS ticket_sequence (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                value INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SequenceError> {
        self.conn.lock().map_err(|_| SequenceError::Poisoned)
    }

    /// Raise the counter to at least `floor`. Never lowers it.
    ///
    /// Returns the counter value after the call.
    pub fn raise_to(&self, floor: u64) -> Result<u64, SequenceError> {
        let floor = i64::try_from(floor)
            .map_err(|_| SequenceError::Database(format!("counter value {} out of range", floor)))?;

        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value: i64 = tx.query_row(
            "INSERT INTO ticket_sequence (id, value) VALUES (1, ?1)
             ON CONFLICT(id) DO UPDATE SET value = MAX(value, excluded.value)
             RETURNING value",
            params![floor],
            |row| row.get(0),
        )?;
        tx.commit()?;

        Ok(value as u64)
    }
}

impl SequenceStore for SqliteSequenceStore {
    fn next(&self) -> Result<TicketNumber, SequenceError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value: i64 = tx.query_row(
            "INSERT INTO ticket_sequence (id, value) VALUES (1, 1)
             ON CONFLICT(id) DO UPDATE SET value = value + 1
             RETURNING value",
            [],
            |row| row.get(0),
        )?;
        tx.commit()?;

        tracing::debug!(value, "Issued ticket number");
        Ok(TicketNumber(value as u64))
    }

    fn current(&self) -> Result<u64, SequenceError> {
        let conn = self.lock()?;
        let value: Option<i64> = conn
            .query_row("SELECT value FROM ticket_sequence WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value.unwrap_or(0) as u64)
    }
}
