//! Embedded authoritative store (SQLite).
//!
//! Answers the same calls as the clinic API, with the same record shapes,
//! and enforces slot capacity itself.

mod appointments;
mod backend;
mod holidays;
mod implants;
mod patients;
mod schema;

pub use schema::*;

use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

use crate::schedule::DEFAULT_SLOT_CAPACITY;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Slot full: {0}")]
    Capacity(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
    slot_capacity: usize,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> DbResult<Self> {
        // Another connection may hold the write lock during a booking
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        let db = Self {
            conn,
            slot_capacity: DEFAULT_SLOT_CAPACITY,
        };
        db.initialize()?;
        Ok(db)
    }

    /// Override the per-slot capacity this store enforces.
    pub fn with_slot_capacity(mut self, capacity: usize) -> Self {
        self.slot_capacity = capacity;
        self
    }

    pub fn slot_capacity(&self) -> usize {
        self.slot_capacity
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}
