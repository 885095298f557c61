//! SQLite-backed record store
//!
//! The store is the system of record for the workspace:
//! - Seeded framework catalogs (frameworks, clauses, controls)
//! - Organization records (implementations, tasks, risks, CAPAs, training, members)
//! - Short IDs (PREFIX@N) assigned once at insert time
//!
//! Referential integrity is enforced by SQLite foreign keys.

mod frameworks;
mod members;
mod records;
mod schema;
mod shortid;

pub use frameworks::ControlFilter;
pub(crate) use frameworks::{upsert_implementation, ImplementationUpdate};
pub use records::{CapaFilter, RiskFilter, TaskFilter};
pub(crate) use shortid::{assign_short_id, prune_short_ids};

use std::path::Path;

use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use thiserror::Error;

use crate::core::identity::{EntityPrefix, IdParseError};

/// Current schema version. Opening a database with a higher version fails.
pub const SCHEMA_VERSION: i32 = 1;

/// The record store backed by SQLite
pub struct Store {
    conn: Connection,
}

/// Errors returned by store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{prefix} not found: {reference}")]
    NotFound {
        prefix: EntityPrefix,
        reference: String,
    },

    #[error("invalid {expected} reference '{reference}'")]
    InvalidReference {
        expected: EntityPrefix,
        reference: String,
    },

    #[error("{0}")]
    Conflict(String),

    #[error("database schema version {found} is newer than supported version {supported}; upgrade grc")]
    SchemaTooNew { found: i32, supported: i32 },

    #[error(transparent)]
    Id(#[from] IdParseError),
}

impl StoreError {
    pub(crate) fn not_found(prefix: EntityPrefix, reference: impl Into<String>) -> Self {
        StoreError::NotFound {
            prefix,
            reference: reference.into(),
        }
    }
}

impl Store {
    /// Open or create the database at `path`
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;

        // WAL lets readers proceed while a write is in flight
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let store = Self::from_connection(conn)?;
        tracing::debug!(path = %path.display(), "opened store");
        Ok(store)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Run `f` inside a transaction, committing on success
    pub fn transaction<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Direct access for read-only reporting queries
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Read a text column and parse it with `FromStr`
pub(crate) fn parse_column<T>(row: &Row<'_>, column: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let raw: String = row.get(column)?;
    raw.parse().map_err(|e: String| {
        let index = row.as_ref().column_index(column).unwrap_or_default();
        rusqlite::Error::FromSqlConversionFailure(index, Type::Text, e.into())
    })
}

/// Optional text column, empty strings read as None
pub(crate) fn opt_text(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory_sets_schema_version() {
        let store = Store::open_in_memory().unwrap();
        let version: i32 = store
            .connection()
            .query_row("SELECT version FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_open_file_twice_is_stable() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("grc.db");
        drop(Store::open(&path).unwrap());
        let store = Store::open(&path).unwrap();
        let count: i64 = store
            .connection()
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("grc.db");
        {
            let store = Store::open(&path).unwrap();
            store
                .connection()
                .execute("UPDATE schema_version SET version = ?1", [SCHEMA_VERSION + 1])
                .unwrap();
        }
        let err = Store::open(&path).err().unwrap();
        assert!(matches!(err, StoreError::SchemaTooNew { .. }));
    }

    #[test]
    fn test_unreadable_schema_version_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("grc.db");
        {
            let store = Store::open(&path).unwrap();
            store
                .connection()
                .execute("UPDATE schema_version SET version = 'garbage'", [])
                .unwrap();
        }
        let err = Store::open(&path).err().unwrap();
        assert!(matches!(err, StoreError::Sqlite(_)));
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let store = Store::open_in_memory().unwrap();
        let result: Result<(), StoreError> = store.transaction(|tx| {
            tx.execute(
                "INSERT INTO short_id_counters (prefix, next_id) VALUES ('TASK', 5)",
                [],
            )?;
            Err(StoreError::Conflict("boom".to_string()))
        });
        assert!(result.is_err());

        let count: i64 = store
            .connection()
            .query_row("SELECT COUNT(*) FROM short_id_counters", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
