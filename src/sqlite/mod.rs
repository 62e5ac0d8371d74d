// SQLite driver, built on rusqlite.
//
// - config: address forms and property handling
// - connection: auto-commit emulation, commit/rollback/close
// - prepared: statements, parameter binding and batches
// - query: the forward-only (optionally updatable) cursor
// - updatable: single-table analysis for updatable cursors
// - params: value conversion between SqlValue and rusqlite

pub mod config;
pub mod connection;
pub mod params;
pub mod prepared;
pub mod query;
pub mod updatable;

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};

use rusqlite::OpenFlags;

use crate::driver::{Driver, DriverConnection};
use crate::error::DriverError;

pub use config::SqliteAddress;
pub use connection::SqliteConnection;
pub use prepared::SqlitePrepared;
pub use query::SqliteCursor;

/// Driver for `SQLite` databases.
///
/// `mem://<name>` databases live as long as the driver: the first connection to a name
/// also opens an anchor connection the driver keeps, so data written by one call is visible
/// to the next. Anchors are kept until [`forget_memory_database`](Self::forget_memory_database)
/// is called for the name or the driver is dropped, so callers that generate many names
/// should release the ones they are done with.
#[derive(Default)]
pub struct SqliteDriver {
    anchors: Mutex<HashMap<String, rusqlite::Connection>>,
}

impl SqliteDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn open(target: &str) -> Result<rusqlite::Connection, DriverError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        Ok(rusqlite::Connection::open_with_flags(target, flags)?)
    }

    fn anchor(&self, name: &str, target: &str) -> Result<(), DriverError> {
        let mut anchors = self.anchors.lock().unwrap_or_else(PoisonError::into_inner);
        if !anchors.contains_key(name) {
            let conn = Self::open(target)?;
            tracing::debug!(database = name, "opened shared in-memory database");
            anchors.insert(name.to_owned(), conn);
        }
        Ok(())
    }

    /// Close the anchor of `mem://<name>`. The database is gone once no other connection
    /// to it is open; the next connection to the name starts an empty one. Returns `false`
    /// when the driver held no anchor for the name.
    pub fn forget_memory_database(&self, name: &str) -> bool {
        let removed = self
            .anchors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        let Some(conn) = removed else {
            return false;
        };
        if let Err((_, err)) = conn.close() {
            tracing::warn!(database = name, error = %err, "failed to close shared in-memory database");
        }
        tracing::debug!(database = name, "released shared in-memory database");
        true
    }

    /// Names of the shared in-memory databases this driver keeps alive.
    #[must_use]
    pub fn memory_databases(&self) -> Vec<String> {
        let anchors = self.anchors.lock().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = anchors.keys().cloned().collect();
        names.sort_unstable();
        names
    }
}

impl Driver for SqliteDriver {
    fn connect(
        &self,
        address: &str,
        properties: &BTreeMap<String, String>,
    ) -> Result<Box<dyn DriverConnection>, DriverError> {
        let parsed = SqliteAddress::parse(address)?;
        let target = parsed.open_target();
        if let SqliteAddress::SharedMemory(name) = &parsed {
            self.anchor(name, &target)?;
        }
        let conn = Self::open(&target)?;
        if let Err(err) = config::apply_properties(&conn, properties) {
            if let Err((_, close_err)) = conn.close() {
                tracing::warn!(error = %close_err, "failed to close sqlite connection after setup error");
            }
            return Err(err);
        }
        Ok(Box::new(SqliteConnection::new(conn)))
    }
}
