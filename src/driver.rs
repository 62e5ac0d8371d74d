//! Driver abstraction the engine runs on.
//!
//! A driver turns an address plus properties into a [`DriverConnection`]. Statements borrow
//! their connection and cursors borrow their statement, so a cursor can never outlive the
//! statement that produced it, nor a statement its connection.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::DriverError;
use crate::types::{CursorMode, IsolationLevel, SqlValue};

/// Entry point of a database driver.
pub trait Driver: Send + Sync {
    /// Open a new connection. Implementations must not leak a half-open handle on failure.
    ///
    /// # Errors
    /// Returns `DriverError` if the address is invalid or the connection cannot be opened.
    fn connect(
        &self,
        address: &str,
        properties: &BTreeMap<String, String>,
    ) -> Result<Box<dyn DriverConnection>, DriverError>;
}

/// A live connection owned by exactly one caller.
pub trait DriverConnection {
    /// Turn auto-commit on or off. With auto-commit off, changes stay pending until
    /// [`commit`](Self::commit) or [`rollback`](Self::rollback).
    ///
    /// # Errors
    /// Returns `DriverError` if the driver rejects the change.
    fn set_auto_commit(&mut self, auto_commit: bool) -> Result<(), DriverError>;

    /// Hint that the following statements only read.
    ///
    /// # Errors
    /// Returns `DriverError` if the driver rejects the change.
    fn set_read_only(&mut self, read_only: bool) -> Result<(), DriverError>;

    /// # Errors
    /// Returns `DriverError` if the level cannot be applied.
    fn set_isolation_level(&mut self, level: IsolationLevel) -> Result<(), DriverError>;

    /// Prepare `sql` for a forward-only cursor in the given mode.
    ///
    /// # Errors
    /// Returns `DriverError` if the SQL cannot be prepared or the mode is not supported for it.
    fn prepare<'c>(
        &'c self,
        sql: &str,
        mode: CursorMode,
    ) -> Result<Box<dyn DriverStatement + 'c>, DriverError>;

    /// # Errors
    /// Returns `DriverError` if the commit fails.
    fn commit(&mut self) -> Result<(), DriverError>;

    /// # Errors
    /// Returns `DriverError` if the rollback fails.
    fn rollback(&mut self) -> Result<(), DriverError>;

    /// # Errors
    /// Returns `DriverError` if the handle could not be closed cleanly.
    fn close(self: Box<Self>) -> Result<(), DriverError>;
}

/// A prepared statement with positional (1-based) parameters.
pub trait DriverStatement {
    /// # Errors
    /// Returns `DriverError` if the index is out of range or the value cannot be bound.
    fn bind(&mut self, index: usize, value: &SqlValue) -> Result<(), DriverError>;

    /// Binary/stream bind path, used for byte parameters.
    ///
    /// # Errors
    /// Returns `DriverError` if the index is out of range or the value cannot be bound.
    fn bind_binary(&mut self, index: usize, bytes: &[u8]) -> Result<(), DriverError> {
        self.bind(index, &SqlValue::Bytes(bytes.to_vec()))
    }

    /// Number of positional parameters the statement takes, when the driver knows it.
    fn parameter_count(&self) -> Option<usize> {
        None
    }

    /// Run the statement and open a cursor over its results.
    ///
    /// # Errors
    /// Returns `DriverError` if execution fails.
    fn execute_query<'s>(&'s mut self) -> Result<Box<dyn DriverCursor + 's>, DriverError>;

    /// Queue the currently bound parameters as one batch entry.
    ///
    /// # Errors
    /// Returns `DriverError` if the entry cannot be queued.
    fn add_batch(&mut self) -> Result<(), DriverError>;

    /// Execute every queued entry. Each element is the entry's affected-row count, or
    /// `None` when the driver cannot tell.
    ///
    /// # Errors
    /// Returns `DriverError` if any entry fails.
    fn execute_batch(&mut self) -> Result<Vec<Option<u64>>, DriverError>;

    /// # Errors
    /// Returns `DriverError` if the statement could not be released cleanly.
    fn close(self: Box<Self>) -> Result<(), DriverError>;
}

/// A forward-only cursor. Updatable cursors accept column writes for the current row.
pub trait DriverCursor {
    /// Result column names, in result order.
    fn column_names(&self) -> &[String];

    /// Move to the next row. Returns `false` once the results are exhausted.
    ///
    /// # Errors
    /// Returns `DriverError` if fetching fails.
    fn advance(&mut self) -> Result<bool, DriverError>;

    /// Value of the current row at a 0-based column index.
    ///
    /// # Errors
    /// Returns `DriverError` if there is no current row or the index is out of range.
    fn value(&self, index: usize) -> Result<SqlValue, DriverError>;

    /// Stage a new value for one column of the current row.
    ///
    /// # Errors
    /// Returns `DriverError` on read-only cursors, unknown columns or without a current row.
    fn update_value(&mut self, column: &str, value: &SqlValue) -> Result<(), DriverError> {
        let _ = (column, value);
        Err(DriverError::Unsupported("cursor is read-only".into()))
    }

    /// Write the staged column values of the current row.
    ///
    /// # Errors
    /// Returns `DriverError` on read-only cursors or if the write fails.
    fn update_row(&mut self) -> Result<(), DriverError> {
        Err(DriverError::Unsupported("cursor is read-only".into()))
    }

    /// # Errors
    /// Returns `DriverError` if the cursor could not be released cleanly.
    fn close(self: Box<Self>) -> Result<(), DriverError>;
}

/// Drivers by the identity `ConnectionParameters::driver` names them with.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn Driver>>,
}

impl DriverRegistry {
    /// Register `driver` under `name`, replacing any driver already registered there.
    pub fn register(&mut self, name: impl Into<String>, driver: Arc<dyn Driver>) {
        self.drivers.insert(name.into(), driver);
    }

    /// Look a driver up by name; surrounding whitespace is ignored.
    ///
    /// # Errors
    /// Returns `DriverError::UnknownDriver` when nothing is registered under `name`.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Driver>, DriverError> {
        self.drivers
            .get(name.trim())
            .cloned()
            .ok_or_else(|| DriverError::UnknownDriver(name.to_owned()))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.drivers.contains_key(name.trim())
    }

    /// Registered names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.drivers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.names())
            .finish()
    }
}
