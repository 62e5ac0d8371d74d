//! Run SQL through pluggable drivers without managing connections, statements or cursors.
//!
//! [`SimpleSql`] opens a connection for every call, runs the statement and releases every
//! handle before returning. Results come back as [`Row`]s keyed by column name. Several
//! operations can share one connection and commit together via
//! [`SimpleSql::with_transaction`].

pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
mod executor;
pub mod metrics;
pub mod prelude;
pub mod results;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod transaction;
pub mod types;

pub use config::ConnectionParameters;
pub use driver::{Driver, DriverConnection, DriverCursor, DriverRegistry, DriverStatement};
pub use engine::SimpleSql;
pub use error::{BoxError, DriverError, SimpleSqlError};
pub use metrics::{TimingSummary, TransactionMetrics};
pub use results::{Row, RowSnapshot, changed_fields, field_differs};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDriver;
pub use transaction::Transaction;
pub use types::{CursorMode, IsolationLevel, SqlValue};
