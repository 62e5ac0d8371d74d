//! Convenient imports for common functionality.
//!
//! ```
//! use simple_sql::prelude::*;
//! ```

pub use crate::config::ConnectionParameters;
pub use crate::engine::SimpleSql;
pub use crate::error::{BoxError, SimpleSqlError};
pub use crate::metrics::TimingSummary;
pub use crate::results::Row;
pub use crate::transaction::Transaction;
pub use crate::types::SqlValue;

#[cfg(feature = "sqlite")]
pub use crate::sqlite::SqliteDriver;
