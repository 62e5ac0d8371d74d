use thiserror::Error;

/// Error type callers hand back from row processors, row updaters and units of work.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures reported by a driver implementation.
#[derive(Debug, Error)]
pub enum DriverError {
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("No driver registered under '{0}'")]
    UnknownDriver(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid property: {0}")]
    InvalidProperty(String),

    #[error("Parameter index {index} out of range (statement takes {expected})")]
    ParameterIndex { index: usize, expected: usize },

    #[error("Parameter {index} was never bound (statement takes {expected})")]
    UnboundParameter { index: usize, expected: usize },

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Cursor is not positioned on a row")]
    NoCurrentRow,

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Other driver error: {0}")]
    Other(String),
}

/// Errors surfaced by the engine.
///
/// Every variant is terminal for the call that produced it; cleanup (cursor, statement and
/// connection release plus a best-effort rollback) has already happened by the time the
/// caller sees it.
#[derive(Debug, Error)]
pub enum SimpleSqlError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Connection error: {message}")]
    ConnectionError {
        message: String,
        #[source]
        source: DriverError,
    },

    #[error("Statement error for SQL: {sql}")]
    StatementError {
        sql: String,
        #[source]
        source: DriverError,
    },

    #[error("Query failed for SQL: {sql}")]
    QueryError {
        sql: String,
        #[source]
        source: DriverError,
    },

    #[error("Batch update failed for SQL: {sql}")]
    BatchError {
        sql: String,
        #[source]
        source: DriverError,
    },

    #[error("Failed to process row for SQL: {sql}")]
    ProcessingError {
        sql: String,
        #[source]
        source: BoxError,
    },

    #[error("Transaction failed: {message}")]
    TransactionError {
        message: String,
        #[source]
        source: BoxError,
    },
}

impl SimpleSqlError {
    pub(crate) fn statement(sql: &str, source: DriverError) -> Self {
        SimpleSqlError::StatementError {
            sql: sql.to_owned(),
            source,
        }
    }

    pub(crate) fn query(sql: &str, source: DriverError) -> Self {
        SimpleSqlError::QueryError {
            sql: sql.to_owned(),
            source,
        }
    }

    pub(crate) fn batch(sql: &str, source: DriverError) -> Self {
        SimpleSqlError::BatchError {
            sql: sql.to_owned(),
            source,
        }
    }

    pub(crate) fn processing(sql: &str, source: BoxError) -> Self {
        SimpleSqlError::ProcessingError {
            sql: sql.to_owned(),
            source,
        }
    }

    pub(crate) fn transaction(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        SimpleSqlError::TransactionError {
            message: message.into(),
            source: source.into(),
        }
    }

    /// The SQL text attached to this error, when the failure happened while running one.
    #[must_use]
    pub fn sql(&self) -> Option<&str> {
        match self {
            SimpleSqlError::StatementError { sql, .. }
            | SimpleSqlError::QueryError { sql, .. }
            | SimpleSqlError::BatchError { sql, .. }
            | SimpleSqlError::ProcessingError { sql, .. } => Some(sql),
            _ => None,
        }
    }
}
