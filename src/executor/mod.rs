//! Connection, statement and cursor handling shared by every operation.
//!
//! Each release helper closes one resource and only logs a failure, so releasing a cursor
//! never stops the statement and connection behind it from being released too.

pub(crate) mod batch;
pub(crate) mod prepare;
pub(crate) mod provision;
pub(crate) mod stream;

use crate::driver::{DriverConnection, DriverCursor, DriverStatement};

pub(crate) fn release_cursor(cursor: Box<dyn DriverCursor + '_>) {
    if let Err(err) = cursor.close() {
        tracing::warn!(error = %err, "failed to close cursor");
    }
}

pub(crate) fn release_statement(stmt: Box<dyn DriverStatement + '_>) {
    if let Err(err) = stmt.close() {
        tracing::warn!(error = %err, "failed to close statement");
    }
}

pub(crate) fn release_connection(conn: Box<dyn DriverConnection>) {
    if let Err(err) = conn.close() {
        tracing::warn!(error = %err, "failed to close connection");
    }
}
