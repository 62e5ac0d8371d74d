use std::time::Instant;

use crate::driver::{DriverConnection, DriverStatement};
use crate::error::{DriverError, SimpleSqlError};
use crate::metrics::TransactionMetrics;
use crate::types::{CursorMode, SqlValue};

use super::release_statement;

/// Prepare `sql` without binding anything.
pub(crate) fn open_statement<'c>(
    conn: &'c dyn DriverConnection,
    sql: &str,
    mode: CursorMode,
    metrics: &mut TransactionMetrics,
) -> Result<Box<dyn DriverStatement + 'c>, SimpleSqlError> {
    let start = Instant::now();
    let prepared = conn.prepare(sql, mode);
    metrics.prepared_statement_time += start.elapsed();
    let stmt = prepared.map_err(|e| SimpleSqlError::statement(sql, e))?;
    metrics.num_prepared_statement_calls += 1;
    tracing::debug!(sql, ?mode, "statement prepared");
    Ok(stmt)
}

/// Bind `params` positionally from index 1. Byte values go through the binary path.
pub(crate) fn bind_parameters(
    stmt: &mut dyn DriverStatement,
    params: &[SqlValue],
) -> Result<(), DriverError> {
    for (offset, value) in params.iter().enumerate() {
        let index = offset + 1;
        match value {
            SqlValue::Bytes(bytes) => stmt.bind_binary(index, bytes)?,
            other => stmt.bind(index, other)?,
        }
    }
    Ok(())
}

/// Fail when the driver reports more parameters than `params` supplies.
fn check_all_bound(stmt: &dyn DriverStatement, params: &[SqlValue]) -> Result<(), DriverError> {
    match stmt.parameter_count() {
        Some(expected) if params.len() < expected => Err(DriverError::UnboundParameter {
            index: params.len() + 1,
            expected,
        }),
        _ => Ok(()),
    }
}

/// Prepare and bind every parameter. A statement that fails to bind is closed before the
/// error is returned.
pub(crate) fn prepare_statement<'c>(
    conn: &'c dyn DriverConnection,
    sql: &str,
    params: &[SqlValue],
    mode: CursorMode,
    metrics: &mut TransactionMetrics,
) -> Result<Box<dyn DriverStatement + 'c>, SimpleSqlError> {
    let mut stmt = open_statement(conn, sql, mode, metrics)?;
    let bound = bind_parameters(stmt.as_mut(), params)
        .and_then(|()| check_all_bound(stmt.as_ref(), params));
    if let Err(err) = bound {
        release_statement(stmt);
        return Err(SimpleSqlError::statement(sql, err));
    }
    Ok(stmt)
}
