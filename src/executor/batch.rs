use crate::driver::{DriverConnection, DriverStatement};
use crate::error::SimpleSqlError;
use crate::metrics::{TransactionMetrics, timed};
use crate::types::{CursorMode, SqlValue};

use super::prepare::{bind_parameters, open_statement};
use super::release_statement;

/// Execute one statement once per parameter set and return the summed affected-row count.
///
/// An empty batch does nothing and returns 0. Otherwise the transaction is marked dirty
/// before the batch goes to the driver, so a failure part way through is rolled back.
pub(crate) fn execute_batch<I, P>(
    conn: &mut dyn DriverConnection,
    sql: &str,
    entries: I,
    metrics: &mut TransactionMetrics,
    dirty: &mut bool,
) -> Result<u64, SimpleSqlError>
where
    I: IntoIterator<Item = P>,
    P: AsRef<[SqlValue]>,
{
    metrics.num_batch_update_calls += 1;
    let mut entries = entries.into_iter().peekable();
    if entries.peek().is_none() {
        tracing::debug!(sql, "empty batch, nothing executed");
        return Ok(0);
    }

    conn.set_read_only(false)
        .map_err(|e| SimpleSqlError::batch(sql, e))?;
    let conn: &dyn DriverConnection = conn;
    let mut stmt = open_statement(conn, sql, CursorMode::ReadOnly, metrics)?;
    let outcome = run_batch(stmt.as_mut(), sql, entries, metrics, dirty);
    release_statement(stmt);
    outcome
}

fn run_batch<P: AsRef<[SqlValue]>>(
    stmt: &mut dyn DriverStatement,
    sql: &str,
    entries: impl Iterator<Item = P>,
    metrics: &mut TransactionMetrics,
    dirty: &mut bool,
) -> Result<u64, SimpleSqlError> {
    let mut queued = 0usize;
    for params in entries {
        bind_parameters(stmt, params.as_ref()).map_err(|e| SimpleSqlError::statement(sql, e))?;
        metrics.num_add_batch_calls += 1;
        timed(&mut metrics.add_batch_time, || stmt.add_batch())
            .map_err(|e| SimpleSqlError::batch(sql, e))?;
        queued += 1;
    }

    *dirty = true;
    let counts = timed(&mut metrics.batch_update_time, || stmt.execute_batch())
        .map_err(|e| SimpleSqlError::batch(sql, e))?;
    let total = counts.into_iter().map(|count| count.unwrap_or(0)).sum();
    tracing::debug!(sql, entries = queued, affected = total, "batch executed");
    Ok(total)
}
