use std::time::Instant;

use crate::driver::{DriverConnection, DriverCursor, DriverStatement};
use crate::error::{BoxError, SimpleSqlError};
use crate::metrics::{TransactionMetrics, timed};
use crate::results::{Row, changed_fields};
use crate::types::{CursorMode, IsolationLevel, SqlValue};

use super::prepare::prepare_statement;
use super::{release_cursor, release_statement};

/// Receives each row in turn; `Ok(false)` stops the stream.
pub(crate) type RowProcessor<'a> = dyn FnMut(Row) -> Result<bool, BoxError> + 'a;

/// Edits a row in place; `Ok(true)` asks for the edits to be written back.
pub(crate) type RowUpdater<'a> = dyn FnMut(&mut Row) -> Result<bool, BoxError> + 'a;

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct StreamOutcome {
    pub rows: usize,
    pub rows_updated: usize,
}

/// Run `sql` and hand its rows to `processor` until it declines or the rows run out.
///
/// With an `updater` the cursor is opened updatable and every row passes through the
/// updater before the processor sees it. Rows the updater accepts have their changed
/// columns written back and mark the transaction dirty.
pub(crate) fn stream_rows(
    conn: &mut dyn DriverConnection,
    sql: &str,
    params: &[SqlValue],
    updater: Option<&mut RowUpdater<'_>>,
    processor: &mut RowProcessor<'_>,
    metrics: &mut TransactionMetrics,
    dirty: &mut bool,
) -> Result<StreamOutcome, SimpleSqlError> {
    let mode = if updater.is_some() {
        CursorMode::Updatable
    } else {
        CursorMode::ReadOnly
    };
    metrics.num_execute_query_calls += 1;

    conn.set_read_only(!mode.is_updatable())
        .map_err(|e| SimpleSqlError::query(sql, e))?;
    if mode.is_updatable() {
        conn.set_isolation_level(IsolationLevel::ReadCommitted)
            .map_err(|e| SimpleSqlError::query(sql, e))?;
    }

    let conn: &dyn DriverConnection = conn;
    let mut stmt = prepare_statement(conn, sql, params, mode, metrics)?;
    let outcome = run_cursor(stmt.as_mut(), sql, updater, processor, metrics, dirty);
    release_statement(stmt);

    if let Ok(done) = &outcome {
        tracing::debug!(sql, rows = done.rows, updated = done.rows_updated, "query finished");
    }
    outcome
}

fn run_cursor(
    stmt: &mut dyn DriverStatement,
    sql: &str,
    updater: Option<&mut RowUpdater<'_>>,
    processor: &mut RowProcessor<'_>,
    metrics: &mut TransactionMetrics,
    dirty: &mut bool,
) -> Result<StreamOutcome, SimpleSqlError> {
    let start = Instant::now();
    let opened = stmt.execute_query();
    metrics.execute_query_time += start.elapsed();
    let mut cursor = opened.map_err(|e| SimpleSqlError::query(sql, e))?;

    let outcome = fetch_rows(cursor.as_mut(), sql, updater, processor, metrics, dirty);
    release_cursor(cursor);
    outcome
}

fn fetch_rows(
    cursor: &mut dyn DriverCursor,
    sql: &str,
    mut updater: Option<&mut RowUpdater<'_>>,
    processor: &mut RowProcessor<'_>,
    metrics: &mut TransactionMetrics,
    dirty: &mut bool,
) -> Result<StreamOutcome, SimpleSqlError> {
    let columns = cursor.column_names().to_vec();
    let mut outcome = StreamOutcome::default();

    // checked before advancing so a stop never fetches one row too many
    let mut keep_going = true;
    while keep_going && cursor.advance().map_err(|e| SimpleSqlError::query(sql, e))? {
        let mut row = materialize(cursor, &columns).map_err(|e| SimpleSqlError::query(sql, e))?;
        outcome.rows += 1;

        if let Some(update) = updater.as_deref_mut() {
            if apply_update(cursor, &mut row, update, sql, metrics, dirty)? {
                outcome.rows_updated += 1;
            }
        }

        keep_going = processor(row).map_err(|e| SimpleSqlError::processing(sql, e))?;
    }
    Ok(outcome)
}

fn materialize(
    cursor: &dyn DriverCursor,
    columns: &[String],
) -> Result<Row, crate::error::DriverError> {
    let mut values = Vec::with_capacity(columns.len());
    for index in 0..columns.len() {
        values.push(cursor.value(index)?);
    }
    Ok(Row::from_columns(columns, values))
}

/// Returns `true` when a write-back happened.
fn apply_update(
    cursor: &mut dyn DriverCursor,
    row: &mut Row,
    updater: &mut RowUpdater<'_>,
    sql: &str,
    metrics: &mut TransactionMetrics,
    dirty: &mut bool,
) -> Result<bool, SimpleSqlError> {
    let snapshot = row.snapshot();
    let accepted = updater(&mut *row).map_err(|e| SimpleSqlError::processing(sql, e))?;
    if !accepted {
        return Ok(false);
    }

    let mut changed = 0usize;
    for (column, value) in changed_fields(row, &snapshot) {
        cursor
            .update_value(column, value)
            .map_err(|e| SimpleSqlError::query(sql, e))?;
        changed += 1;
    }
    if changed == 0 {
        return Ok(false);
    }

    *dirty = true;
    metrics.num_update_row_calls += 1;
    timed(&mut metrics.update_row_time, || cursor.update_row())
        .map_err(|e| SimpleSqlError::query(sql, e))?;
    tracing::debug!(sql, columns = changed, "row written back");
    Ok(true)
}
