use rusqlite::types::Value;

use crate::driver::DriverCursor;
use crate::error::DriverError;
use crate::types::SqlValue;

use super::params::{from_sqlite_ref, to_sqlite_value};
use super::updatable::UpdateTarget;

/// Forward-only cursor over a running `SQLite` query.
///
/// The current row is copied out of the statement on every [`advance`](DriverCursor::advance).
/// When the cursor is updatable, column 0 of the underlying query is the hidden rowid and
/// staged writes are flushed with a keyed `UPDATE` on the same connection.
pub struct SqliteCursor<'s> {
    conn: &'s rusqlite::Connection,
    rows: rusqlite::Rows<'s>,
    columns: Vec<String>,
    current: Option<Vec<SqlValue>>,
    rowid: Option<i64>,
    target: Option<&'s UpdateTarget>,
    pending: Vec<(String, SqlValue)>,
}

impl<'s> SqliteCursor<'s> {
    pub(crate) fn new(
        conn: &'s rusqlite::Connection,
        rows: rusqlite::Rows<'s>,
        columns: Vec<String>,
        target: Option<&'s UpdateTarget>,
    ) -> Self {
        Self {
            conn,
            rows,
            columns,
            current: None,
            rowid: None,
            target,
            pending: Vec::new(),
        }
    }

    fn offset(&self) -> usize {
        usize::from(self.target.is_some())
    }

    fn column_index(&self, column: &str) -> Result<usize, DriverError> {
        self.columns
            .iter()
            .position(|name| name == column)
            .ok_or_else(|| DriverError::UnknownColumn(column.to_owned()))
    }
}

impl DriverCursor for SqliteCursor<'_> {
    fn column_names(&self) -> &[String] {
        &self.columns
    }

    fn advance(&mut self) -> Result<bool, DriverError> {
        let offset = self.offset();
        let width = self.columns.len();
        self.pending.clear();
        let Some(row) = self.rows.next()? else {
            self.current = None;
            self.rowid = None;
            return Ok(false);
        };
        let mut values = Vec::with_capacity(width);
        for idx in 0..width {
            values.push(from_sqlite_ref(row.get_ref(idx + offset)?));
        }
        let rowid = if offset == 1 {
            Some(row.get::<_, i64>(0)?)
        } else {
            None
        };
        self.current = Some(values);
        self.rowid = rowid;
        Ok(true)
    }

    fn value(&self, index: usize) -> Result<SqlValue, DriverError> {
        let current = self.current.as_ref().ok_or(DriverError::NoCurrentRow)?;
        current
            .get(index)
            .cloned()
            .ok_or_else(|| DriverError::UnknownColumn(format!("#{index}")))
    }

    fn update_value(&mut self, column: &str, value: &SqlValue) -> Result<(), DriverError> {
        if self.target.is_none() {
            return Err(DriverError::Unsupported("cursor is read-only".into()));
        }
        let idx = self.column_index(column)?;
        let current = self.current.as_mut().ok_or(DriverError::NoCurrentRow)?;
        current[idx] = value.clone();
        match self.pending.iter_mut().find(|(name, _)| name == column) {
            Some(staged) => staged.1 = value.clone(),
            None => self.pending.push((column.to_owned(), value.clone())),
        }
        Ok(())
    }

    fn update_row(&mut self) -> Result<(), DriverError> {
        let target = self
            .target
            .ok_or_else(|| DriverError::Unsupported("cursor is read-only".into()))?;
        let rowid = self.rowid.ok_or(DriverError::NoCurrentRow)?;
        if self.pending.is_empty() {
            return Ok(());
        }
        let sql = target.update_sql(self.pending.iter().map(|(name, _)| name.as_str()));
        let mut params: Vec<Value> = self
            .pending
            .iter()
            .map(|(_, value)| to_sqlite_value(value))
            .collect();
        params.push(Value::Integer(rowid));
        let changed = self.conn.execute(&sql, rusqlite::params_from_iter(params.iter()))?;
        if changed == 0 {
            return Err(DriverError::Other(format!(
                "row {rowid} of {} no longer exists",
                target.table
            )));
        }
        self.pending.clear();
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), DriverError> {
        // Rows resets the statement when dropped.
        drop(self);
        Ok(())
    }
}
