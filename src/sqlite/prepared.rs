use rusqlite::types::Value;

use crate::driver::{DriverCursor, DriverStatement};
use crate::error::DriverError;
use crate::types::{CursorMode, SqlValue};

use super::params::to_sqlite_value;
use super::query::SqliteCursor;
use super::updatable::UpdateTarget;

/// Prepared statement on a `SQLite` connection.
///
/// Parameters are held until execution so the same statement can be re-bound for every
/// batch entry.
pub struct SqlitePrepared<'c> {
    conn: &'c rusqlite::Connection,
    stmt: rusqlite::Statement<'c>,
    bound: Vec<Value>,
    batch: Vec<Vec<Value>>,
    target: Option<UpdateTarget>,
}

impl<'c> SqlitePrepared<'c> {
    pub(crate) fn new(
        conn: &'c rusqlite::Connection,
        sql: &str,
        mode: CursorMode,
    ) -> Result<Self, DriverError> {
        let target = match mode {
            CursorMode::ReadOnly => None,
            CursorMode::Updatable => Some(UpdateTarget::from_select(sql)?),
        };
        let stmt = match &target {
            Some(target) => conn.prepare(&target.rewritten_sql)?,
            None => conn.prepare(sql)?,
        };
        let bound = vec![Value::Null; stmt.parameter_count()];
        Ok(Self {
            conn,
            stmt,
            bound,
            batch: Vec::new(),
            target,
        })
    }

    fn slot(&mut self, index: usize) -> Result<&mut Value, DriverError> {
        let expected = self.bound.len();
        if index == 0 || index > expected {
            return Err(DriverError::ParameterIndex { index, expected });
        }
        Ok(&mut self.bound[index - 1])
    }
}

impl DriverStatement for SqlitePrepared<'_> {
    fn bind(&mut self, index: usize, value: &SqlValue) -> Result<(), DriverError> {
        *self.slot(index)? = to_sqlite_value(value);
        Ok(())
    }

    fn bind_binary(&mut self, index: usize, bytes: &[u8]) -> Result<(), DriverError> {
        *self.slot(index)? = Value::Blob(bytes.to_vec());
        Ok(())
    }

    fn execute_query<'s>(&'s mut self) -> Result<Box<dyn DriverCursor + 's>, DriverError> {
        let mut columns: Vec<String> = self
            .stmt
            .column_names()
            .into_iter()
            .map(str::to_owned)
            .collect();
        if self.target.is_some() && !columns.is_empty() {
            columns.remove(0);
        }
        let rows = self.stmt.query(rusqlite::params_from_iter(self.bound.iter()))?;
        Ok(Box::new(SqliteCursor::new(
            self.conn,
            rows,
            columns,
            self.target.as_ref(),
        )))
    }

    fn parameter_count(&self) -> Option<usize> {
        Some(self.bound.len())
    }

    fn add_batch(&mut self) -> Result<(), DriverError> {
        // every entry starts from unbound (NULL) slots
        let fresh = vec![Value::Null; self.bound.len()];
        self.batch.push(std::mem::replace(&mut self.bound, fresh));
        Ok(())
    }

    fn execute_batch(&mut self) -> Result<Vec<Option<u64>>, DriverError> {
        let entries = std::mem::take(&mut self.batch);
        let mut counts = Vec::with_capacity(entries.len());
        for entry in &entries {
            let changed = self.stmt.execute(rusqlite::params_from_iter(entry.iter()))?;
            counts.push(u64::try_from(changed).ok());
        }
        Ok(counts)
    }

    fn close(self: Box<Self>) -> Result<(), DriverError> {
        self.stmt.finalize()?;
        Ok(())
    }
}
