use std::time::Duration;

use crate::driver::DriverConnection;
use crate::error::{BoxError, SimpleSqlError};
use crate::executor::batch::execute_batch;
use crate::executor::release_connection;
use crate::executor::stream::{RowProcessor, RowUpdater, StreamOutcome, stream_rows};
use crate::metrics::{TransactionMetrics, timed};
use crate::results::Row;
use crate::types::SqlValue;

/// One connection and the unit of work running on it.
///
/// Handed to the closure passed to [`SimpleSql::with_transaction`](crate::SimpleSql::with_transaction).
/// Every operation runs on the same connection; nothing is committed until the closure
/// returns `Ok(true)` or calls [`commit`](Self::commit).
pub struct Transaction {
    conn: Box<dyn DriverConnection>,
    uncommitted_changes: bool,
    metrics: TransactionMetrics,
}

impl Transaction {
    pub(crate) fn new(conn: Box<dyn DriverConnection>, connection_time: Duration) -> Self {
        Self {
            conn,
            uncommitted_changes: false,
            metrics: TransactionMetrics {
                connection_time,
                ..TransactionMetrics::default()
            },
        }
    }

    /// First row of `sql`, or `None` when it returns nothing. No further row is fetched.
    ///
    /// # Errors
    /// `StatementError` when preparing or binding fails, `QueryError` when execution fails.
    pub fn query_first(&mut self, sql: &str, params: &[SqlValue]) -> Result<Option<Row>, SimpleSqlError> {
        self.first_row(sql, params, None)
    }

    /// Every row of `sql`, in result order.
    ///
    /// # Errors
    /// `StatementError` when preparing or binding fails, `QueryError` when execution fails.
    pub fn query_as_list(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, SimpleSqlError> {
        let mut rows = Vec::new();
        self.run_query(sql, params, None, &mut |row| {
            rows.push(row);
            Ok(true)
        })?;
        Ok(rows)
    }

    /// Stream the rows of `sql` into `processor` until it returns `Ok(false)`.
    ///
    /// # Errors
    /// `ProcessingError` when the processor fails; otherwise as [`query_first`](Self::query_first).
    pub fn query<F>(&mut self, sql: &str, params: &[SqlValue], mut processor: F) -> Result<(), SimpleSqlError>
    where
        F: FnMut(Row) -> Result<bool, BoxError>,
    {
        self.run_query(sql, params, None, &mut processor).map(|_| ())
    }

    /// Open `sql` through an updatable cursor and let `updater` edit the first row.
    ///
    /// When the updater returns `Ok(true)` the columns whose values changed are written
    /// back through the cursor. Returns the row as the updater left it.
    ///
    /// # Errors
    /// `ProcessingError` when the updater fails, `QueryError` when the driver cannot open an
    /// updatable cursor for `sql` or the write-back fails.
    pub fn fetch_for_update<U>(
        &mut self,
        sql: &str,
        params: &[SqlValue],
        mut updater: U,
    ) -> Result<Option<Row>, SimpleSqlError>
    where
        U: FnMut(&mut Row) -> Result<bool, BoxError>,
    {
        self.first_row(sql, params, Some(&mut updater))
    }

    /// Run `sql` once per parameter set as a batch. Returns the total affected-row count.
    ///
    /// # Errors
    /// `StatementError` when a parameter set cannot be bound, `BatchError` when queueing or
    /// executing the batch fails.
    pub fn batch_update<I, P>(&mut self, sql: &str, entries: I) -> Result<u64, SimpleSqlError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[SqlValue]>,
    {
        execute_batch(
            self.conn.as_mut(),
            sql,
            entries,
            &mut self.metrics,
            &mut self.uncommitted_changes,
        )
    }

    /// Commit pending changes. Does nothing when there are none.
    ///
    /// # Errors
    /// `TransactionError` when the driver fails to commit.
    pub fn commit(&mut self) -> Result<(), SimpleSqlError> {
        if !self.uncommitted_changes {
            return Ok(());
        }
        timed(&mut self.metrics.commit_time, || self.conn.commit())
            .map_err(|e| SimpleSqlError::transaction("commit failed", e))?;
        self.uncommitted_changes = false;
        Ok(())
    }

    /// Roll back pending changes. Does nothing when there are none.
    ///
    /// # Errors
    /// `TransactionError` when the driver fails to roll back.
    pub fn rollback(&mut self) -> Result<(), SimpleSqlError> {
        if !self.uncommitted_changes {
            return Ok(());
        }
        self.conn
            .rollback()
            .map_err(|e| SimpleSqlError::transaction("rollback failed", e))?;
        self.uncommitted_changes = false;
        Ok(())
    }

    #[must_use]
    pub fn has_uncommitted_changes(&self) -> bool {
        self.uncommitted_changes
    }

    #[must_use]
    pub fn metrics(&self) -> &TransactionMetrics {
        &self.metrics
    }

    /// Close the connection and hand back the collected metrics.
    pub(crate) fn close(self) -> TransactionMetrics {
        release_connection(self.conn);
        self.metrics
    }

    fn first_row(
        &mut self,
        sql: &str,
        params: &[SqlValue],
        updater: Option<&mut RowUpdater<'_>>,
    ) -> Result<Option<Row>, SimpleSqlError> {
        let mut first = None;
        self.run_query(sql, params, updater, &mut |row| {
            first = Some(row);
            Ok(false)
        })?;
        Ok(first)
    }

    fn run_query(
        &mut self,
        sql: &str,
        params: &[SqlValue],
        updater: Option<&mut RowUpdater<'_>>,
        processor: &mut RowProcessor<'_>,
    ) -> Result<StreamOutcome, SimpleSqlError> {
        stream_rows(
            self.conn.as_mut(),
            sql,
            params,
            updater,
            processor,
            &mut self.metrics,
            &mut self.uncommitted_changes,
        )
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("uncommitted_changes", &self.uncommitted_changes)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}
