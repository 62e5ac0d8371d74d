use std::sync::Arc;
use std::time::Instant;

use crate::config::ConnectionParameters;
use crate::driver::{Driver, DriverRegistry};
use crate::error::{BoxError, SimpleSqlError};
use crate::executor::provision::acquire_connection;
use crate::metrics::TimingSummary;
use crate::results::Row;
use crate::transaction::Transaction;
use crate::types::SqlValue;

/// Entry point: runs statements against whatever driver the connection parameters name.
///
/// Every call opens its own connection and closes it before returning. Stand-alone calls
/// commit their own writes; [`with_transaction`](Self::with_transaction) groups several
/// operations on one connection.
///
/// ```no_run
/// use simple_sql::{ConnectionParameters, SimpleSql, SqlValue};
///
/// # fn main() -> Result<(), simple_sql::SimpleSqlError> {
/// let sql = SimpleSql::new();
/// let params = ConnectionParameters::new("sqlite", "mem://demo");
/// sql.batch_update(&params, "CREATE TABLE t (id INTEGER, name TEXT)", [Vec::<SqlValue>::new()])?;
/// sql.batch_update(
///     &params,
///     "INSERT INTO t (id, name) VALUES (?, ?)",
///     [vec![SqlValue::from(1), SqlValue::from("one")]],
/// )?;
/// let row = sql.query_first(&params, "SELECT name FROM t WHERE id = ?", &[SqlValue::from(1)])?;
/// assert_eq!(row.and_then(|r| r.get("name").cloned()), Some(SqlValue::from("one")));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SimpleSql {
    registry: DriverRegistry,
}

impl Default for SimpleSql {
    fn default() -> Self {
        Self::new()
    }
}

impl SimpleSql {
    /// An engine with the built-in drivers registered (`sqlite` when that feature is on).
    #[must_use]
    pub fn new() -> Self {
        #[allow(unused_mut)]
        let mut registry = DriverRegistry::default();
        #[cfg(feature = "sqlite")]
        registry.register("sqlite", Arc::new(crate::sqlite::SqliteDriver::new()));
        Self { registry }
    }

    /// An engine with no drivers at all.
    #[must_use]
    pub fn without_drivers() -> Self {
        Self {
            registry: DriverRegistry::default(),
        }
    }

    #[must_use]
    pub fn with_driver(mut self, name: impl Into<String>, driver: impl Driver + 'static) -> Self {
        self.registry.register(name, Arc::new(driver));
        self
    }

    /// Register an already shared driver, e.g. to make one instance reachable under two names.
    pub fn register_driver(&mut self, name: impl Into<String>, driver: Arc<dyn Driver>) {
        self.registry.register(name, driver);
    }

    #[must_use]
    pub fn drivers(&self) -> &DriverRegistry {
        &self.registry
    }

    /// First row of `sql`, or `None`.
    ///
    /// # Errors
    /// Configuration and connection failures, plus those of [`Transaction::query_first`].
    pub fn query_first(
        &self,
        params: &ConnectionParameters,
        sql: &str,
        values: &[SqlValue],
    ) -> Result<Option<Row>, SimpleSqlError> {
        self.run_standalone(params, |txn| txn.query_first(sql, values))
    }

    /// Every row of `sql`.
    ///
    /// # Errors
    /// Configuration and connection failures, plus those of [`Transaction::query_as_list`].
    pub fn query_as_list(
        &self,
        params: &ConnectionParameters,
        sql: &str,
        values: &[SqlValue],
    ) -> Result<Vec<Row>, SimpleSqlError> {
        self.run_standalone(params, |txn| txn.query_as_list(sql, values))
    }

    /// Stream rows into `processor` until it returns `Ok(false)`.
    ///
    /// # Errors
    /// Configuration and connection failures, plus those of [`Transaction::query`].
    pub fn query<F>(
        &self,
        params: &ConnectionParameters,
        sql: &str,
        values: &[SqlValue],
        processor: F,
    ) -> Result<(), SimpleSqlError>
    where
        F: FnMut(Row) -> Result<bool, BoxError>,
    {
        self.run_standalone(params, move |txn| txn.query(sql, values, processor))
    }

    /// Edit the first row of `sql` through an updatable cursor and commit the change.
    ///
    /// # Errors
    /// Configuration and connection failures, plus those of [`Transaction::fetch_for_update`].
    pub fn fetch_for_update<U>(
        &self,
        params: &ConnectionParameters,
        sql: &str,
        values: &[SqlValue],
        updater: U,
    ) -> Result<Option<Row>, SimpleSqlError>
    where
        U: FnMut(&mut Row) -> Result<bool, BoxError>,
    {
        self.run_standalone(params, move |txn| txn.fetch_for_update(sql, values, updater))
    }

    /// Run `sql` once per parameter set and commit. Returns the total affected-row count.
    ///
    /// # Errors
    /// Configuration and connection failures, plus those of [`Transaction::batch_update`].
    pub fn batch_update<I, P>(&self, params: &ConnectionParameters, sql: &str, entries: I) -> Result<u64, SimpleSqlError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[SqlValue]>,
    {
        self.run_standalone(params, move |txn| txn.batch_update(sql, entries))
    }

    /// Run `unit_of_work` on one connection. `Ok(true)` commits, `Ok(false)` rolls back.
    ///
    /// The connection is always rolled back (a no-op after a commit) and closed before this
    /// returns. On success the timings and counters of the transaction are returned.
    ///
    /// # Errors
    /// Configuration and connection failures as is; a failing unit of work, commit or
    /// rollback as `TransactionError`.
    pub fn with_transaction<W>(&self, params: &ConnectionParameters, unit_of_work: W) -> Result<TimingSummary, SimpleSqlError>
    where
        W: FnOnce(&mut Transaction) -> Result<bool, BoxError>,
    {
        let mut txn = self.open_transaction(params)?;
        let outcome = run_unit_of_work(&mut txn, unit_of_work);
        let summary = finish(txn);

        match outcome {
            Ok(()) => {
                tracing::debug!(database = %params.describe(), %summary, "transaction finished");
                Ok(summary)
            }
            Err(err) => {
                tracing::error!(database = %params.describe(), error = %err, "transaction failed");
                Err(err)
            }
        }
    }

    fn open_transaction(&self, params: &ConnectionParameters) -> Result<Transaction, SimpleSqlError> {
        let start = Instant::now();
        let conn = acquire_connection(&self.registry, params)?;
        Ok(Transaction::new(conn, start.elapsed()))
    }

    /// A single operation in its own session: commit when it succeeded, then roll back
    /// whatever is still pending and close.
    fn run_standalone<T>(
        &self,
        params: &ConnectionParameters,
        op: impl FnOnce(&mut Transaction) -> Result<T, SimpleSqlError>,
    ) -> Result<T, SimpleSqlError> {
        let mut txn = self.open_transaction(params)?;
        let result = op(&mut txn).and_then(|value| {
            txn.commit()?;
            Ok(value)
        });
        let summary = finish(txn);
        tracing::trace!(database = %params.describe(), %summary, "session closed");
        result
    }
}

fn run_unit_of_work<W>(txn: &mut Transaction, unit_of_work: W) -> Result<(), SimpleSqlError>
where
    W: FnOnce(&mut Transaction) -> Result<bool, BoxError>,
{
    let commit = unit_of_work(txn).map_err(|e| SimpleSqlError::transaction("unit of work failed", e))?;
    if commit { txn.commit() } else { txn.rollback() }
}

fn finish(mut txn: Transaction) -> TimingSummary {
    if let Err(err) = txn.rollback() {
        tracing::warn!(error = %err, "rollback during cleanup failed");
    }
    txn.close().summary()
}
