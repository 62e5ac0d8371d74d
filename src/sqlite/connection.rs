use crate::driver::{DriverConnection, DriverStatement};
use crate::error::DriverError;
use crate::types::{CursorMode, IsolationLevel};

use super::prepared::SqlitePrepared;

/// Connection wrapper that emulates JDBC-style auto-commit control on top of `SQLite`.
///
/// With auto-commit off, `BEGIN` is issued lazily before the first statement; `commit` and
/// `rollback` are no-ops when no transaction is open.
pub struct SqliteConnection {
    conn: rusqlite::Connection,
    auto_commit: bool,
}

impl SqliteConnection {
    pub(crate) fn new(conn: rusqlite::Connection) -> Self {
        Self {
            conn,
            auto_commit: true,
        }
    }

    fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    fn begin_if_needed(&self) -> Result<(), DriverError> {
        if !self.auto_commit && !self.in_transaction() {
            self.conn.execute_batch("BEGIN")?;
        }
        Ok(())
    }

    fn finish(&mut self, verb: &str) -> Result<(), DriverError> {
        if self.in_transaction() {
            // query_only would otherwise block ending a transaction that wrote
            self.conn
                .execute_batch(&format!("PRAGMA query_only = OFF; {verb};"))?;
        }
        Ok(())
    }
}

impl DriverConnection for SqliteConnection {
    fn set_auto_commit(&mut self, auto_commit: bool) -> Result<(), DriverError> {
        if auto_commit && !self.auto_commit {
            self.finish("COMMIT")?;
        }
        self.auto_commit = auto_commit;
        Ok(())
    }

    fn set_read_only(&mut self, read_only: bool) -> Result<(), DriverError> {
        let flag = if read_only { "ON" } else { "OFF" };
        self.conn
            .execute_batch(&format!("PRAGMA query_only = {flag};"))?;
        Ok(())
    }

    fn set_isolation_level(&mut self, level: IsolationLevel) -> Result<(), DriverError> {
        // SQLite transactions are serializable; only shared-cache readers can opt down.
        let read_uncommitted = matches!(level, IsolationLevel::ReadUncommitted);
        self.conn.execute_batch(&format!(
            "PRAGMA read_uncommitted = {};",
            i32::from(read_uncommitted)
        ))?;
        Ok(())
    }

    fn prepare<'c>(
        &'c self,
        sql: &str,
        mode: CursorMode,
    ) -> Result<Box<dyn DriverStatement + 'c>, DriverError> {
        self.begin_if_needed()?;
        Ok(Box::new(SqlitePrepared::new(&self.conn, sql, mode)?))
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        self.finish("COMMIT")
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        self.finish("ROLLBACK")
    }

    fn close(self: Box<Self>) -> Result<(), DriverError> {
        let rolled_back = if self.conn.is_autocommit() {
            Ok(())
        } else {
            self.conn.execute_batch("ROLLBACK")
        };
        let closed = self.conn.close().map_err(|(_, err)| err);
        rolled_back?;
        closed?;
        Ok(())
    }
}
