#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use simple_sql::{
    ConnectionParameters, CursorMode, Driver, DriverConnection, DriverCursor, DriverError,
    DriverStatement, IsolationLevel, SimpleSql, SqlValue,
};

static NEXT_DB: AtomicUsize = AtomicUsize::new(0);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Parameters for a fresh shared in-memory database on the built-in sqlite driver.
pub fn memory_params(prefix: &str) -> ConnectionParameters {
    let n = NEXT_DB.fetch_add(1, Ordering::Relaxed);
    ConnectionParameters::new("sqlite", format!("mem://{prefix}_{n}"))
}

pub fn no_params() -> [Vec<SqlValue>; 1] {
    [Vec::new()]
}

/// Create `T(id int, name text)` and insert the given rows.
pub fn seed_t(sql: &SimpleSql, params: &ConnectionParameters, rows: &[(i64, &str)]) {
    sql.batch_update(params, "create table T (id int, name text)", no_params())
        .unwrap();
    let entries: Vec<Vec<SqlValue>> = rows
        .iter()
        .map(|(id, name)| vec![SqlValue::Int(*id), SqlValue::from(*name)])
        .collect();
    if !entries.is_empty() {
        sql.batch_update(params, "insert into T (id, name) values (?, ?)", entries)
            .unwrap();
    }
}

/// Append-only log of every call the mock driver sees.
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| e.as_str() == event).count()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.events().iter().filter(|e| e.starts_with(prefix)).count()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }

    pub fn last_position(&self, event: &str) -> Option<usize> {
        self.events().iter().rposition(|e| e == event)
    }
}

/// What the mock returns, and which call (if any) fails.
#[derive(Clone, Default)]
pub struct MockScript {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
    pub fail_at: Option<&'static str>,
}

impl MockScript {
    pub fn with_rows(columns: &[&str], rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            columns: columns.iter().map(|c| (*c).to_owned()).collect(),
            rows,
            fail_at: None,
        }
    }

    pub fn failing_at(mut self, op: &'static str) -> Self {
        self.fail_at = Some(op);
        self
    }

    fn check(&self, op: &str) -> Result<(), DriverError> {
        if self.fail_at == Some(op) {
            Err(DriverError::Other(format!("{op} failed")))
        } else {
            Ok(())
        }
    }
}

pub struct MockDriver {
    recorder: Recorder,
    script: MockScript,
}

/// An engine with only the mock driver, registered as `mock`.
pub fn mock_engine(script: MockScript) -> (SimpleSql, Recorder, ConnectionParameters) {
    let recorder = Recorder::default();
    let driver = MockDriver {
        recorder: recorder.clone(),
        script,
    };
    let sql = SimpleSql::without_drivers().with_driver("mock", driver);
    (sql, recorder, ConnectionParameters::new("mock", "mock://db"))
}

impl Driver for MockDriver {
    fn connect(
        &self,
        address: &str,
        properties: &BTreeMap<String, String>,
    ) -> Result<Box<dyn DriverConnection>, DriverError> {
        self.recorder.push(format!("connect {address}"));
        for (key, value) in properties {
            self.recorder.push(format!("property {key}={value}"));
        }
        self.script.check("connect")?;
        Ok(Box::new(MockConnection {
            recorder: self.recorder.clone(),
            script: self.script.clone(),
        }))
    }
}

struct MockConnection {
    recorder: Recorder,
    script: MockScript,
}

impl DriverConnection for MockConnection {
    fn set_auto_commit(&mut self, auto_commit: bool) -> Result<(), DriverError> {
        self.recorder.push(format!("auto_commit={auto_commit}"));
        self.script.check("set_auto_commit")
    }

    fn set_read_only(&mut self, read_only: bool) -> Result<(), DriverError> {
        self.recorder.push(format!("read_only={read_only}"));
        Ok(())
    }

    fn set_isolation_level(&mut self, level: IsolationLevel) -> Result<(), DriverError> {
        self.recorder.push(format!("isolation={}", level.to_sql()));
        Ok(())
    }

    fn prepare<'c>(
        &'c self,
        sql: &str,
        mode: CursorMode,
    ) -> Result<Box<dyn DriverStatement + 'c>, DriverError> {
        self.recorder.push(format!("prepare {mode:?} {sql}"));
        self.script.check("prepare")?;
        Ok(Box::new(MockStatement {
            recorder: self.recorder.clone(),
            script: self.script.clone(),
            queued: 0,
        }))
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        self.recorder.push("commit");
        self.script.check("commit")
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        self.recorder.push("rollback");
        self.script.check("rollback")
    }

    fn close(self: Box<Self>) -> Result<(), DriverError> {
        self.recorder.push("close connection");
        self.script.check("close connection")
    }
}

struct MockStatement {
    recorder: Recorder,
    script: MockScript,
    queued: usize,
}

impl DriverStatement for MockStatement {
    fn bind(&mut self, index: usize, value: &SqlValue) -> Result<(), DriverError> {
        self.recorder.push(format!("bind {index} {value:?}"));
        self.script.check("bind")
    }

    fn bind_binary(&mut self, index: usize, bytes: &[u8]) -> Result<(), DriverError> {
        self.recorder.push(format!("bind_binary {index} len={}", bytes.len()));
        self.script.check("bind")
    }

    fn execute_query<'s>(&'s mut self) -> Result<Box<dyn DriverCursor + 's>, DriverError> {
        self.recorder.push("execute_query");
        self.script.check("execute_query")?;
        Ok(Box::new(MockCursor {
            recorder: self.recorder.clone(),
            script: self.script.clone(),
            next: 0,
            current: None,
        }))
    }

    fn add_batch(&mut self) -> Result<(), DriverError> {
        self.recorder.push("add_batch");
        self.script.check("add_batch")?;
        self.queued += 1;
        Ok(())
    }

    fn execute_batch(&mut self) -> Result<Vec<Option<u64>>, DriverError> {
        self.recorder.push("execute_batch");
        self.script.check("execute_batch")?;
        let mut counts = vec![Some(1); self.queued];
        // the last entry reports an unknown count
        if let Some(last) = counts.last_mut() {
            *last = None;
        }
        self.queued = 0;
        Ok(counts)
    }

    fn close(self: Box<Self>) -> Result<(), DriverError> {
        self.recorder.push("close statement");
        self.script.check("close statement")
    }
}

struct MockCursor {
    recorder: Recorder,
    script: MockScript,
    next: usize,
    current: Option<Vec<SqlValue>>,
}

impl DriverCursor for MockCursor {
    fn column_names(&self) -> &[String] {
        &self.script.columns
    }

    fn advance(&mut self) -> Result<bool, DriverError> {
        self.recorder.push("advance");
        self.current = self.script.rows.get(self.next).cloned();
        self.next += 1;
        Ok(self.current.is_some())
    }

    fn value(&self, index: usize) -> Result<SqlValue, DriverError> {
        let row = self.current.as_ref().ok_or(DriverError::NoCurrentRow)?;
        row.get(index)
            .cloned()
            .ok_or_else(|| DriverError::UnknownColumn(format!("#{index}")))
    }

    fn update_value(&mut self, column: &str, value: &SqlValue) -> Result<(), DriverError> {
        self.recorder.push(format!("update_value {column} {value:?}"));
        self.script.check("update_value")
    }

    fn update_row(&mut self) -> Result<(), DriverError> {
        self.recorder.push("update_row");
        self.script.check("update_row")
    }

    fn close(self: Box<Self>) -> Result<(), DriverError> {
        self.recorder.push("close cursor");
        self.script.check("close cursor")
    }
}
