use std::time::{Duration, Instant};

use serde::Serialize;

/// Time and call counters accumulated by one [`Transaction`](crate::Transaction).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionMetrics {
    pub connection_time: Duration,
    pub commit_time: Duration,
    /// Time spent executing batches
    pub batch_update_time: Duration,
    pub add_batch_time: Duration,
    pub execute_query_time: Duration,
    pub update_row_time: Duration,
    pub prepared_statement_time: Duration,

    pub num_batch_update_calls: u64,
    pub num_add_batch_calls: u64,
    pub num_execute_query_calls: u64,
    pub num_update_row_calls: u64,
    pub num_prepared_statement_calls: u64,
}

impl TransactionMetrics {
    /// Millisecond view handed back to callers.
    #[must_use]
    pub fn summary(&self) -> TimingSummary {
        TimingSummary {
            connection_time: millis(self.connection_time),
            commit_time: millis(self.commit_time),
            batch_update_time: millis(self.batch_update_time),
            add_batch_time: millis(self.add_batch_time),
            execute_query_time: millis(self.execute_query_time),
            update_row_time: millis(self.update_row_time),
            prepared_statement_time: millis(self.prepared_statement_time),
            num_batch_update_calls: self.num_batch_update_calls,
            num_add_batch_calls: self.num_add_batch_calls,
            num_execute_query_calls: self.num_execute_query_calls,
            num_update_row_calls: self.num_update_row_calls,
            num_prepared_statement_calls: self.num_prepared_statement_calls,
        }
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Run `f`, adding its wall-clock time to `total`.
pub(crate) fn timed<T>(total: &mut Duration, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let out = f();
    *total += start.elapsed();
    out
}

/// Timings (milliseconds) and call counts of one transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingSummary {
    pub connection_time: f64,
    pub commit_time: f64,
    pub batch_update_time: f64,
    pub add_batch_time: f64,
    pub execute_query_time: f64,
    pub update_row_time: f64,
    pub prepared_statement_time: f64,
    pub num_batch_update_calls: u64,
    pub num_add_batch_calls: u64,
    pub num_execute_query_calls: u64,
    pub num_update_row_calls: u64,
    pub num_prepared_statement_calls: u64,
}

impl TimingSummary {
    /// The summary as a key/value map using the camelCase key names.
    #[must_use]
    pub fn to_map(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }
}

impl std::fmt::Display for TimingSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "connect {:.3}ms, prepare {:.3}ms x{}, query {:.3}ms x{}, update row {:.3}ms x{}, \
             add batch {:.3}ms x{}, batch {:.3}ms x{}, commit {:.3}ms",
            self.connection_time,
            self.prepared_statement_time,
            self.num_prepared_statement_calls,
            self.execute_query_time,
            self.num_execute_query_calls,
            self.update_row_time,
            self.num_update_row_calls,
            self.add_batch_time,
            self.num_add_batch_calls,
            self.batch_update_time,
            self.num_batch_update_calls,
            self.commit_time,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_converts_to_milliseconds() {
        let metrics = TransactionMetrics {
            connection_time: Duration::from_micros(1500),
            num_update_row_calls: 2,
            ..Default::default()
        };
        let summary = metrics.summary();
        assert!((summary.connection_time - 1.5).abs() < 1e-9);
        assert_eq!(summary.num_update_row_calls, 2);
    }

    #[test]
    fn map_uses_camel_case_keys() {
        let map = TransactionMetrics::default().summary().to_map();
        let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            [
                "addBatchTime",
                "batchUpdateTime",
                "commitTime",
                "connectionTime",
                "executeQueryTime",
                "numAddBatchCalls",
                "numBatchUpdateCalls",
                "numExecuteQueryCalls",
                "numPreparedStatementCalls",
                "numUpdateRowCalls",
                "preparedStatementTime",
                "updateRowTime",
            ]
        );
        assert_eq!(map.get("numAddBatchCalls"), Some(&serde_json::json!(0)));
    }

    #[test]
    fn timed_accumulates() {
        let mut total = Duration::ZERO;
        let value = timed(&mut total, || 7);
        let again = timed(&mut total, || 8);
        assert_eq!(value + again, 15);
        assert!(total < Duration::from_secs(5));
    }
}
