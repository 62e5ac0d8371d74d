#![cfg(feature = "sqlite")]

mod common;

use simple_sql::{SimpleSql, SimpleSqlError, SqlValue};

fn name_of(sql: &SimpleSql, params: &simple_sql::ConnectionParameters, id: i64) -> SqlValue {
    sql.query_first(params, "select name from T where id = ?", &[SqlValue::Int(id)])
        .unwrap()
        .and_then(|row| row.get("name").cloned())
        .unwrap_or(SqlValue::Null)
}

#[test]
fn declined_update_writes_nothing() {
    let sql = SimpleSql::new();
    let params = common::memory_params("declined");
    common::seed_t(&sql, &params, &[(1, "a")]);

    let row = sql
        .fetch_for_update(&params, "select * from T where id = ?", &[SqlValue::Int(1)], |r| {
            r.set("name", "changed");
            Ok(false)
        })
        .unwrap()
        .unwrap();
    // the caller still sees its own edit
    assert_eq!(row.get("name"), Some(&SqlValue::from("changed")));
    assert_eq!(name_of(&sql, &params, 1), SqlValue::from("a"));
}

#[test]
fn only_changed_rows_are_written() {
    let sql = SimpleSql::new();
    let params = common::memory_params("unchanged");
    common::seed_t(&sql, &params, &[(1, "a"), (2, "b")]);

    let summary = sql
        .with_transaction(&params, |txn| {
            txn.fetch_for_update("select * from T where id = 1", &[], |r| {
                r.set("name", "a");
                Ok(true)
            })?;
            assert!(!txn.has_uncommitted_changes());

            txn.fetch_for_update("select * from T where id = 2", &[], |r| {
                r.set("name", "bb");
                Ok(true)
            })?;
            assert!(txn.has_uncommitted_changes());
            Ok(true)
        })
        .unwrap();

    assert_eq!(summary.num_update_row_calls, 1);
    assert_eq!(summary.num_execute_query_calls, 2);
    assert_eq!(name_of(&sql, &params, 2), SqlValue::from("bb"));
}

#[test]
fn null_round_trips_through_the_cursor() {
    let sql = SimpleSql::new();
    let params = common::memory_params("nulls");
    common::seed_t(&sql, &params, &[(1, "a")]);

    sql.fetch_for_update(&params, "select id, name from T", &[], |r| {
        r.set("name", SqlValue::Null);
        Ok(true)
    })
    .unwrap();
    assert_eq!(name_of(&sql, &params, 1), SqlValue::Null);

    sql.fetch_for_update(&params, "select id, name from T", &[], |r| {
        r.set("name", "back");
        Ok(true)
    })
    .unwrap();
    assert_eq!(name_of(&sql, &params, 1), SqlValue::from("back"));
}

#[test]
fn only_the_first_row_is_touched() {
    let sql = SimpleSql::new();
    let params = common::memory_params("first");
    common::seed_t(&sql, &params, &[(1, "a"), (2, "b"), (3, "c")]);

    let mut calls = 0;
    sql.fetch_for_update(&params, "select * from T order by id", &[], |r| {
        calls += 1;
        r.set("name", "first");
        Ok(true)
    })
    .unwrap();

    assert_eq!(calls, 1);
    let names: Vec<SqlValue> = sql
        .query_as_list(&params, "select name from T order by id", &[])
        .unwrap()
        .into_iter()
        .filter_map(|row| row.get("name").cloned())
        .collect();
    assert_eq!(
        names,
        vec![SqlValue::from("first"), SqlValue::from("b"), SqlValue::from("c")]
    );
}

#[test]
fn no_row_means_no_updater_call() {
    let sql = SimpleSql::new();
    let params = common::memory_params("norow");
    common::seed_t(&sql, &params, &[(1, "a")]);

    let mut called = false;
    let row = sql
        .fetch_for_update(&params, "select * from T where id = 99", &[], |_| {
            called = true;
            Ok(true)
        })
        .unwrap();
    assert!(row.is_none());
    assert!(!called);
}

#[test]
fn new_columns_cannot_be_written_back() {
    let sql = SimpleSql::new();
    let params = common::memory_params("newcol");
    common::seed_t(&sql, &params, &[(1, "a")]);

    let err = sql
        .fetch_for_update(&params, "select * from T", &[], |r| {
            r.set("name", "z");
            r.set("extra", 1);
            Ok(true)
        })
        .unwrap_err();
    assert!(matches!(err, SimpleSqlError::QueryError { .. }), "{err:?}");
    assert_eq!(name_of(&sql, &params, 1), SqlValue::from("a"));
}

#[test]
fn joins_cannot_be_opened_for_update() {
    let sql = SimpleSql::new();
    let params = common::memory_params("join");
    common::seed_t(&sql, &params, &[(1, "a")]);

    let err = sql
        .fetch_for_update(
            &params,
            "select a.id, b.name from T a join T b on a.id = b.id",
            &[],
            |_| Ok(true),
        )
        .unwrap_err();
    assert!(matches!(err, SimpleSqlError::StatementError { .. }), "{err:?}");
}

#[test]
fn updater_failure_is_a_processing_error() {
    let sql = SimpleSql::new();
    let params = common::memory_params("updfail");
    common::seed_t(&sql, &params, &[(1, "a")]);

    let err = sql
        .fetch_for_update(&params, "select * from T", &[], |_| Err("no thanks".into()))
        .unwrap_err();
    assert!(matches!(err, SimpleSqlError::ProcessingError { .. }), "{err:?}");
    assert_eq!(err.sql(), Some("select * from T"));
}
