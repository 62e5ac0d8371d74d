#![cfg(feature = "sqlite")]

mod common;

use std::io::Write;
use std::sync::Arc;

use simple_sql::{ConnectionParameters, SimpleSql, SimpleSqlError, SqlValue, SqliteDriver};

#[test]
fn file_database_from_json_config() {
    common::init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("people.db");
    let json = serde_json::json!({
        "driverClass": "sqlite",
        "connectionString": format!("sqlite://{}", db_path.display()),
        "properties": { "busy_timeout": "2000", "foreign_keys": "ON" }
    });
    let mut config = tempfile::NamedTempFile::new().unwrap();
    write!(config, "{json}").unwrap();

    let params = ConnectionParameters::from_json_file(config.path()).unwrap();
    assert_eq!(params.driver, "sqlite");
    assert_eq!(params.properties.len(), 2);

    let sql = SimpleSql::new();
    common::seed_t(&sql, &params, &[(1, "persisted")]);
    assert!(db_path.exists());

    // a fresh engine sees what the first one committed
    let other = SimpleSql::new();
    let row = other
        .query_first(&params, "select name from T where id = ?", &[SqlValue::Int(1)])
        .unwrap()
        .unwrap();
    assert_eq!(row.get("name"), Some(&SqlValue::from("persisted")));

    let fk = other
        .query_first(&params, "pragma foreign_keys", &[])
        .unwrap()
        .and_then(|row| row.get("foreign_keys").and_then(SqlValue::as_int));
    assert_eq!(fk, Some(1));
}

#[test]
fn private_memory_does_not_outlive_the_call() {
    let sql = SimpleSql::new();
    let params = ConnectionParameters::new("sqlite", ":memory:");
    sql.batch_update(&params, "create table T (id int)", common::no_params())
        .unwrap();

    let err = sql.query_as_list(&params, "select * from T", &[]).unwrap_err();
    assert!(matches!(err, SimpleSqlError::StatementError { .. }), "{err:?}");
}

#[test]
fn clones_share_memory_databases() {
    let params = common::memory_params("perdriver");
    let first = SimpleSql::new();
    common::seed_t(&first, &params, &[(1, "a")]);

    let again = first.query_as_list(&params, "select * from T", &[]).unwrap();
    assert_eq!(again.len(), 1);
    let cloned = first.clone();
    assert_eq!(cloned.query_as_list(&params, "select * from T", &[]).unwrap().len(), 1);
}

#[test]
fn forgotten_memory_database_starts_empty() {
    let driver = Arc::new(SqliteDriver::new());
    let mut sql = SimpleSql::without_drivers();
    sql.register_driver("sqlite", driver.clone());
    let params = ConnectionParameters::new("sqlite", "mem://forgotten");
    common::seed_t(&sql, &params, &[(1, "a")]);
    assert_eq!(driver.memory_databases(), vec!["forgotten".to_string()]);

    assert!(driver.forget_memory_database("forgotten"));
    assert!(!driver.forget_memory_database("forgotten"));
    assert!(driver.memory_databases().is_empty());

    let err = sql.query_as_list(&params, "select * from T", &[]).unwrap_err();
    assert!(matches!(err, SimpleSqlError::StatementError { .. }), "{err:?}");
}

#[test]
fn malformed_inputs_are_reported() {
    let err = ConnectionParameters::from_json_str("{\"driver\": 3}").unwrap_err();
    assert!(matches!(err, SimpleSqlError::ConfigurationError(_)), "{err:?}");

    let err = ConnectionParameters::from_json_file("/definitely/not/here.json").unwrap_err();
    assert!(matches!(err, SimpleSqlError::ConfigurationError(_)), "{err:?}");

    let sql = SimpleSql::new();
    let bad_memory = ConnectionParameters::new("sqlite", "mem://has space");
    let err = sql.query_first(&bad_memory, "select 1", &[]).unwrap_err();
    assert!(matches!(err, SimpleSqlError::ConnectionError { .. }), "{err:?}");

    let bad_property = common::memory_params("badprop").with_property("cache_size", "1; drop table T");
    let err = sql.query_first(&bad_property, "select 1", &[]).unwrap_err();
    assert!(matches!(err, SimpleSqlError::ConnectionError { .. }), "{err:?}");
}

#[test]
fn registry_lists_builtin_and_custom_drivers() {
    let sql = SimpleSql::new().with_driver("other", simple_sql::SqliteDriver::new());
    assert_eq!(sql.drivers().names(), vec!["other", "sqlite"]);
    assert!(SimpleSql::without_drivers().drivers().names().is_empty());
}
