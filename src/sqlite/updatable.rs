use std::sync::LazyLock;

use regex::Regex;

use crate::error::DriverError;

/// Alias of the hidden rowid column prepended to updatable queries.
pub const ROWID_COLUMN: &str = "__simple_sql_rowid";

static SINGLE_TABLE_SELECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)^\s*select\s+(?P<projection>.+?)\s+from\s+(?P<table>"(?:[^"]|"")+"|`[^`]+`|\[[^\]]+\]|[A-Za-z_][A-Za-z0-9_$]*)(?P<rest>\s.*)?$"#,
    )
    .expect("static regex is valid")
});

static MULTI_SOURCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\b(join|union|intersect|except|group\s+by|having)\b|^\s*,")
        .expect("static regex is valid")
});

static DISTINCT_PROJECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*distinct\b").expect("static regex is valid"));

/// Table an updatable cursor writes to, plus the query rewritten to carry each row's rowid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTarget {
    /// Table name as written in the query, quotes included
    pub table: String,
    /// The original query with the rowid prepended as the first result column
    pub rewritten_sql: String,
}

impl UpdateTarget {
    /// Work out the target of a single-table `SELECT`.
    ///
    /// # Errors
    /// Returns `DriverError::Unsupported` for anything that does not read exactly one table
    /// row-for-row (joins, set operations, grouping, `DISTINCT`).
    pub fn from_select(sql: &str) -> Result<Self, DriverError> {
        let unsupported = || {
            DriverError::Unsupported(
                "updatable cursors need a plain single-table SELECT".into(),
            )
        };
        let caps = SINGLE_TABLE_SELECT.captures(sql).ok_or_else(unsupported)?;
        let projection = &caps["projection"];
        let table = &caps["table"];
        let rest = caps.name("rest").map_or("", |m| m.as_str());
        if DISTINCT_PROJECTION.is_match(projection) || MULTI_SOURCE.is_match(rest) {
            return Err(unsupported());
        }
        Ok(UpdateTarget {
            table: table.to_owned(),
            rewritten_sql: format!(
                "SELECT rowid AS {}, {projection} FROM {table}{rest}",
                quote_identifier(ROWID_COLUMN)
            ),
        })
    }

    /// `UPDATE` for the given columns, keyed on rowid (the last parameter).
    #[must_use]
    pub fn update_sql<'a>(&self, columns: impl IntoIterator<Item = &'a str>) -> String {
        let assignments: Vec<String> = columns
            .into_iter()
            .map(|column| format!("{} = ?", quote_identifier(column)))
            .collect();
        format!(
            "UPDATE {} SET {} WHERE rowid = ?",
            self.table,
            assignments.join(", ")
        )
    }
}

/// Double-quote an identifier, doubling embedded quotes.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
