use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::error::DriverError;

static PLAIN_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("static regex is valid"));

/// Where a `SQLite` connection points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqliteAddress {
    /// `mem://<name>`: named in-memory database shared by every connection of one driver
    SharedMemory(String),
    /// `:memory:`: private in-memory database, gone when the connection closes
    PrivateMemory,
    /// `sqlite://<path>` or a bare path
    File(String),
}

impl SqliteAddress {
    /// # Errors
    /// Returns `DriverError::InvalidAddress` for an empty path or an unusable memory name.
    pub fn parse(address: &str) -> Result<Self, DriverError> {
        let address = address.trim();
        if address == ":memory:" {
            return Ok(SqliteAddress::PrivateMemory);
        }
        if let Some(name) = address.strip_prefix("mem://") {
            if !PLAIN_TOKEN.is_match(name) {
                return Err(DriverError::InvalidAddress(format!(
                    "memory database name '{name}' must be letters, digits, '_', '.' or '-'"
                )));
            }
            return Ok(SqliteAddress::SharedMemory(name.to_owned()));
        }
        let path = address.strip_prefix("sqlite://").unwrap_or(address);
        if path.is_empty() {
            return Err(DriverError::InvalidAddress("empty database path".into()));
        }
        Ok(SqliteAddress::File(path.to_owned()))
    }

    /// Path or URI handed to `sqlite3_open_v2`.
    #[must_use]
    pub fn open_target(&self) -> String {
        match self {
            SqliteAddress::SharedMemory(name) => format!("file:{name}?mode=memory&cache=shared"),
            SqliteAddress::PrivateMemory => ":memory:".to_owned(),
            SqliteAddress::File(path) => path.clone(),
        }
    }
}

/// Apply driver properties to a freshly opened connection.
///
/// `busy_timeout` is in milliseconds. `user` and `password` are ignored, `SQLite` has no
/// authentication. Everything else becomes `PRAGMA <name> = <value>`.
///
/// # Errors
/// Returns `DriverError::InvalidProperty` for malformed names or values, or the `SQLite` error
/// raised by the pragma.
pub fn apply_properties(
    conn: &rusqlite::Connection,
    properties: &BTreeMap<String, String>,
) -> Result<(), DriverError> {
    for (name, value) in properties {
        match name.as_str() {
            "user" | "password" => {}
            "busy_timeout" => {
                let millis: u64 = value.trim().parse().map_err(|_| {
                    DriverError::InvalidProperty(format!("busy_timeout '{value}' is not a number"))
                })?;
                conn.busy_timeout(Duration::from_millis(millis))?;
            }
            _ => {
                if !PLAIN_TOKEN.is_match(name) || !PLAIN_TOKEN.is_match(value.trim()) {
                    return Err(DriverError::InvalidProperty(format!("{name}={value}")));
                }
                conn.execute_batch(&format!("PRAGMA {name} = {};", value.trim()))?;
            }
        }
    }
    Ok(())
}
