use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SimpleSqlError;

/// Settings needed to open one connection.
///
/// `user` and `password` are only applied as a pair; with either missing the driver
/// receives `properties` untouched, which is how passwordless or integrated
/// authentication is requested.
///
/// ```rust
/// use simple_sql::ConnectionParameters;
///
/// let params = ConnectionParameters::new("sqlite", "mem://inventory")
///     .with_property("busy_timeout", "5000");
/// assert!(params.validate().is_ok());
/// ```
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionParameters {
    /// Name the driver was registered under
    #[serde(alias = "driverClass")]
    pub driver: String,
    /// Driver-specific connection address
    #[serde(alias = "connectionString")]
    pub address: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    /// Free-form engine properties passed to the driver
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl std::fmt::Debug for ConnectionParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionParameters")
            .field("driver", &self.driver)
            .field("address", &self.address)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("properties", &self.properties)
            .finish()
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

impl ConnectionParameters {
    #[must_use]
    pub fn new(driver: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            address: address.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Parse parameters from a JSON document.
    ///
    /// # Errors
    /// Returns `SimpleSqlError::ConfigurationError` if the document is not valid.
    pub fn from_json_str(json: &str) -> Result<Self, SimpleSqlError> {
        serde_json::from_str(json).map_err(|e| {
            SimpleSqlError::ConfigurationError(format!("invalid connection parameters: {e}"))
        })
    }

    /// Load parameters from a JSON file.
    ///
    /// # Errors
    /// Returns `SimpleSqlError::ConfigurationError` if the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SimpleSqlError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SimpleSqlError::ConfigurationError(format!(
                "failed to read connection parameters from '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_json_str(&contents)
    }

    /// Check the settings every connection attempt needs.
    ///
    /// # Errors
    /// Returns `SimpleSqlError::ConfigurationError` when the driver or address is blank.
    pub fn validate(&self) -> Result<(), SimpleSqlError> {
        if self.driver.trim().is_empty() {
            return Err(SimpleSqlError::ConfigurationError(
                "no driver given".into(),
            ));
        }
        if self.address.trim().is_empty() {
            return Err(SimpleSqlError::ConfigurationError(
                "no connection address given".into(),
            ));
        }
        Ok(())
    }

    /// The `(user, password)` pair, only when both are present and non-blank.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        if is_blank(self.user.as_deref()) || is_blank(self.password.as_deref()) {
            return None;
        }
        Some((self.user.as_deref()?, self.password.as_deref()?))
    }

    /// Properties handed to the driver, with the credentials merged in when both are set.
    #[must_use]
    pub fn driver_properties(&self) -> BTreeMap<String, String> {
        let mut props = self.properties.clone();
        if let Some((user, password)) = self.credentials() {
            props.insert("user".into(), user.to_owned());
            props.insert("password".into(), password.to_owned());
        }
        props
    }

    /// Human-readable target used in error messages. Never includes the password.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = format!("driver '{}', address '{}'", self.driver, self.address);
        if let Some(user) = self.user.as_deref().filter(|u| !u.trim().is_empty()) {
            out.push_str(&format!(" and user '{user}'"));
        }
        out
    }
}
