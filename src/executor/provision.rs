use crate::config::ConnectionParameters;
use crate::driver::{DriverConnection, DriverRegistry};
use crate::error::{DriverError, SimpleSqlError};
use crate::types::IsolationLevel;

use super::release_connection;

fn connection_error(params: &ConnectionParameters, source: DriverError) -> SimpleSqlError {
    SimpleSqlError::ConnectionError {
        message: format!("Failed to get database connection with {}", params.describe()),
        source,
    }
}

fn configure(conn: &mut dyn DriverConnection) -> Result<(), DriverError> {
    conn.set_auto_commit(false)?;
    conn.set_isolation_level(IsolationLevel::ReadCommitted)
}

/// Open a connection with auto-commit off and read-committed isolation.
///
/// # Errors
/// `ConfigurationError` for a blank driver or address; `ConnectionError` when the driver is
/// unknown, the connect call fails, or the new handle rejects its settings (the handle is
/// closed first).
pub(crate) fn acquire_connection(
    registry: &DriverRegistry,
    params: &ConnectionParameters,
) -> Result<Box<dyn DriverConnection>, SimpleSqlError> {
    params.validate()?;
    let driver = registry
        .resolve(&params.driver)
        .map_err(|e| connection_error(params, e))?;
    let mut conn = driver
        .connect(params.address.trim(), &params.driver_properties())
        .map_err(|e| connection_error(params, e))?;
    if let Err(err) = configure(conn.as_mut()) {
        release_connection(conn);
        return Err(connection_error(params, err));
    }
    tracing::debug!(
        driver = %params.driver,
        address = %params.address,
        "connection acquired"
    );
    Ok(conn)
}
