//! Source connection settings shared by live adapters.

use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Upper bound for `max_connections`; discovery never needs more.
pub const MAX_POOL_CONNECTIONS: u32 = 100;

/// Upper bound for both timeouts.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(300);

/// Where and how to reach a source server.
///
/// Holds no password: credentials stay in the connection string handed to
/// the adapter and are never copied here.
///
/// # Example
/// ```rust
/// use cdcsync_core::adapters::ConnectionConfig;
/// use std::time::Duration;
///
/// let config = ConnectionConfig::new("db.internal")
///     .with_port(3306)
///     .with_username("cdc_reader")
///     .with_query_timeout(Duration::from_secs(10));
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.to_string(), "db.internal:3306");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Server host name or address
    pub host: String,
    /// Server port; `None` uses the driver default
    pub port: Option<u16>,
    /// Database named in the URL path; discovery still lists every database
    pub database: Option<String>,
    /// Login user, kept for diagnostics only
    pub username: Option<String>,
    /// How long to wait for a pooled connection
    pub connect_timeout: Duration,
    /// Server-side limit per metadata statement
    pub query_timeout: Duration,
    /// Pool size, at most [`MAX_POOL_CONNECTIONS`]
    pub max_connections: u32,
    /// Open every session `READ ONLY`
    pub read_only: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: None,
            database: None,
            username: None,
            connect_timeout: Duration::from_secs(30),
            query_timeout: Duration::from_secs(30),
            max_connections: 8,
            read_only: true,
        }
    }
}

/// Renders `host[:port][/database]`; the username is left out.
impl fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        if let Some(database) = &self.database {
            write!(f, "/{}", database)?;
        }
        Ok(())
    }
}

impl ConnectionConfig {
    /// Default settings for `host`.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    /// Sets the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the database from the URL path.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Sets the login user.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the pool acquire timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the per-statement timeout.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Sets the pool size.
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Checks the settings are usable.
    ///
    /// # Errors
    /// Returns a configuration error naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(SyncError::configuration("Source host cannot be empty"));
        }

        if self.port == Some(0) {
            return Err(SyncError::configuration(
                "Source port must be greater than 0",
            ));
        }

        if !(1..=MAX_POOL_CONNECTIONS).contains(&self.max_connections) {
            return Err(SyncError::configuration(format!(
                "max_connections must be between 1 and {}, got {}",
                MAX_POOL_CONNECTIONS, self.max_connections
            )));
        }

        for (name, timeout) in [
            ("connect_timeout", self.connect_timeout),
            ("query_timeout", self.query_timeout),
        ] {
            if timeout < Duration::from_secs(1) || timeout > MAX_TIMEOUT {
                return Err(SyncError::configuration(format!(
                    "{} must be between 1s and {}s, got {:?}",
                    name,
                    MAX_TIMEOUT.as_secs(),
                    timeout
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_read_only_and_valid() {
        let config = ConnectionConfig::default();
        assert!(config.read_only);
        assert_eq!(config.port, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_each_bad_field() {
        let bad = [
            ConnectionConfig::new(" "),
            ConnectionConfig::default().with_port(0),
            ConnectionConfig::default().with_max_connections(0),
            ConnectionConfig::default().with_max_connections(MAX_POOL_CONNECTIONS + 1),
            ConnectionConfig::default().with_query_timeout(Duration::from_millis(10)),
            ConnectionConfig::default().with_connect_timeout(Duration::from_secs(301)),
        ];

        for config in bad {
            assert!(config.validate().is_err(), "accepted {:?}", config);
        }
    }

    #[test]
    fn test_display_omits_username() {
        let config = ConnectionConfig::new("db.internal")
            .with_port(3306)
            .with_database("shop")
            .with_username("cdc_reader");

        assert_eq!(config.to_string(), "db.internal:3306/shop");
    }
}
