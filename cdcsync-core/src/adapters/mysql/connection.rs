//! MySQL connection pool management and validation.
//!
//! # Security Features
//! - Validates connection string format and parameters
//! - Enforces connection limits to prevent resource exhaustion
//! - Sets appropriate timeouts for all operations

use super::MySqlAdapter;
use crate::adapters::config::{ConnectionConfig, MAX_POOL_CONNECTIONS, MAX_TIMEOUT};
use crate::Result;
use crate::error::SyncError;
use sqlx::MySqlPool;
use std::time::Duration;
use url::Url;

const MYSQL_DEFAULT_PORT: u16 = 3306;

impl MySqlAdapter {
    /// Creates a new MySQL adapter with a lazily connecting pool
    ///
    /// # Arguments
    /// * `connection_string` - MySQL connection URL (credentials sanitized in errors)
    ///
    /// # Security
    /// - Enforces read-only sessions by default
    /// - Sets a per-statement execution limit
    /// - Sanitizes connection string in all error messages
    ///
    /// # Errors
    /// Returns error if:
    /// - Connection string format is invalid
    /// - Pool configuration is invalid
    pub async fn new(connection_string: &str) -> Result<Self> {
        let config = parse_mysql_connection_config(connection_string)?;
        let pool = create_mysql_connection_pool(connection_string, &config)?;

        tracing::debug!("Created MySQL connection pool for {}", config);

        Ok(Self { pool, config })
    }

    /// Creates a new MySQL adapter with custom configuration
    ///
    /// # Security
    /// Same security guarantees as `new()` but allows custom configuration
    pub async fn with_config(connection_string: &str, config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        validate_mysql_connection_string(connection_string)?;

        let pool = create_mysql_connection_pool(connection_string, &config)?;

        Ok(Self { pool, config })
    }

    /// Closes the connection pool gracefully
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Checks the health of the connection pool
    ///
    /// # Returns
    /// True if the pool is healthy and can acquire connections
    pub async fn is_pool_healthy(&self) -> bool {
        match sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
        {
            Ok(result) => result == 1,
            Err(_) => false,
        }
    }
}

/// Parses MySQL connection string to extract configuration parameters
///
/// Recognized query parameters: `connect_timeout` and `query_timeout`
/// (seconds, 1-300) and `pool_max_conns` (1-100). Others are left for
/// the driver.
///
/// # Returns
/// Validated connection configuration
pub fn parse_mysql_connection_config(connection_string: &str) -> Result<ConnectionConfig> {
    validate_mysql_connection_string(connection_string)?;

    let url = Url::parse(connection_string).map_err(|e| {
        SyncError::configuration(format!("Invalid MySQL connection string format: {}", e))
    })?;

    let mut config = ConnectionConfig::new(url.host_str().unwrap_or("localhost").to_string())
        .with_port(url.port().unwrap_or(MYSQL_DEFAULT_PORT));

    if config.port == Some(0) {
        return Err(SyncError::configuration(
            "Invalid port number: must be greater than 0",
        ));
    }

    let database = url.path().trim_start_matches('/');
    if !database.is_empty() {
        if database.len() > 64 {
            return Err(SyncError::configuration(
                "Database name too long: maximum 64 characters",
            ));
        }
        config = config.with_database(database.to_string());
    }

    let username = url.username();
    if !username.is_empty() {
        if username.len() > 32 {
            return Err(SyncError::configuration(
                "Username too long: maximum 32 characters for MySQL",
            ));
        }
        config = config.with_username(username.to_string());
    }

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "connect_timeout" => {
                if let Some(timeout) = parse_timeout_secs(&value) {
                    config.connect_timeout = timeout;
                }
            }
            "query_timeout" => {
                if let Some(timeout) = parse_timeout_secs(&value) {
                    config.query_timeout = timeout;
                }
            }
            "pool_max_conns" => {
                if let Ok(max_conns) = value.parse::<u32>()
                    && max_conns > 0
                    && max_conns <= MAX_POOL_CONNECTIONS
                {
                    config.max_connections = max_conns;
                }
            }
            _ => {}
        }
    }

    config.validate()?;

    Ok(config)
}

fn parse_timeout_secs(value: &str) -> Option<Duration> {
    value
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .filter(|timeout| *timeout <= MAX_TIMEOUT)
}

/// Validates MySQL connection string format and security requirements
///
/// # Errors
/// Returns error if connection string is invalid or unsafe
pub fn validate_mysql_connection_string(connection_string: &str) -> Result<()> {
    let url = Url::parse(connection_string).map_err(|e| {
        SyncError::configuration(format!("Invalid MySQL connection string format: {}", e))
    })?;

    if url.scheme() != "mysql" {
        return Err(SyncError::configuration(
            "Connection string must use mysql:// scheme",
        ));
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(SyncError::configuration(
            "Connection string must specify a host",
        ));
    }

    Ok(())
}

/// Creates a MySQL connection pool that connects on first use
///
/// # Security Features
/// - Enforces connection limits
/// - Sets a statement execution limit and read-only session per connection
fn create_mysql_connection_pool(
    connection_string: &str,
    config: &ConnectionConfig,
) -> Result<MySqlPool> {
    use sqlx::Executor;

    let query_timeout_ms = config.query_timeout.as_millis();
    let read_only = config.read_only;

    let pool = sqlx::mysql::MySqlPoolOptions::new()
        .max_connections(config.max_connections.min(MAX_POOL_CONNECTIONS))
        .acquire_timeout(config.connect_timeout)
        .test_before_acquire(true)
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                conn.execute(format!("SET SESSION max_execution_time = {}", query_timeout_ms).as_str())
                    .await?;

                if read_only {
                    conn.execute("SET SESSION TRANSACTION READ ONLY").await?;
                }

                conn.execute("SET time_zone = '+00:00'").await?;

                Ok(())
            })
        })
        .connect_lazy(connection_string)
        .map_err(|e| {
            SyncError::collection_failed(
                format!(
                    "Failed to create MySQL connection pool to {}",
                    crate::adapters::redact_database_url(connection_string)
                ),
                e,
            )
        })?;

    Ok(pool)
}
