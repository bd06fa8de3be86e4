//! MySQL source adapter with connection pooling and metadata collection.
//!
//! # Module Structure
//! - `connection`: Connection pool management and validation
//! - `schema_collection`: Database, table, column and primary key listing
//!
//! # Security Guarantees
//! - All operations are read-only (SELECT against INFORMATION_SCHEMA only)
//! - Connection strings are sanitized in error messages
//! - Query timeouts prevent resource exhaustion
//! - Connection pooling with configurable limits

pub mod connection;
pub mod schema_collection;

#[cfg(test)]
mod tests;

use super::{ConnectionConfig, RawTableMetadata, SourceAdapter, SourceType};
use crate::Result;
use crate::models::TableRef;
use async_trait::async_trait;
use sqlx::MySqlPool;

/// Databases that hold server metadata rather than user tables.
pub const SYSTEM_DATABASES: &[&str] = &["mysql", "information_schema", "performance_schema", "sys"];

/// MySQL source adapter with connection pooling
pub struct MySqlAdapter {
    /// Connection pool for metadata queries
    pub pool: MySqlPool,
    /// Connection configuration (pool settings, timeouts, etc.)
    pub config: ConnectionConfig,
}

impl std::fmt::Debug for MySqlAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlAdapter")
            .field("config", &self.config)
            .field("pool_size", &self.pool.size())
            .field("pool_idle", &self.pool.num_idle())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SourceAdapter for MySqlAdapter {
    async fn test_connection(&self) -> Result<()> {
        let connectivity_result: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(crate::error::SyncError::connection_failed)?;

        if connectivity_result != 1 {
            return Err(crate::error::SyncError::configuration(
                "Basic connectivity test failed: unexpected result",
            ));
        }

        // Discovery reads nothing but INFORMATION_SCHEMA
        let schema_access_test: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_SCHEMA = 'information_schema'",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            crate::error::SyncError::collection_failed("Cannot access INFORMATION_SCHEMA", e)
        })?;

        if schema_access_test == 0 {
            return Err(crate::error::SyncError::configuration(
                "No access to INFORMATION_SCHEMA tables",
            ));
        }

        Ok(())
    }

    async fn list_databases(&self) -> Result<Vec<String>> {
        schema_collection::list_databases(self).await
    }

    async fn list_tables(&self, database: &str) -> Result<Vec<String>> {
        schema_collection::list_tables(self, database).await
    }

    async fn describe_table(&self, table: &TableRef) -> Result<RawTableMetadata> {
        schema_collection::describe_table(self, table).await
    }

    fn source_type(&self) -> SourceType {
        SourceType::MySql
    }

    fn connection_config(&self) -> ConnectionConfig {
        self.config.clone()
    }

    fn is_system_database(&self, database: &str) -> bool {
        SYSTEM_DATABASES.contains(&database.to_lowercase().as_str())
    }
}
