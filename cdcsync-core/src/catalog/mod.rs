//! Target catalogs holding destination table schemas.
//!
//! A catalog stores every committed version of a table's schema. Version 0
//! is written by [`TargetCatalog::create_table`]; each later version must
//! carry the next `schema_id` and is written by
//! [`TargetCatalog::commit_schema`].
//!
//! # Module Structure
//! - `file`: Warehouse directory of JSON schema files
//! - `memory`: In-process catalog for tests and dry runs

use crate::Result;
use crate::error::SyncError;
use crate::models::{TableIdentifier, TargetSchema, TargetSchemaDraft};
use async_trait::async_trait;

mod file;
mod memory;

pub use file::FileCatalog;
pub use memory::MemoryCatalog;

/// Destination catalog the reconciled schema is written to.
#[async_trait]
pub trait TargetCatalog: Send + Sync {
    /// Creates a database.
    ///
    /// # Errors
    /// Returns `DatabaseAlreadyExists` if it exists and `ignore_if_exists`
    /// is false.
    async fn create_database(&self, database: &str, ignore_if_exists: bool) -> Result<()>;

    async fn database_exists(&self, database: &str) -> Result<bool>;

    /// Returns the latest schema of a table, or `None` if it does not exist.
    async fn get_table(&self, id: &TableIdentifier) -> Result<Option<TargetSchema>>;

    /// Creates a table from a draft and returns its first schema version.
    ///
    /// # Errors
    /// - `DatabaseNotFound` if the database was never created
    /// - `TableAlreadyExists` if the table exists
    async fn create_table(
        &self,
        id: &TableIdentifier,
        draft: TargetSchemaDraft,
    ) -> Result<TargetSchema>;

    /// Records a new schema version.
    ///
    /// # Errors
    /// - `TableNotFound` if the table does not exist
    /// - `SchemaVersionConflict` unless `schema.schema_id` is the latest
    ///   committed id plus one
    async fn commit_schema(&self, id: &TableIdentifier, schema: &TargetSchema) -> Result<()>;
}

/// Checks that `schema` directly follows `latest`.
pub(crate) fn check_next_version(
    id: &TableIdentifier,
    latest: &TargetSchema,
    schema: &TargetSchema,
) -> Result<()> {
    let expected = latest.schema_id.saturating_add(1);
    if schema.schema_id != expected {
        return Err(SyncError::SchemaVersionConflict {
            table: id.to_string(),
            expected,
            actual: schema.schema_id,
        });
    }
    Ok(())
}
