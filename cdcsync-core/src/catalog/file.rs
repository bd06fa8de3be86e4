//! Warehouse-directory catalog.
//!
//! Layout, one JSON file per schema version:
//!
//! ```text
//! <warehouse>/<database>.db/<table>/schema/schema-<id>.json
//! ```
//!
//! Version files are created with `create_new`, so a concurrent writer that
//! lost the race gets `SchemaVersionConflict` instead of overwriting.

use super::{TargetCatalog, check_next_version};
use crate::Result;
use crate::error::SyncError;
use crate::models::{TableIdentifier, TargetSchema, TargetSchemaDraft};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

const DATABASE_SUFFIX: &str = ".db";
const SCHEMA_DIR: &str = "schema";
const SCHEMA_FILE_PREFIX: &str = "schema-";
const SCHEMA_FILE_SUFFIX: &str = ".json";

/// Catalog rooted at a warehouse directory.
#[derive(Debug, Clone)]
pub struct FileCatalog {
    warehouse: PathBuf,
}

impl FileCatalog {
    /// Opens a warehouse, creating the directory if needed.
    ///
    /// # Errors
    /// Returns an I/O error if the directory cannot be created.
    pub async fn open(warehouse: impl Into<PathBuf>) -> Result<Self> {
        let warehouse = warehouse.into();
        tokio::fs::create_dir_all(&warehouse).await.map_err(|e| {
            SyncError::io(
                format!("Failed to create warehouse {}", warehouse.display()),
                e,
            )
        })?;

        tracing::debug!("Opened file catalog at {}", warehouse.display());

        Ok(Self { warehouse })
    }

    /// Root directory of the warehouse.
    pub fn warehouse(&self) -> &Path {
        &self.warehouse
    }

    /// All committed versions of a table, oldest first.
    pub async fn schema_history(&self, id: &TableIdentifier) -> Result<Vec<TargetSchema>> {
        let mut history = Vec::new();
        for schema_id in self.list_schema_ids(id).await? {
            history.push(self.read_schema(id, schema_id).await?);
        }
        Ok(history)
    }

    fn database_path(&self, database: &str) -> Result<PathBuf> {
        validate_name(database)?;
        Ok(self
            .warehouse
            .join(format!("{}{}", database, DATABASE_SUFFIX)))
    }

    fn schema_dir(&self, id: &TableIdentifier) -> Result<PathBuf> {
        validate_name(&id.table)?;
        Ok(self
            .database_path(&id.database)?
            .join(&id.table)
            .join(SCHEMA_DIR))
    }

    fn schema_file(&self, id: &TableIdentifier, schema_id: u64) -> Result<PathBuf> {
        Ok(self.schema_dir(id)?.join(format!(
            "{}{}{}",
            SCHEMA_FILE_PREFIX, schema_id, SCHEMA_FILE_SUFFIX
        )))
    }

    async fn list_schema_ids(&self, id: &TableIdentifier) -> Result<Vec<u64>> {
        let dir = self.schema_dir(id)?;
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(SyncError::io(
                    format!("Failed to list schema directory {}", dir.display()),
                    e,
                ));
            }
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            SyncError::io(
                format!("Failed to list schema directory {}", dir.display()),
                e,
            )
        })? {
            let file_name = entry.file_name();
            let parsed = file_name
                .to_str()
                .and_then(|name| name.strip_prefix(SCHEMA_FILE_PREFIX))
                .and_then(|name| name.strip_suffix(SCHEMA_FILE_SUFFIX))
                .and_then(|number| number.parse::<u64>().ok());
            if let Some(schema_id) = parsed {
                ids.push(schema_id);
            }
        }

        ids.sort_unstable();
        Ok(ids)
    }

    async fn read_schema(&self, id: &TableIdentifier, schema_id: u64) -> Result<TargetSchema> {
        let path = self.schema_file(id, schema_id)?;
        let json = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| SyncError::io(format!("Failed to read {}", path.display()), e))?;

        serde_json::from_str(&json)
            .map_err(|e| SyncError::serialization(format!("Failed to parse {}", path.display()), e))
    }

    async fn write_schema(&self, id: &TableIdentifier, schema: &TargetSchema) -> Result<()> {
        let path = self.schema_file(id, schema.schema_id)?;
        let json = serde_json::to_vec_pretty(schema).map_err(|e| {
            SyncError::serialization(format!("Failed to serialize schema for {}", id), e)
        })?;

        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(SyncError::SchemaVersionConflict {
                    table: id.to_string(),
                    expected: schema.schema_id.saturating_add(1),
                    actual: schema.schema_id,
                });
            }
            Err(e) => {
                return Err(SyncError::io(
                    format!("Failed to create {}", path.display()),
                    e,
                ));
            }
        };

        file.write_all(&json)
            .await
            .map_err(|e| SyncError::io(format!("Failed to write {}", path.display()), e))?;
        file.flush()
            .await
            .map_err(|e| SyncError::io(format!("Failed to write {}", path.display()), e))?;

        tracing::debug!(
            "Wrote schema {} of table {} to {}",
            schema.schema_id,
            id,
            path.display()
        );

        Ok(())
    }

    async fn latest_schema(&self, id: &TableIdentifier) -> Result<Option<TargetSchema>> {
        match self.list_schema_ids(id).await?.last() {
            Some(schema_id) => Ok(Some(self.read_schema(id, *schema_id).await?)),
            None => Ok(None),
        }
    }
}

/// Rejects names that would escape the warehouse directory.
fn validate_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0')
    {
        return Err(SyncError::configuration(format!(
            "Invalid catalog object name '{}'",
            name
        )));
    }
    Ok(())
}

#[async_trait]
impl TargetCatalog for FileCatalog {
    async fn create_database(&self, database: &str, ignore_if_exists: bool) -> Result<()> {
        let path = self.database_path(database)?;
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            if ignore_if_exists {
                return Ok(());
            }
            return Err(SyncError::DatabaseAlreadyExists {
                database: database.to_string(),
            });
        }

        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|e| SyncError::io(format!("Failed to create {}", path.display()), e))?;

        tracing::info!("Created database '{}' in {}", database, self.warehouse.display());
        Ok(())
    }

    async fn database_exists(&self, database: &str) -> Result<bool> {
        let path = self.database_path(database)?;
        Ok(tokio::fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn get_table(&self, id: &TableIdentifier) -> Result<Option<TargetSchema>> {
        self.latest_schema(id).await
    }

    async fn create_table(
        &self,
        id: &TableIdentifier,
        draft: TargetSchemaDraft,
    ) -> Result<TargetSchema> {
        if !self.database_exists(&id.database).await? {
            return Err(SyncError::DatabaseNotFound {
                database: id.database.clone(),
            });
        }

        if !self.list_schema_ids(id).await?.is_empty() {
            return Err(SyncError::TableAlreadyExists {
                table: id.to_string(),
            });
        }

        let dir = self.schema_dir(id)?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| SyncError::io(format!("Failed to create {}", dir.display()), e))?;

        let schema = TargetSchema::from_draft(draft);
        self.write_schema(id, &schema).await.map_err(|e| match e {
            SyncError::SchemaVersionConflict { .. } => SyncError::TableAlreadyExists {
                table: id.to_string(),
            },
            other => other,
        })?;

        tracing::info!(
            "Created table {} with {} columns",
            id,
            schema.fields.len()
        );
        Ok(schema)
    }

    async fn commit_schema(&self, id: &TableIdentifier, schema: &TargetSchema) -> Result<()> {
        let latest = self
            .latest_schema(id)
            .await?
            .ok_or_else(|| SyncError::TableNotFound {
                table: id.to_string(),
            })?;

        check_next_version(id, &latest, schema)?;
        self.write_schema(id, schema).await
    }
}
