use super::{TargetCatalog, check_next_version};
use crate::Result;
use crate::error::SyncError;
use crate::models::{TableIdentifier, TargetSchema, TargetSchemaDraft};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

type Tables = BTreeMap<String, Vec<TargetSchema>>;

/// Catalog kept in memory; every schema version is retained.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    databases: RwLock<BTreeMap<String, Tables>>,
}

impl MemoryCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// All committed versions of a table, oldest first.
    pub async fn schema_history(&self, id: &TableIdentifier) -> Vec<TargetSchema> {
        let databases = self.databases.read().await;
        databases
            .get(&id.database)
            .and_then(|tables| tables.get(&id.table))
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl TargetCatalog for MemoryCatalog {
    async fn create_database(&self, database: &str, ignore_if_exists: bool) -> Result<()> {
        let mut databases = self.databases.write().await;
        if databases.contains_key(database) {
            if ignore_if_exists {
                return Ok(());
            }
            return Err(SyncError::DatabaseAlreadyExists {
                database: database.to_string(),
            });
        }
        databases.insert(database.to_string(), Tables::new());
        Ok(())
    }

    async fn database_exists(&self, database: &str) -> Result<bool> {
        Ok(self.databases.read().await.contains_key(database))
    }

    async fn get_table(&self, id: &TableIdentifier) -> Result<Option<TargetSchema>> {
        let databases = self.databases.read().await;
        Ok(databases
            .get(&id.database)
            .and_then(|tables| tables.get(&id.table))
            .and_then(|versions| versions.last())
            .cloned())
    }

    async fn create_table(
        &self,
        id: &TableIdentifier,
        draft: TargetSchemaDraft,
    ) -> Result<TargetSchema> {
        let mut databases = self.databases.write().await;
        let tables = databases
            .get_mut(&id.database)
            .ok_or_else(|| SyncError::DatabaseNotFound {
                database: id.database.clone(),
            })?;

        if tables.contains_key(&id.table) {
            return Err(SyncError::TableAlreadyExists {
                table: id.to_string(),
            });
        }

        let schema = TargetSchema::from_draft(draft);
        tables.insert(id.table.clone(), vec![schema.clone()]);
        Ok(schema)
    }

    async fn commit_schema(&self, id: &TableIdentifier, schema: &TargetSchema) -> Result<()> {
        let mut databases = self.databases.write().await;
        let versions = databases
            .get_mut(&id.database)
            .and_then(|tables| tables.get_mut(&id.table))
            .ok_or_else(|| SyncError::TableNotFound {
                table: id.to_string(),
            })?;

        if let Some(latest) = versions.last() {
            check_next_version(id, latest, schema)?;
        }
        versions.push(schema.clone());
        Ok(())
    }
}
