//! Source adapter backed by a JSON metadata snapshot.
//!
//! A snapshot records what a live source would report from its catalog:
//! databases, their tables, and each table's raw columns and primary key.
//! It lets discovery and reconciliation run offline and in tests.
//!
//! ```json
//! {
//!   "databases": {
//!     "shop_1": {
//!       "orders": {
//!         "columns": [
//!           { "name": "id", "native_type": "int" },
//!           { "name": "note", "native_type": "varchar", "precision": 20 }
//!         ],
//!         "primary_key": ["id"]
//!       }
//!     }
//!   }
//! }
//! ```

use super::{ConnectionConfig, RawTableMetadata, SourceAdapter, SourceType};
use crate::Result;
use crate::error::SyncError;
use crate::models::TableRef;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Databases mapped to tables mapped to their metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSnapshot {
    /// Table metadata keyed by database, then table
    #[serde(default)]
    pub databases: BTreeMap<String, BTreeMap<String, RawTableMetadata>>,
    /// Databases treated as server metadata by discovery
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub system_databases: Vec<String>,
}

impl SourceSnapshot {
    /// Builder method to add (or replace) one table.
    pub fn with_table(
        mut self,
        database: impl Into<String>,
        table: impl Into<String>,
        metadata: RawTableMetadata,
    ) -> Self {
        self.databases
            .entry(database.into())
            .or_default()
            .insert(table.into(), metadata);
        self
    }

    /// Builder method to register an empty database.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.databases.entry(database.into()).or_default();
        self
    }
}

/// Read-only adapter over a [`SourceSnapshot`].
#[derive(Debug, Clone)]
pub struct SnapshotAdapter {
    path: Option<PathBuf>,
    snapshot: SourceSnapshot,
}

impl SnapshotAdapter {
    /// Serves an in-memory snapshot.
    pub fn new(snapshot: SourceSnapshot) -> Self {
        Self {
            path: None,
            snapshot,
        }
    }

    /// Parses a snapshot from a JSON string.
    ///
    /// # Errors
    /// Returns a serialization error if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot = serde_json::from_str(json)
            .map_err(|e| SyncError::serialization("Failed to parse source snapshot", e))?;
        Ok(Self::new(snapshot))
    }

    /// Loads a snapshot file.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be read, or a serialization
    /// error if it is not a valid snapshot.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            SyncError::io(
                format!("Failed to read source snapshot {}", path.display()),
                e,
            )
        })?;

        let snapshot = serde_json::from_str(&json).map_err(|e| {
            SyncError::serialization(
                format!("Failed to parse source snapshot {}", path.display()),
                e,
            )
        })?;

        tracing::debug!("Loaded source snapshot from {}", path.display());

        Ok(Self {
            path: Some(path.to_path_buf()),
            snapshot,
        })
    }

    /// The catalog being served.
    pub fn snapshot(&self) -> &SourceSnapshot {
        &self.snapshot
    }
}

#[async_trait]
impl SourceAdapter for SnapshotAdapter {
    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn list_databases(&self) -> Result<Vec<String>> {
        Ok(self.snapshot.databases.keys().cloned().collect())
    }

    async fn list_tables(&self, database: &str) -> Result<Vec<String>> {
        Ok(self
            .snapshot
            .databases
            .get(database)
            .map(|tables| tables.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn describe_table(&self, table: &TableRef) -> Result<RawTableMetadata> {
        self.snapshot
            .databases
            .get(&table.database)
            .and_then(|tables| tables.get(&table.table))
            .cloned()
            .ok_or_else(|| {
                SyncError::configuration(format!("Table {} not found in source snapshot", table))
            })
    }

    fn source_type(&self) -> SourceType {
        SourceType::Snapshot
    }

    fn connection_config(&self) -> ConnectionConfig {
        let host = self
            .path
            .as_ref()
            .map_or_else(|| "memory".to_string(), |p| p.display().to_string());
        ConnectionConfig::new(host)
    }

    fn is_system_database(&self, database: &str) -> bool {
        self.snapshot.system_databases.iter().any(|d| d == database)
    }
}
