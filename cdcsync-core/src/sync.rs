//! Startup sequence for one synchronized table.
//!
//! Discovers the matching source tables, merges their schemas, then either
//! validates the existing target table or creates it.

use crate::adapters::SourceAdapter;
use crate::catalog::TargetCatalog;
use crate::config::SyncConfig;
use crate::discovery::discover;
use crate::error::Result;
use crate::models::{TableRef, TargetSchema, UnifiedSchema};
use crate::reconcile::{build_target, ensure_compatible, merge};
use serde::Serialize;
use std::fmt;

/// What the planner did (or would do) to the target table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    /// The table already existed and can hold every source column
    UseExisting,
    /// The table was created
    Created,
    /// Dry run: the table does not exist and would be created
    WouldCreate,
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncAction::UseExisting => write!(f, "use existing table"),
            SyncAction::Created => write!(f, "created table"),
            SyncAction::WouldCreate => write!(f, "would create table"),
        }
    }
}

/// Result of planning one table.
#[derive(Debug, Clone, Serialize)]
pub struct SyncPlan {
    /// What planning did to the target table
    pub action: SyncAction,
    /// Merged source schema
    pub unified: UnifiedSchema,
    /// Schema of the target table as it is (or would be) after planning
    pub target: TargetSchema,
}

impl SyncPlan {
    /// Source tables that contributed to the unified schema.
    pub fn origins(&self) -> &[TableRef] {
        &self.unified.origins
    }
}

/// Runs discovery, reconciliation and target creation or validation.
#[derive(Debug, Clone)]
pub struct SyncPlanner {
    config: SyncConfig,
}

impl SyncPlanner {
    /// Creates a planner from a validated config.
    ///
    /// # Errors
    /// Returns the config's validation error.
    pub fn new(config: SyncConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The validated config.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Plans and, unless configured as a dry run, applies the target change.
    ///
    /// # Errors
    /// Any discovery, reconciliation or catalog error; all are fatal.
    pub async fn plan(
        &self,
        adapter: &dyn SourceAdapter,
        catalog: &dyn TargetCatalog,
    ) -> Result<SyncPlan> {
        let config = &self.config;
        let target_id = &config.target;

        tracing::info!(
            "Discovering {} source tables for {} (database pattern '{}', table pattern '{}')",
            adapter.source_type(),
            target_id,
            config.discovery.database_pattern,
            config.discovery.table_pattern
        );
        let sources = discover(adapter, &config.discovery).await?;

        let unified = merge(&sources)?;
        tracing::info!(
            "Merged {} source table(s) into {} column(s)",
            unified.origins.len(),
            unified.columns.len()
        );

        if !config.dry_run {
            catalog.create_database(&target_id.database, true).await?;
        }

        if let Some(existing) = catalog.get_table(target_id).await? {
            ensure_compatible(&existing, &unified)?;
            tracing::info!(
                "Target table {} (schema {}) is compatible with the sources",
                target_id,
                existing.schema_id
            );
            return Ok(SyncPlan {
                action: SyncAction::UseExisting,
                unified,
                target: existing,
            });
        }

        let draft = build_target(
            &unified,
            &config.primary_keys,
            &config.partition_keys,
            &config.table_options,
        )?;

        if config.dry_run {
            tracing::info!("Dry run: table {} would be created", target_id);
            return Ok(SyncPlan {
                action: SyncAction::WouldCreate,
                unified,
                target: TargetSchema::from_draft(draft),
            });
        }

        let target = catalog.create_table(target_id, draft).await?;
        Ok(SyncPlan {
            action: SyncAction::Created,
            unified,
            target,
        })
    }
}
