//! Core schema reconciliation for multi-source CDC table synchronization.
//!
//! Many source tables (for example one per shard) feed a single destination
//! table. This crate discovers the source tables, folds their schemas into
//! one unified schema along a type-widening lattice, creates or validates the
//! destination table in a target catalog, and then decides which runtime
//! schema changes the destination may absorb.
//!
//! # Guarantees
//! - Column types only ever widen; conflicting types abort at startup
//! - A primary key is inferred only when every source agrees on it
//! - Source access is read-only and credentials never reach logs or errors
//!
//! # Architecture
//! - `adapters`: source metadata access (MySQL, JSON snapshot)
//! - `discovery`: pattern-matched source table selection
//! - `lattice` and `reconcile`: widening rules and schema merging
//! - `catalog`: target table storage
//! - `evolution`: live schema change acceptance
//! - `sync`: the startup sequence tying these together

pub mod adapters;
pub mod catalog;
pub mod config;
pub mod discovery;
pub mod error;
pub mod evolution;
pub mod lattice;
pub mod logging;
pub mod matcher;
pub mod models;
pub mod reconcile;
pub mod sync;

// Re-export commonly used types
pub use adapters::{ConnectionConfig, SourceAdapter, create_adapter};
pub use catalog::{FileCatalog, MemoryCatalog, TargetCatalog};
pub use config::{DiscoveryConfig, SyncConfig};
pub use error::{Result, SyncError};
pub use evolution::{
    ChangeDecision, DeclaredType, EvolutionReport, LiveTargetSchema, SchemaChange,
    SchemaChangeEvent, SkipReason, can_apply_change,
};
pub use lattice::can_widen;
pub use matcher::{Matcher, MatcherKind};
pub use models::{
    Column, ColumnType, SourceSchema, TableIdentifier, TableRef, TargetSchema, TargetSchemaDraft,
    UnifiedSchema,
};
pub use sync::{SyncAction, SyncPlan, SyncPlanner};
