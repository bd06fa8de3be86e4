//! Subcommand implementations. Each returns its result instead of printing
//! so `main` owns stdout.

use crate::cli::{ReplayArgs, SourceArgs, SyncTableArgs};
use crate::credentials::resolve_source;
use crate::output::save_json;
use cdcsync_core::adapters::type_mapping::{
    SUPPORTED_MYSQL_TYPES, map_column_definition, map_mysql_type,
};
use cdcsync_core::catalog::{FileCatalog, MemoryCatalog, TargetCatalog};
use cdcsync_core::error::redact_database_url;
use cdcsync_core::evolution::{
    ChangeDecision, EvolutionReport, LiveTargetSchema, SchemaChange, SchemaChangeEvent,
    evaluate_change,
};
use cdcsync_core::models::{Column, ColumnType, TargetSchema, TargetSchemaDraft};
use cdcsync_core::{Result, SyncError, SyncPlan, SyncPlanner, create_adapter};
use futures::stream;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;
use tracing::{error, info};

/// Source string safe for logs.
fn describe_source(source: &str) -> String {
    if source.contains("://") {
        redact_database_url(source)
    } else {
        source.to_string()
    }
}

/// Discovers, merges and creates or validates the target table.
///
/// A dry run against a warehouse that does not exist yet plans against an
/// empty catalog so nothing is created on disk.
pub async fn sync_table(args: &SyncTableArgs) -> Result<SyncPlan> {
    let planner = SyncPlanner::new(args.sync_config())?;
    let source = resolve_source(&args.source.source, args.source.password_prompt)?;

    info!("Source: {}", describe_source(&source));
    info!("Warehouse: {}", args.target.warehouse.display());

    let adapter = create_adapter(&source).await.map_err(|e| {
        error!("Failed to create source adapter: {}", e);
        e
    })?;
    info!("Created {} adapter", adapter.source_type());

    let warehouse_exists = tokio::fs::try_exists(&args.target.warehouse)
        .await
        .map_err(|e| SyncError::io("Failed to inspect warehouse", e))?;

    let plan = if args.dry_run && !warehouse_exists {
        planner.plan(adapter.as_ref(), &MemoryCatalog::new()).await
    } else {
        let catalog = FileCatalog::open(&args.target.warehouse).await?;
        planner.plan(adapter.as_ref(), &catalog).await
    }
    .map_err(|e| {
        error!("Sync planning failed: {}", e);
        e
    })?;

    info!(
        "✓ {} {} from {} source table(s)",
        plan.action,
        args.target.identifier(),
        plan.origins().len()
    );

    if let Some(path) = &args.output {
        save_json(&plan, path).await?;
    }

    Ok(plan)
}

/// Reads schema change events from a JSON Lines file. Blank lines are
/// ignored; any malformed line fails the whole file.
pub async fn read_events(path: &Path) -> Result<Vec<SchemaChangeEvent>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SyncError::io(format!("Failed to read {}", path.display()), e))?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|e| {
                SyncError::serialization(
                    format!("Invalid schema change event on line {}", index + 1),
                    e,
                )
            })
        })
        .collect()
}

/// Applies a recorded event stream to the target table and commits every
/// produced schema version unless `dry_run` is set.
pub async fn replay(args: &ReplayArgs) -> Result<EvolutionReport> {
    let id = args.target.identifier();
    let catalog = FileCatalog::open(&args.target.warehouse).await?;
    let current = catalog
        .get_table(&id)
        .await?
        .ok_or_else(|| SyncError::TableNotFound {
            table: id.to_string(),
        })?;

    let events = read_events(&args.events).await?;
    info!(
        "Replaying {} event(s) against {} (schema {})",
        events.len(),
        id,
        current.schema_id
    );

    let live = LiveTargetSchema::new(current);
    let report = live.process_stream(stream::iter(events)).await;

    if args.dry_run {
        info!("Dry run: {} schema version(s) not committed", report.applied.len());
        return Ok(report);
    }

    for schema in &report.applied {
        catalog.commit_schema(&id, schema).await?;
    }
    if let Some(latest) = report.applied.last() {
        info!("✓ Committed {} up to schema {}", id, latest.schema_id);
    }

    Ok(report)
}

fn parse_definition(definition: &str) -> Result<ColumnType> {
    map_column_definition(definition).ok_or_else(|| {
        SyncError::configuration(format!("Unrecognized column definition '{}'", definition))
    })
}

/// Evaluates an in-place type change of one column the same way a live
/// `ALTER COLUMN` event is evaluated.
pub fn check_change(from: &str, to: &str) -> Result<ChangeDecision> {
    let old_type = parse_definition(from)?;
    let new_type = parse_definition(to)?;

    let current = TargetSchema::from_draft(TargetSchemaDraft {
        columns: vec![Column::new("value", old_type.clone())],
        primary_keys: Vec::new(),
        partition_keys: Vec::new(),
        options: BTreeMap::new(),
    });
    let change = SchemaChange::AlterColumnType {
        column: "value".to_string(),
        old_type: old_type.into(),
        new_type: new_type.into(),
    };

    Ok(evaluate_change(&current, &change))
}

/// One-line verdict for `check-change`.
pub fn describe_decision(from: &str, to: &str, decision: &ChangeDecision) -> String {
    match decision {
        ChangeDecision::Apply(schema) => {
            let widened = schema
                .field("value")
                .map_or_else(String::new, |column| column.column_type.to_string());
            format!("apply: {} -> {}", from, widened)
        }
        ChangeDecision::Unchanged => format!("unchanged: {} already holds {}", from, to),
        ChangeDecision::Skip(reason) => format!("skip: {}", reason),
    }
}

/// Tests the source connection.
pub async fn test_connection(args: &SourceArgs) -> Result<String> {
    info!("Testing source connection...");
    let source = resolve_source(&args.source, args.password_prompt)?;

    let adapter = create_adapter(&source).await?;
    adapter.test_connection().await.map_err(|e| {
        error!("Connection test failed: {}", e);
        e
    })?;

    info!("✓ Connection test successful");
    Ok(format!(
        "Connection to {} source {} successful",
        adapter.source_type(),
        describe_source(&source)
    ))
}

/// Table of supported MySQL types with their default target mapping.
pub fn list_types() -> String {
    let mut out = String::from("Supported MySQL types (default length/precision):\n");
    for native_type in SUPPORTED_MYSQL_TYPES {
        let mapped = map_mysql_type(native_type, None, None)
            .map_or_else(|| "-".to_string(), |column_type| column_type.to_string());
        let _ = writeln!(out, "  {:<20} {}", native_type, mapped);
    }
    out
}
