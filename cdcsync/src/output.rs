//! Rendering of plans and evolution reports for the terminal or as JSON.

use cdcsync_core::evolution::EvolutionReport;
use cdcsync_core::models::{Column, TargetSchema};
use cdcsync_core::{Result, SyncError, SyncPlan};
use clap::ValueEnum;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

/// Output format for command results written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map(|json| json + "\n")
        .map_err(|e| SyncError::serialization("JSON serialization", e))
}

fn join_or_dash(values: &[String]) -> String {
    if values.is_empty() {
        "-".to_string()
    } else {
        values.join(", ")
    }
}

fn write_fields(out: &mut String, fields: &[Column]) {
    for field in fields {
        let _ = writeln!(out, "  {:<24} {}", field.name, field.column_type);
    }
}

fn write_schema(out: &mut String, schema: &TargetSchema) {
    let _ = writeln!(out, "Schema {}:", schema.schema_id);
    write_fields(out, &schema.fields);
    let _ = writeln!(out, "Primary keys: {}", join_or_dash(&schema.primary_keys));
    let _ = writeln!(out, "Partition keys: {}", join_or_dash(&schema.partition_keys));
    if !schema.options.is_empty() {
        let options: Vec<String> = schema
            .options
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect();
        let _ = writeln!(out, "Options: {}", options.join(", "));
    }
}

/// Renders the result of `sync-table`.
pub fn render_plan(plan: &SyncPlan, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return to_json(plan);
    }

    let mut out = String::new();
    let _ = writeln!(out, "Action: {}", plan.action);
    let origins: Vec<String> = plan.origins().iter().map(ToString::to_string).collect();
    let _ = writeln!(out, "Sources ({}): {}", origins.len(), origins.join(", "));
    write_schema(&mut out, &plan.target);
    Ok(out)
}

/// Renders the result of `replay`.
pub fn render_report(report: &EvolutionReport, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return to_json(report);
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "Events: {} ({} applied, {} unchanged, {} skipped)",
        report.total(),
        report.applied.len(),
        report.unchanged,
        report.skipped.len()
    );
    for skipped in &report.skipped {
        let _ = writeln!(
            out,
            "Skipped '{}' from {}: {}",
            skipped.event.change, skipped.event.origin, skipped.reason
        );
    }
    if let Some(latest) = report.applied.last() {
        write_schema(&mut out, latest);
    }
    Ok(out)
}

/// Writes `value` as pretty JSON to `path`.
pub async fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = to_json(value)?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| SyncError::io(format!("Failed to write {}", path.display()), e))?;
    tracing::info!("✓ Wrote {}", path.display());
    Ok(())
}
