//! Schema reconciliation: merging source schemas, building a fresh target
//! schema, and checking an existing target against the merged sources.
//!
//! # Policy
//! - Conflicting column types resolve to the widest source type. A column is
//!   only rejected when no declared type absorbs all the others, so the
//!   outcome does not depend on source order.
//! - A primary key is only carried forward when every source declares the
//!   same ordered key. Any disagreement leaves the key undetermined, and
//!   [`build_target`] then requires an explicit key.

use crate::error::{Result, SyncError};
use crate::lattice::{can_widen, wider_of};
use crate::models::{
    Column, ColumnType, ContendingType, SourceSchema, TableRef, TargetSchema, TargetSchemaDraft,
    UnifiedColumn, UnifiedSchema, describe_fields,
};
use std::collections::BTreeMap;

/// Folds source schemas left to right into one unified schema.
///
/// # Errors
/// - `NoMatchingSource` if `schemas` is empty
/// - `IncompatibleColumnType` if no source type of some column is wide
///   enough to hold every other source type of that column
pub fn merge(schemas: &[SourceSchema]) -> Result<UnifiedSchema> {
    let (first, rest) = schemas
        .split_first()
        .ok_or_else(|| SyncError::NoMatchingSource {
            database_pattern: String::new(),
            table_pattern: String::new(),
        })?;

    let unified = rest
        .iter()
        .fold(UnifiedSchema::from_source(first), combine);

    if let Some((column, rival)) = unified
        .columns
        .iter()
        .find_map(|c| c.contenders.first().map(|rival| (c, rival)))
    {
        return Err(SyncError::IncompatibleColumnType {
            column: column.name.clone(),
            first_origin: column.origin.to_string(),
            first_type: column.column_type.to_string(),
            second_origin: rival.origin.to_string(),
            second_type: rival.column_type.to_string(),
        });
    }

    tracing::debug!(
        "Merged {} source schema(s) into {} column(s), primary key {:?}",
        schemas.len(),
        unified.columns.len(),
        unified.primary_key
    );

    Ok(unified)
}

/// One fold step: merges `next` into the accumulated schema.
///
/// A type incomparable with the accumulated one is parked on the column as
/// a contender rather than failing, since a later source may declare a type
/// wide enough for both. [`merge`] rejects whatever is still contested at
/// the end.
pub fn combine(mut acc: UnifiedSchema, next: &SourceSchema) -> UnifiedSchema {
    for column in &next.columns {
        match acc.columns.iter_mut().find(|c| c.name == column.name) {
            None => acc.columns.push(UnifiedColumn::new(
                column.name.clone(),
                column.column_type.clone(),
                next.origin.clone(),
            )),
            Some(existing) => absorb(existing, &column.column_type, &next.origin),
        }
    }

    if acc.primary_key != next.primary_key {
        if acc.has_primary_key() || !next.primary_key.is_empty() {
            tracing::debug!(
                "Primary key of {} ({:?}) differs from {:?}; leaving it undetermined",
                next.origin,
                next.primary_key,
                acc.primary_key
            );
        }
        acc.primary_key.clear();
    }

    acc.origins.push(next.origin.clone());
    acc
}

/// Keeps `existing` plus its contenders as the set of widest types seen.
fn absorb(existing: &mut UnifiedColumn, incoming: &ColumnType, origin: &TableRef) {
    if existing
        .contenders
        .iter()
        .any(|rival| can_widen(incoming, &rival.column_type))
    {
        return;
    }

    let widens_current = match wider_of(&existing.column_type, incoming) {
        Some(wider) if wider == &existing.column_type => return,
        Some(_) => true,
        None => false,
    };

    existing
        .contenders
        .retain(|rival| !can_widen(&rival.column_type, incoming));

    if widens_current {
        tracing::debug!(
            "Widening column '{}' from {} ({}) to {} ({})",
            existing.name,
            existing.column_type,
            existing.origin,
            incoming,
            origin
        );
        existing.column_type = incoming.clone();
        existing.origin = origin.clone();
    } else {
        tracing::debug!(
            "Column '{}' has incomparable types {} ({}) and {} ({}) so far",
            existing.name,
            existing.column_type,
            existing.origin,
            incoming,
            origin
        );
        existing.contenders.push(ContendingType {
            column_type: incoming.clone(),
            origin: origin.clone(),
        });
    }
}

/// Builds the schema for a destination table that does not exist yet.
///
/// Primary key resolution: explicit keys win (and must name unified columns),
/// then the unanimous source key; otherwise the caller must supply one.
///
/// # Errors
/// - `UnknownPrimaryKeyColumn` if an explicit key names a missing column
/// - `PrimaryKeyRequired` if no key is given and none was inferred
pub fn build_target(
    unified: &UnifiedSchema,
    explicit_primary_keys: &[String],
    explicit_partition_keys: &[String],
    options: &BTreeMap<String, String>,
) -> Result<TargetSchemaDraft> {
    let primary_keys = if !explicit_primary_keys.is_empty() {
        if let Some(missing) = explicit_primary_keys
            .iter()
            .find(|key| unified.column(key).is_none())
        {
            return Err(SyncError::UnknownPrimaryKeyColumn {
                column: missing.clone(),
            });
        }
        explicit_primary_keys.to_vec()
    } else if unified.has_primary_key() {
        unified.primary_key.clone()
    } else {
        return Err(SyncError::PrimaryKeyRequired);
    };

    Ok(TargetSchemaDraft {
        columns: unified.fields(),
        primary_keys,
        partition_keys: explicit_partition_keys.to_vec(),
        options: options.clone(),
    })
}

/// Checks whether an existing target table can hold every unified column.
///
/// Extra target columns are allowed. A `false` result is an ordinary outcome,
/// see [`ensure_compatible`] for the error form.
pub fn is_compatible(existing: &TargetSchema, unified: &UnifiedSchema) -> bool {
    unified.columns.iter().all(|column| {
        existing
            .field(&column.name)
            .is_some_and(|field| can_widen(&column.column_type, &field.column_type))
    })
}

/// Like [`is_compatible`], but returns a descriptive error listing both field
/// sets when the target is too narrow or missing columns.
///
/// # Errors
/// Returns `SchemaMismatch` if the schemas are not compatible.
pub fn ensure_compatible(existing: &TargetSchema, unified: &UnifiedSchema) -> Result<()> {
    if is_compatible(existing, unified) {
        return Ok(());
    }

    let source_fields: Vec<Column> = unified.fields();
    Err(SyncError::SchemaMismatch {
        target_fields: describe_fields(&existing.fields),
        source_fields: describe_fields(&source_fields),
    })
}
