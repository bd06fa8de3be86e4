//! Source table discovery.
//!
//! Walks the source catalog, keeps the databases and tables selected by the
//! configured matchers, and turns each table's raw metadata into a
//! [`SourceSchema`]. Table metadata reads run concurrently but the result
//! keeps catalog order.

use crate::adapters::{RawTableMetadata, SourceAdapter};
use crate::config::DiscoveryConfig;
use crate::error::{Result, SyncError};
use crate::matcher::Matcher;
use crate::models::{Column, SourceSchema, TableRef};
use futures::{StreamExt, TryStreamExt, stream};

/// Discovers source schemas using the matchers built from `config`.
///
/// # Errors
/// Same as [`discover_sources`], plus `InvalidPattern` for a bad pattern.
pub async fn discover(
    adapter: &dyn SourceAdapter,
    config: &DiscoveryConfig,
) -> Result<Vec<SourceSchema>> {
    let database_matcher = config.database_matcher()?;
    let table_matcher = config.table_matcher()?;
    discover_sources(adapter, database_matcher.as_ref(), table_matcher.as_ref(), config).await
}

/// Lists matching tables and reads their schemas.
///
/// # Errors
/// - `NoMatchingSource` if no table satisfies both matchers
/// - `UnrecognizedNativeType` for the first column whose type has no mapping
/// - Adapter errors from listing or describing tables
pub async fn discover_sources(
    adapter: &dyn SourceAdapter,
    database_matcher: &dyn Matcher,
    table_matcher: &dyn Matcher,
    config: &DiscoveryConfig,
) -> Result<Vec<SourceSchema>> {
    let tables = list_matching_tables(adapter, database_matcher, table_matcher, config).await?;

    if tables.is_empty() {
        return Err(SyncError::NoMatchingSource {
            database_pattern: database_matcher.pattern().to_string(),
            table_pattern: table_matcher.pattern().to_string(),
        });
    }

    tracing::info!(
        "Discovered {} source table(s) matching {} / {}",
        tables.len(),
        database_matcher.pattern(),
        table_matcher.pattern()
    );

    let describe_futures = tables.into_iter().map(|origin| async move {
        let metadata = adapter.describe_table(&origin).await?;
        to_source_schema(adapter, origin, metadata)
    });

    stream::iter(describe_futures)
        .buffered(config.max_concurrency.max(1))
        .try_collect()
        .await
}

/// Enumerates `database.table` pairs accepted by both matchers.
pub async fn list_matching_tables(
    adapter: &dyn SourceAdapter,
    database_matcher: &dyn Matcher,
    table_matcher: &dyn Matcher,
    config: &DiscoveryConfig,
) -> Result<Vec<TableRef>> {
    let mut matched = Vec::new();

    for database in adapter.list_databases().await? {
        if !config.include_system && adapter.is_system_database(&database) {
            tracing::trace!("Skipping system database '{}'", database);
            continue;
        }
        if !database_matcher.matches(&database) {
            continue;
        }

        for table in adapter.list_tables(&database).await? {
            if table_matcher.matches(&table) {
                tracing::debug!("Matched source table {}.{}", database, table);
                matched.push(TableRef::new(database.clone(), table));
            }
        }
    }

    Ok(matched)
}

/// Maps raw column metadata to a source schema.
///
/// # Errors
/// Returns `UnrecognizedNativeType` for a column the adapter cannot map.
pub fn to_source_schema(
    adapter: &dyn SourceAdapter,
    origin: TableRef,
    metadata: RawTableMetadata,
) -> Result<SourceSchema> {
    let columns = metadata
        .columns
        .iter()
        .map(|raw| {
            adapter
                .map_native_type(raw)
                .map(|column_type| Column::new(raw.name.clone(), column_type))
                .ok_or_else(|| SyncError::UnrecognizedNativeType {
                    origin: origin.to_string(),
                    column: raw.name.clone(),
                    native_type: raw.native_type.clone(),
                })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(SourceSchema::new(origin, columns, metadata.primary_key))
}
