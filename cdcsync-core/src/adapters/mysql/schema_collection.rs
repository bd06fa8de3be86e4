//! MySQL metadata collection.
//!
//! All queries read `INFORMATION_SCHEMA`. Name columns are cast to CHAR to
//! avoid VARBINARY results on MySQL 8.0+.

use super::MySqlAdapter;
use crate::Result;
use crate::adapters::{RawColumn, RawTableMetadata};
use crate::error::SyncError;
use crate::models::TableRef;
use sqlx::Row;

/// Lists every schema on the server, system schemas included
pub(crate) async fn list_databases(adapter: &MySqlAdapter) -> Result<Vec<String>> {
    let query = r#"
        SELECT CAST(SCHEMA_NAME AS CHAR) as SCHEMA_NAME
        FROM INFORMATION_SCHEMA.SCHEMATA
        ORDER BY SCHEMA_NAME
    "#;

    let databases: Vec<String> = sqlx::query_scalar(query)
        .fetch_all(&adapter.pool)
        .await
        .map_err(|e| SyncError::collection_failed("Failed to enumerate databases", e))?;

    tracing::debug!("Found {} databases on {}", databases.len(), adapter.config);

    Ok(databases)
}

/// Lists base tables of one schema; views are skipped
pub(crate) async fn list_tables(adapter: &MySqlAdapter, db_name: &str) -> Result<Vec<String>> {
    let query = r#"
        SELECT CAST(TABLE_NAME AS CHAR) as TABLE_NAME
        FROM INFORMATION_SCHEMA.TABLES
        WHERE TABLE_SCHEMA = ?
        AND TABLE_TYPE = 'BASE TABLE'
        ORDER BY TABLE_NAME
    "#;

    let tables: Vec<String> = sqlx::query_scalar(query)
        .bind(db_name)
        .fetch_all(&adapter.pool)
        .await
        .map_err(|e| {
            SyncError::collection_failed(
                format!("Failed to enumerate tables in database '{}'", db_name),
                e,
            )
        })?;

    Ok(tables)
}

/// Collects columns in ordinal order and the primary key of one table
pub(crate) async fn describe_table(
    adapter: &MySqlAdapter,
    table: &TableRef,
) -> Result<RawTableMetadata> {
    let columns = collect_table_columns(adapter, table).await?;
    if columns.is_empty() {
        return Err(SyncError::configuration(format!(
            "Table {} does not exist or has no columns",
            table
        )));
    }

    let primary_key = collect_table_primary_key(adapter, table).await?;

    tracing::debug!(
        "Collected table {} with {} columns and primary key {:?}",
        table,
        columns.len(),
        primary_key
    );

    Ok(RawTableMetadata {
        columns,
        primary_key,
    })
}

async fn collect_table_columns(adapter: &MySqlAdapter, table: &TableRef) -> Result<Vec<RawColumn>> {
    // Character length wins over numeric precision; BIT reports its width
    // as NUMERIC_PRECISION
    let columns_query = r#"
        SELECT
            CAST(c.COLUMN_NAME AS CHAR) as COLUMN_NAME,
            CAST(c.DATA_TYPE AS CHAR) as DATA_TYPE,
            CAST(c.COLUMN_TYPE AS CHAR) as COLUMN_TYPE,
            CAST(COALESCE(c.CHARACTER_MAXIMUM_LENGTH, c.NUMERIC_PRECISION) AS SIGNED) as TYPE_PRECISION,
            CAST(c.NUMERIC_SCALE AS SIGNED) as TYPE_SCALE
        FROM INFORMATION_SCHEMA.COLUMNS c
        WHERE c.TABLE_SCHEMA = ?
        AND c.TABLE_NAME = ?
        ORDER BY c.ORDINAL_POSITION
    "#;

    let column_rows = sqlx::query(columns_query)
        .bind(&table.database)
        .bind(&table.table)
        .fetch_all(&adapter.pool)
        .await
        .map_err(|e| {
            SyncError::collection_failed(format!("Failed to collect columns for table {}", table), e)
        })?;

    let mut columns = Vec::with_capacity(column_rows.len());

    for row in &column_rows {
        let column_name: String = row
            .try_get("COLUMN_NAME")
            .map_err(|e| SyncError::collection_failed("Failed to parse column name", e))?;
        let field_error = |field: &str, e: sqlx::Error| {
            SyncError::collection_failed(
                format!("Failed to parse {} of column {}.{}", field, table, column_name),
                e,
            )
        };
        let data_type: String = row
            .try_get("DATA_TYPE")
            .map_err(|e| field_error("DATA_TYPE", e))?;
        let column_type: String = row
            .try_get("COLUMN_TYPE")
            .map_err(|e| field_error("COLUMN_TYPE", e))?;
        let precision: Option<i64> = row
            .try_get("TYPE_PRECISION")
            .map_err(|e| field_error("TYPE_PRECISION", e))?;
        let scale: Option<i64> = row
            .try_get("TYPE_SCALE")
            .map_err(|e| field_error("TYPE_SCALE", e))?;

        columns.push(raw_column(column_name, &data_type, &column_type, precision, scale));
    }

    Ok(columns)
}

/// Builds a raw column from one `INFORMATION_SCHEMA.COLUMNS` row.
pub(super) fn raw_column(
    name: String,
    data_type: &str,
    column_type: &str,
    precision: Option<i64>,
    scale: Option<i64>,
) -> RawColumn {
    // DATA_TYPE drops the signedness that COLUMN_TYPE keeps
    let native_type = if column_type.to_lowercase().contains("unsigned") {
        format!("{} unsigned", data_type)
    } else {
        data_type.to_string()
    };

    RawColumn {
        name,
        native_type,
        precision: precision.and_then(|p| u32::try_from(p).ok()),
        scale: scale.and_then(|s| u32::try_from(s).ok()),
    }
}

async fn collect_table_primary_key(adapter: &MySqlAdapter, table: &TableRef) -> Result<Vec<String>> {
    let pk_query = r#"
        SELECT CAST(kcu.COLUMN_NAME AS CHAR) as COLUMN_NAME
        FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
        JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu
            ON tc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME
            AND tc.TABLE_SCHEMA = kcu.TABLE_SCHEMA
            AND tc.TABLE_NAME = kcu.TABLE_NAME
        WHERE tc.TABLE_SCHEMA = ?
        AND tc.TABLE_NAME = ?
        AND tc.CONSTRAINT_TYPE = 'PRIMARY KEY'
        ORDER BY kcu.ORDINAL_POSITION
    "#;

    let pk_columns: Vec<String> = sqlx::query_scalar(pk_query)
        .bind(&table.database)
        .bind(&table.table)
        .fetch_all(&adapter.pool)
        .await
        .map_err(|e| {
            SyncError::collection_failed(
                format!("Failed to collect primary key for table {}", table),
                e,
            )
        })?;

    Ok(pk_columns.into_iter().filter(|c| !c.is_empty()).collect())
}
