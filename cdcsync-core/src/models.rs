//! Core data models for source, unified and target schemas.
//!
//! Source schemas are snapshots of discovered tables, the unified schema is
//! what reconciliation folds them into, and target schemas are what a catalog
//! persists for the destination table. All models are plain serializable
//! values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Column type of a source or target column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnType {
    /// Fixed-width signed integer
    Integer { bits: u8 },
    /// Floating point number
    Float { bits: u8 },
    /// Character data; `None` means unbounded
    String { max_length: Option<u32> },
    /// Byte data; `None` means unbounded
    Binary { max_length: Option<u32> },
    /// Fixed-point decimal
    Decimal { precision: u8, scale: u8 },
    /// True or false
    Boolean,
    /// Calendar date
    Date,
    /// Time of day
    Time,
    /// Point in time, optionally zone-aware
    Timestamp { with_timezone: bool },
}

/// Widening categories. Types only compare within one family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeFamily {
    /// Bounded or unbounded character data
    String,
    /// Bounded or unbounded byte data
    Binary,
    /// Signed integers of any width
    Integer,
    /// Floating point numbers
    Float,
    /// Fixed-point decimals
    Decimal,
    /// Types that only widen to themselves
    Other,
}

impl ColumnType {
    /// Returns the widening family this type belongs to.
    pub fn family(&self) -> TypeFamily {
        match self {
            ColumnType::String { .. } => TypeFamily::String,
            ColumnType::Binary { .. } => TypeFamily::Binary,
            ColumnType::Integer { .. } => TypeFamily::Integer,
            ColumnType::Float { .. } => TypeFamily::Float,
            ColumnType::Decimal { .. } => TypeFamily::Decimal,
            ColumnType::Boolean
            | ColumnType::Date
            | ColumnType::Time
            | ColumnType::Timestamp { .. } => TypeFamily::Other,
        }
    }

    /// Shorthand for an unbounded string column.
    pub fn unbounded_string() -> Self {
        ColumnType::String { max_length: None }
    }

    /// Shorthand for an unbounded binary column.
    pub fn unbounded_binary() -> Self {
        ColumnType::Binary { max_length: None }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Integer { bits: 8 } => write!(f, "TINYINT"),
            ColumnType::Integer { bits: 16 } => write!(f, "SMALLINT"),
            ColumnType::Integer { bits: 32 } => write!(f, "INT"),
            ColumnType::Integer { bits: 64 } => write!(f, "BIGINT"),
            ColumnType::Integer { bits } => write!(f, "INT{}", bits),
            ColumnType::Float { bits: 32 } => write!(f, "FLOAT"),
            ColumnType::Float { bits: 64 } => write!(f, "DOUBLE"),
            ColumnType::Float { bits } => write!(f, "FLOAT{}", bits),
            ColumnType::String {
                max_length: Some(length),
            } => write!(f, "VARCHAR({})", length),
            ColumnType::String { max_length: None } => write!(f, "STRING"),
            ColumnType::Binary {
                max_length: Some(length),
            } => write!(f, "BINARY({})", length),
            ColumnType::Binary { max_length: None } => write!(f, "BYTES"),
            ColumnType::Decimal { precision, scale } => {
                write!(f, "DECIMAL({}, {})", precision, scale)
            }
            ColumnType::Boolean => write!(f, "BOOLEAN"),
            ColumnType::Date => write!(f, "DATE"),
            ColumnType::Time => write!(f, "TIME"),
            ColumnType::Timestamp {
                with_timezone: false,
            } => write!(f, "TIMESTAMP"),
            ColumnType::Timestamp {
                with_timezone: true,
            } => write!(f, "TIMESTAMP WITH TIME ZONE"),
        }
    }
}

/// Identifies one discovered source table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableRef {
    /// Source database (schema) name
    pub database: String,
    /// Table name within `database`
    pub table: String,
}

impl TableRef {
    /// Creates a reference to `database.table`.
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.table)
    }
}

/// Identifies the destination table in a target catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableIdentifier {
    /// Catalog database name
    pub database: String,
    /// Table name within `database`
    pub table: String,
}

impl TableIdentifier {
    /// Creates an identifier for `database.table`.
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.table)
    }
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Case-sensitive column name
    pub name: String,
    /// Mapped column type
    pub column_type: ColumnType,
}

impl Column {
    /// Creates a column.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.column_type)
    }
}

/// Snapshot of one source table, taken once at discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSchema {
    /// Table the snapshot was taken from
    pub origin: TableRef,
    /// Columns in catalog order
    pub columns: Vec<Column>,
    /// Ordered primary key columns; empty when the table has none
    #[serde(default)]
    pub primary_key: Vec<String>,
}

impl SourceSchema {
    /// Creates a source schema snapshot.
    pub fn new(origin: TableRef, columns: Vec<Column>, primary_key: Vec<String>) -> Self {
        Self {
            origin,
            columns,
            primary_key,
        }
    }

    /// Looks up a column by exact (case-sensitive) name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// A source type that no other type seen so far widens to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContendingType {
    /// The incomparable type
    pub column_type: ColumnType,
    /// First source that declared it
    pub origin: TableRef,
}

/// A reconciled column plus the source that decided its type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedColumn {
    /// Column name as declared by the sources
    pub name: String,
    /// Widest type seen so far
    pub column_type: ColumnType,
    /// Source that declared `column_type`
    pub origin: TableRef,
    /// Types incomparable with `column_type` that nothing has absorbed yet.
    /// Empty once a merge succeeds.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contenders: Vec<ContendingType>,
}

impl UnifiedColumn {
    /// A column with a single contributing type.
    pub fn new(name: impl Into<String>, column_type: ColumnType, origin: TableRef) -> Self {
        Self {
            name: name.into(),
            column_type,
            origin,
            contenders: Vec::new(),
        }
    }
}

/// Result of folding all source schemas together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedSchema {
    /// Union of source columns in first-seen order
    pub columns: Vec<UnifiedColumn>,
    /// Empty when the sources do not agree on a key.
    pub primary_key: Vec<String>,
    /// Every contributing source table, in merge order
    pub origins: Vec<TableRef>,
}

impl UnifiedSchema {
    /// Seeds a unified schema from a single source, unchanged.
    pub fn from_source(source: &SourceSchema) -> Self {
        Self {
            columns: source
                .columns
                .iter()
                .map(|c| {
                    UnifiedColumn::new(c.name.clone(), c.column_type.clone(), source.origin.clone())
                })
                .collect(),
            primary_key: source.primary_key.clone(),
            origins: vec![source.origin.clone()],
        }
    }

    /// Looks up a column by exact name.
    pub fn column(&self, name: &str) -> Option<&UnifiedColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Whether the sources agreed on a primary key.
    pub fn has_primary_key(&self) -> bool {
        !self.primary_key.is_empty()
    }

    /// Columns without origin bookkeeping.
    pub fn fields(&self) -> Vec<Column> {
        self.columns
            .iter()
            .map(|c| Column::new(c.name.clone(), c.column_type.clone()))
            .collect()
    }
}

/// Schema for a destination table that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSchemaDraft {
    /// Columns in unified order
    pub columns: Vec<Column>,
    /// Explicit or inferred primary key; never empty
    pub primary_keys: Vec<String>,
    /// Partition columns, only when given explicitly
    pub partition_keys: Vec<String>,
    /// Opaque table options passed to the catalog
    pub options: BTreeMap<String, String>,
}

/// Schema persisted for the destination table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSchema {
    /// Version; bumped once per committed change.
    pub schema_id: u64,
    /// Columns of this version
    pub fields: Vec<Column>,
    /// Primary key fixed at creation
    pub primary_keys: Vec<String>,
    /// Partition columns fixed at creation
    #[serde(default)]
    pub partition_keys: Vec<String>,
    /// Table options fixed at creation
    #[serde(default)]
    pub options: BTreeMap<String, String>,
    /// When this version was produced
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl TargetSchema {
    /// Materializes a draft as the first version of a table.
    pub fn from_draft(draft: TargetSchemaDraft) -> Self {
        Self {
            schema_id: 0,
            fields: draft.columns,
            primary_keys: draft.primary_keys,
            partition_keys: draft.partition_keys,
            options: draft.options,
            updated_at: chrono::Utc::now(),
        }
    }

    /// Looks up a field by exact name.
    pub fn field(&self, name: &str) -> Option<&Column> {
        self.fields.iter().find(|c| c.name == name)
    }

    /// Returns the next version with `fields` replaced.
    pub fn next_version(&self, fields: Vec<Column>) -> Self {
        Self {
            schema_id: self.schema_id.saturating_add(1),
            fields,
            primary_keys: self.primary_keys.clone(),
            partition_keys: self.partition_keys.clone(),
            options: self.options.clone(),
            updated_at: chrono::Utc::now(),
        }
    }
}

/// Renders a field list as `[a INT, b VARCHAR(20)]` for diagnostics.
pub fn describe_fields<'a>(fields: impl IntoIterator<Item = &'a Column>) -> String {
    let rendered: Vec<String> = fields.into_iter().map(ToString::to_string).collect();
    format!("[{}]", rendered.join(", "))
}
