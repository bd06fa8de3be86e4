//! Runtime schema evolution of the live target table.
//!
//! Once the target table exists, source DDL arrives as a stream of
//! [`SchemaChangeEvent`]s. Each event is answered with a
//! [`ChangeDecision`]: columns may be added or widened, never narrowed or
//! dropped. A rejected change is skipped and logged, and processing
//! continues with the next event.
//!
//! [`LiveTargetSchema`] owns the current schema. It holds its write lock
//! across evaluation and swap, so readers only ever see a complete version.

use crate::adapters::type_mapping::map_column_definition;
use crate::lattice::can_widen;
use crate::models::{Column, ColumnType, TableRef, TargetSchema};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A column type as declared by a change event.
///
/// Deserializes from either the structured form
/// (`{"kind": "integer", "bits": 64}`) or a MySQL definition string
/// (`"bigint"`, `"varchar(32)"`). Definitions are kept verbatim and only
/// mapped when the change is evaluated, so an unknown type skips its own
/// event instead of failing the whole stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeclaredType {
    /// Already mapped to a target type
    Typed(ColumnType),
    /// MySQL column definition, mapped on evaluation
    Native(String),
}

impl DeclaredType {
    /// Maps the declared type, or `None` for an unrecognized definition.
    pub fn resolve(&self) -> Option<ColumnType> {
        match self {
            DeclaredType::Typed(column_type) => Some(column_type.clone()),
            DeclaredType::Native(definition) => map_column_definition(definition),
        }
    }
}

impl From<ColumnType> for DeclaredType {
    fn from(column_type: ColumnType) -> Self {
        DeclaredType::Typed(column_type)
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclaredType::Typed(column_type) => write!(f, "{}", column_type),
            DeclaredType::Native(definition) => write!(f, "{}", definition),
        }
    }
}

/// A DDL change observed on one source table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SchemaChange {
    /// `ADD COLUMN`
    AddColumn {
        /// Column being added
        column: String,
        /// Declared type of the new column
        column_type: DeclaredType,
    },
    /// `MODIFY`/`ALTER COLUMN` changing the column type in place
    AlterColumnType {
        /// Column being retyped
        column: String,
        /// Type before the change, as the source saw it
        old_type: DeclaredType,
        /// Type after the change
        new_type: DeclaredType,
    },
    /// `DROP COLUMN`; always skipped
    DropColumn {
        /// Column being dropped
        column: String,
    },
}

impl SchemaChange {
    /// Name of the column the change touches.
    pub fn column(&self) -> &str {
        match self {
            SchemaChange::AddColumn { column, .. }
            | SchemaChange::AlterColumnType { column, .. }
            | SchemaChange::DropColumn { column } => column,
        }
    }
}

impl fmt::Display for SchemaChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaChange::AddColumn {
                column,
                column_type,
            } => write!(f, "ADD COLUMN {} {}", column, column_type),
            SchemaChange::AlterColumnType {
                column,
                old_type,
                new_type,
            } => write!(f, "ALTER COLUMN {} {} -> {}", column, old_type, new_type),
            SchemaChange::DropColumn { column } => write!(f, "DROP COLUMN {}", column),
        }
    }
}

/// A schema change tagged with the source table it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaChangeEvent {
    /// Source table that emitted the change
    pub origin: TableRef,
    /// The change itself
    #[serde(flatten)]
    pub change: SchemaChange,
}

impl SchemaChangeEvent {
    /// Tags `change` with its source table.
    pub fn new(origin: TableRef, change: SchemaChange) -> Self {
        Self { origin, change }
    }
}

/// Why a change was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// Columns are never removed from the target
    DropColumn,
    /// The source narrowed or retyped the column
    NarrowingAlter {
        /// Type before the alter
        from: ColumnType,
        /// Requested type
        to: ColumnType,
    },
    /// The target column and the requested type do not widen either way
    IncompatibleType {
        /// Type the target holds
        current: ColumnType,
        /// Type the change asked for
        requested: ColumnType,
    },
    /// The event declares a native type with no target mapping
    UnrecognizedType {
        /// The definition as written in the event
        definition: String,
    },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::DropColumn => write!(f, "dropping columns is not supported"),
            SkipReason::NarrowingAlter { from, to } => {
                write!(f, "{} cannot be widened to {}", from, to)
            }
            SkipReason::IncompatibleType { current, requested } => write!(
                f,
                "target type {} and requested type {} are incompatible",
                current, requested
            ),
            SkipReason::UnrecognizedType { definition } => {
                write!(f, "unrecognized native type '{}'", definition)
            }
        }
    }
}

/// Outcome of evaluating one change against the current schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeDecision {
    /// The change is accepted; holds the next schema version.
    Apply(TargetSchema),
    /// The change is accepted but the target already covers it.
    Unchanged,
    /// The change is rejected and the schema stays as is.
    Skip(SkipReason),
}

impl ChangeDecision {
    /// True for `Apply` and `Unchanged`.
    pub fn is_accepted(&self) -> bool {
        !matches!(self, ChangeDecision::Skip(_))
    }
}

/// Whether a column typed `old` may be retyped to `new`.
pub fn can_apply_change(old: &ColumnType, new: &ColumnType) -> bool {
    can_widen(old, new)
}

/// Decides how `change` affects `current`. Pure; never errors.
pub fn evaluate_change(current: &TargetSchema, change: &SchemaChange) -> ChangeDecision {
    decide(current, change).unwrap_or_else(ChangeDecision::Skip)
}

fn decide(current: &TargetSchema, change: &SchemaChange) -> Result<ChangeDecision, SkipReason> {
    match change {
        SchemaChange::AddColumn {
            column,
            column_type,
        } => Ok(accommodate(current, column, &resolve(column_type)?)),
        SchemaChange::AlterColumnType {
            column,
            old_type,
            new_type,
        } => {
            let old_type = resolve(old_type)?;
            let new_type = resolve(new_type)?;
            if can_apply_change(&old_type, &new_type) {
                Ok(accommodate(current, column, &new_type))
            } else {
                Err(SkipReason::NarrowingAlter {
                    from: old_type,
                    to: new_type,
                })
            }
        }
        SchemaChange::DropColumn { .. } => Err(SkipReason::DropColumn),
    }
}

fn resolve(declared: &DeclaredType) -> Result<ColumnType, SkipReason> {
    declared
        .resolve()
        .ok_or_else(|| SkipReason::UnrecognizedType {
            definition: declared.to_string(),
        })
}

/// Makes room for `column_type` in column `name` without ever narrowing.
fn accommodate(current: &TargetSchema, name: &str, column_type: &ColumnType) -> ChangeDecision {
    let Some(existing) = current.field(name) else {
        let mut fields = current.fields.clone();
        fields.push(Column::new(name, column_type.clone()));
        return ChangeDecision::Apply(current.next_version(fields));
    };

    if can_widen(column_type, &existing.column_type) {
        return ChangeDecision::Unchanged;
    }

    if can_widen(&existing.column_type, column_type) {
        let fields = current
            .fields
            .iter()
            .map(|field| {
                if field.name == name {
                    Column::new(name, column_type.clone())
                } else {
                    field.clone()
                }
            })
            .collect();
        return ChangeDecision::Apply(current.next_version(fields));
    }

    ChangeDecision::Skip(SkipReason::IncompatibleType {
        current: existing.column_type.clone(),
        requested: column_type.clone(),
    })
}

/// A change that was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedChange {
    /// The rejected event
    pub event: SchemaChangeEvent,
    /// Why it was rejected
    pub reason: SkipReason,
}

/// Summary of a processed change stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EvolutionReport {
    /// Every schema version produced, in order
    pub applied: Vec<TargetSchema>,
    /// Events the schema already covered
    pub unchanged: usize,
    /// Rejected events, in order
    pub skipped: Vec<SkippedChange>,
}

impl EvolutionReport {
    /// Number of events processed.
    pub fn total(&self) -> usize {
        self.applied.len() + self.unchanged + self.skipped.len()
    }
}

/// The current target schema, shared between one writer and many readers.
#[derive(Debug)]
pub struct LiveTargetSchema {
    current: RwLock<Arc<TargetSchema>>,
}

impl LiveTargetSchema {
    /// Starts from `schema`, usually the version the catalog holds.
    pub fn new(schema: TargetSchema) -> Self {
        Self {
            current: RwLock::new(Arc::new(schema)),
        }
    }

    /// Returns the current version. Later changes do not affect it.
    pub async fn snapshot(&self) -> Arc<TargetSchema> {
        Arc::clone(&*self.current.read().await)
    }

    /// Evaluates one event and installs the resulting version, if any.
    pub async fn apply(&self, event: &SchemaChangeEvent) -> ChangeDecision {
        let mut current = self.current.write().await;
        let decision = evaluate_change(&current, &event.change);

        match &decision {
            ChangeDecision::Apply(next) => {
                tracing::info!(
                    "Applied '{}' from {}: schema {} -> {}",
                    event.change,
                    event.origin,
                    current.schema_id,
                    next.schema_id
                );
                *current = Arc::new(next.clone());
            }
            ChangeDecision::Unchanged => {
                tracing::debug!(
                    "'{}' from {} is already covered by schema {}",
                    event.change,
                    event.origin,
                    current.schema_id
                );
            }
            ChangeDecision::Skip(reason) => {
                tracing::warn!(
                    "Skipping '{}' from {}: {}",
                    event.change,
                    event.origin,
                    reason
                );
            }
        }

        decision
    }

    /// Applies events in arrival order until the stream ends.
    pub async fn process_stream<S>(&self, events: S) -> EvolutionReport
    where
        S: Stream<Item = SchemaChangeEvent>,
    {
        let mut report = EvolutionReport::default();
        let mut events = std::pin::pin!(events);

        while let Some(event) = events.next().await {
            match self.apply(&event).await {
                ChangeDecision::Apply(schema) => report.applied.push(schema),
                ChangeDecision::Unchanged => report.unchanged += 1,
                ChangeDecision::Skip(reason) => report.skipped.push(SkippedChange { event, reason }),
            }
        }

        tracing::info!(
            "Processed {} schema change(s): {} applied, {} unchanged, {} skipped",
            report.total(),
            report.applied.len(),
            report.unchanged,
            report.skipped.len()
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TargetSchemaDraft;
    use std::collections::BTreeMap;

    const INT: ColumnType = ColumnType::Integer { bits: 32 };
    const BIGINT: ColumnType = ColumnType::Integer { bits: 64 };

    fn varchar(length: u32) -> ColumnType {
        ColumnType::String {
            max_length: Some(length),
        }
    }

    fn target(fields: &[(&str, ColumnType)]) -> TargetSchema {
        TargetSchema::from_draft(TargetSchemaDraft {
            columns: fields
                .iter()
                .map(|(name, ty)| Column::new(*name, ty.clone()))
                .collect(),
            primary_keys: vec!["id".to_string()],
            partition_keys: Vec::new(),
            options: BTreeMap::new(),
        })
    }

    fn event(change: SchemaChange) -> SchemaChangeEvent {
        SchemaChangeEvent::new(TableRef::new("shop_1", "orders"), change)
    }

    fn alter(column: &str, old_type: ColumnType, new_type: ColumnType) -> SchemaChange {
        SchemaChange::AlterColumnType {
            column: column.to_string(),
            old_type: old_type.into(),
            new_type: new_type.into(),
        }
    }

    fn add(column: &str, column_type: ColumnType) -> SchemaChange {
        SchemaChange::AddColumn {
            column: column.to_string(),
            column_type: column_type.into(),
        }
    }

    fn add_native(column: &str, definition: &str) -> SchemaChange {
        SchemaChange::AddColumn {
            column: column.to_string(),
            column_type: DeclaredType::Native(definition.to_string()),
        }
    }

    #[test]
    fn test_can_apply_change() {
        assert!(can_apply_change(&INT, &BIGINT));
        assert!(!can_apply_change(&BIGINT, &INT));
        assert!(can_apply_change(&varchar(5), &varchar(10)));
        assert!(!can_apply_change(&varchar(10), &INT));
    }

    #[test]
    fn test_add_new_column_is_applied() {
        let current = target(&[("id", INT)]);

        match evaluate_change(&current, &add("note", varchar(20))) {
            ChangeDecision::Apply(next) => {
                assert_eq!(next.schema_id, 1);
                assert_eq!(next.field("note").unwrap().column_type, varchar(20));
                assert_eq!(next.primary_keys, current.primary_keys);
            }
            other => panic!("expected Apply, got {:?}", other),
        }
    }

    #[test]
    fn test_add_existing_column() {
        let current = target(&[("id", BIGINT), ("note", varchar(20))]);

        assert_eq!(
            evaluate_change(&current, &add("id", INT)),
            ChangeDecision::Unchanged
        );

        match evaluate_change(&current, &add("note", varchar(40))) {
            ChangeDecision::Apply(next) => {
                assert_eq!(next.field("note").unwrap().column_type, varchar(40))
            }
            other => panic!("expected Apply, got {:?}", other),
        }

        assert!(matches!(
            evaluate_change(&current, &add("id", varchar(10))),
            ChangeDecision::Skip(SkipReason::IncompatibleType { .. })
        ));
    }

    #[test]
    fn test_alter_column_type() {
        let current = target(&[("id", INT)]);

        match evaluate_change(&current, &alter("id", INT, BIGINT)) {
            ChangeDecision::Apply(next) => {
                assert_eq!(next.field("id").unwrap().column_type, BIGINT);
                assert_eq!(next.fields.len(), 1);
            }
            other => panic!("expected Apply, got {:?}", other),
        }

        assert_eq!(
            evaluate_change(&current, &alter("id", BIGINT, INT)),
            ChangeDecision::Skip(SkipReason::NarrowingAlter {
                from: BIGINT,
                to: INT
            })
        );
    }

    #[test]
    fn test_alter_never_narrows_target() {
        // Another source already widened the target to BIGINT
        let current = target(&[("id", BIGINT)]);

        assert_eq!(
            evaluate_change(
                &current,
                &alter("id", ColumnType::Integer { bits: 16 }, INT)
            ),
            ChangeDecision::Unchanged
        );
    }

    #[test]
    fn test_alter_missing_column_adds_it() {
        let current = target(&[("id", INT)]);

        match evaluate_change(&current, &alter("amount", INT, BIGINT)) {
            ChangeDecision::Apply(next) => {
                assert_eq!(next.field("amount").unwrap().column_type, BIGINT)
            }
            other => panic!("expected Apply, got {:?}", other),
        }
    }

    #[test]
    fn test_drop_column_is_skipped() {
        let current = target(&[("id", INT)]);
        let decision = evaluate_change(
            &current,
            &SchemaChange::DropColumn {
                column: "id".to_string(),
            },
        );

        assert_eq!(decision, ChangeDecision::Skip(SkipReason::DropColumn));
        assert!(!decision.is_accepted());
    }

    #[test]
    fn test_event_json_accepts_native_types() {
        let parsed: SchemaChangeEvent = serde_json::from_str(
            r#"{"origin": {"database": "shop_1", "table": "orders"},
                "op": "alter_column_type", "column": "id",
                "old_type": "int", "new_type": {"kind": "integer", "bits": 64}}"#,
        )
        .unwrap();

        assert_eq!(parsed.origin, TableRef::new("shop_1", "orders"));
        match &parsed.change {
            SchemaChange::AlterColumnType {
                old_type, new_type, ..
            } => {
                assert_eq!(old_type, &DeclaredType::Native("int".to_string()));
                assert_eq!(old_type.resolve(), Some(INT));
                assert_eq!(new_type, &DeclaredType::Typed(BIGINT));
            }
            other => panic!("expected AlterColumnType, got {:?}", other),
        }

        // Unmapped definitions still parse; evaluation decides their fate
        let parsed: SchemaChangeEvent = serde_json::from_str(
            r#"{"origin": {"database": "shop_1", "table": "orders"},
                "op": "add_column", "column": "v", "column_type": "vector(3)"}"#,
        )
        .unwrap();
        assert_eq!(parsed.change, add_native("v", "vector(3)"));
    }

    #[test]
    fn test_unrecognized_native_type_is_skipped() {
        let current = target(&[("id", INT)]);

        assert_eq!(
            evaluate_change(&current, &add_native("v", "vector(3)")),
            ChangeDecision::Skip(SkipReason::UnrecognizedType {
                definition: "vector(3)".to_string()
            })
        );

        let change = SchemaChange::AlterColumnType {
            column: "id".to_string(),
            old_type: DeclaredType::Native("int".to_string()),
            new_type: DeclaredType::Native("hyperloglog".to_string()),
        };
        assert!(matches!(
            evaluate_change(&current, &change),
            ChangeDecision::Skip(SkipReason::UnrecognizedType { definition }) if definition == "hyperloglog"
        ));
    }

    #[tokio::test]
    async fn test_process_stream_applies_events_after_unrecognized_type() {
        let live = LiveTargetSchema::new(target(&[("id", INT)]));
        let events = vec![
            event(add_native("embedding", "vector(3)")),
            event(add_native("note", "varchar(20)")),
        ];

        let report = live.process_stream(futures::stream::iter(events)).await;

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].event.change.column(), "embedding");
        assert_eq!(report.applied.len(), 1);

        let schema = live.snapshot().await;
        assert_eq!(schema.schema_id, 1);
        assert_eq!(schema.field("note").unwrap().column_type, varchar(20));
        assert!(schema.field("embedding").is_none());
    }

    #[test]
    fn test_event_json_round_trip_shape() {
        let original = event(SchemaChange::DropColumn {
            column: "legacy".to_string(),
        });
        let json = serde_json::to_string(&original).unwrap();

        assert!(json.contains(r#""op":"drop_column""#));
        assert_eq!(
            serde_json::from_str::<SchemaChangeEvent>(&json).unwrap(),
            original
        );
    }

    #[tokio::test]
    async fn test_process_stream_continues_after_skip() {
        let live = LiveTargetSchema::new(target(&[("id", INT)]));
        let events = vec![
            event(alter("id", INT, BIGINT)),
            event(SchemaChange::DropColumn {
                column: "id".to_string(),
            }),
            event(alter("id", BIGINT, INT)),
            event(add("note", varchar(10))),
            event(add("id", INT)),
        ];

        let report = live.process_stream(futures::stream::iter(events)).await;

        assert_eq!(report.applied.len(), 2);
        assert_eq!(report.unchanged, 1);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.total(), 5);
        assert_eq!(report.skipped[0].reason, SkipReason::DropColumn);

        let schema = live.snapshot().await;
        assert_eq!(schema.schema_id, 2);
        assert_eq!(schema.field("id").unwrap().column_type, BIGINT);
        assert_eq!(schema.field("note").unwrap().column_type, varchar(10));
        assert_eq!(
            report
                .applied
                .iter()
                .map(|s| s.schema_id)
                .collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[tokio::test]
    async fn test_snapshot_is_unaffected_by_later_changes() {
        let live = LiveTargetSchema::new(target(&[("id", INT)]));
        let before = live.snapshot().await;

        live.apply(&event(add("note", varchar(10)))).await;

        assert_eq!(before.schema_id, 0);
        assert!(before.field("note").is_none());
        assert_eq!(live.snapshot().await.schema_id, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_produce_consecutive_versions() {
        let live = Arc::new(LiveTargetSchema::new(target(&[("id", INT)])));

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let live = Arc::clone(&live);
                tokio::spawn(async move {
                    live.apply(&event(add(&format!("c{}", i), INT))).await
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            match handle.await.unwrap() {
                ChangeDecision::Apply(schema) => ids.push(schema.schema_id),
                other => panic!("expected Apply, got {:?}", other),
            }
        }
        ids.sort_unstable();

        assert_eq!(ids, (1..=16).collect::<Vec<u64>>());
        let schema = live.snapshot().await;
        assert_eq!(schema.schema_id, 16);
        assert_eq!(schema.fields.len(), 17);
    }
}
