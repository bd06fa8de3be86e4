//! Startup sync and live evolution against snapshot sources and both
//! target catalogs.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use cdcsync_core::adapters::snapshot::{SnapshotAdapter, SourceSnapshot};
use cdcsync_core::adapters::{RawColumn, RawTableMetadata};
use cdcsync_core::catalog::{FileCatalog, MemoryCatalog, TargetCatalog};
use cdcsync_core::config::{DiscoveryConfig, SyncConfig};
use cdcsync_core::evolution::{LiveTargetSchema, SchemaChange, SchemaChangeEvent};
use cdcsync_core::matcher::MatcherKind;
use cdcsync_core::models::{ColumnType, TableIdentifier, TableRef};
use cdcsync_core::{SyncAction, SyncError, SyncPlanner};
use futures::stream;
use std::sync::Arc;

fn table(columns: &[(&str, &str, Option<u32>)], primary_key: &[&str]) -> RawTableMetadata {
    RawTableMetadata {
        columns: columns
            .iter()
            .map(|(name, native_type, precision)| {
                let column = RawColumn::new(*name, *native_type);
                match precision {
                    Some(p) => column.with_precision(*p),
                    None => column,
                }
            })
            .collect(),
        primary_key: primary_key.iter().map(ToString::to_string).collect(),
    }
}

fn sharded_source() -> SnapshotAdapter {
    SnapshotAdapter::new(
        SourceSnapshot::default()
            .with_table(
                "shop_1",
                "orders",
                table(&[("id", "int", None), ("sku", "varchar", Some(16))], &["id"]),
            )
            .with_table(
                "shop_2",
                "orders",
                table(
                    &[
                        ("id", "int unsigned", None),
                        ("sku", "varchar", Some(64)),
                        ("paid", "tinyint", Some(1)),
                    ],
                    &["id"],
                ),
            )
            .with_table(
                "shop_3",
                "orders",
                table(&[("id", "bigint", None), ("sku", "char", Some(8))], &["sku"]),
            )
            .with_table("shop_3", "customers", table(&[("id", "int", None)], &["id"]))
            .with_database("shop_empty"),
    )
}

fn config(database_pattern: &str) -> SyncConfig {
    SyncConfig::new(
        DiscoveryConfig::new(database_pattern, "orders").with_matcher(MatcherKind::Glob),
        TableIdentifier::new("dw", "orders"),
    )
}

fn config_exact(databases: &str) -> SyncConfig {
    SyncConfig::new(
        DiscoveryConfig::new(databases, "orders").with_matcher(MatcherKind::Exact),
        TableIdentifier::new("dw", "orders"),
    )
}

#[tokio::test]
async fn test_integration_merge_widens_across_shards() {
    let catalog = MemoryCatalog::new();
    let planner =
        SyncPlanner::new(config("shop_*").with_primary_keys(vec!["id".to_string()])).unwrap();

    let plan = planner.plan(&sharded_source(), &catalog).await.unwrap();

    assert_eq!(plan.action, SyncAction::Created);
    assert_eq!(
        plan.origins(),
        &[
            TableRef::new("shop_1", "orders"),
            TableRef::new("shop_2", "orders"),
            TableRef::new("shop_3", "orders"),
        ]
    );
    assert_eq!(
        plan.target.field("id").unwrap().column_type,
        ColumnType::Integer { bits: 64 }
    );
    assert_eq!(
        plan.target.field("sku").unwrap().column_type,
        ColumnType::String {
            max_length: Some(64)
        }
    );
    assert!(plan.target.field("paid").is_some());
    assert_eq!(plan.target.primary_keys, vec!["id"]);
}

#[tokio::test]
async fn test_integration_disagreeing_primary_keys_require_explicit_key() {
    let catalog = MemoryCatalog::new();
    // shop_3 keys on sku while the others key on id
    let planner = SyncPlanner::new(config("shop_*")).unwrap();

    let result = planner.plan(&sharded_source(), &catalog).await;

    assert!(matches!(result, Err(SyncError::PrimaryKeyRequired)));
    assert!(
        catalog
            .get_table(&TableIdentifier::new("dw", "orders"))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_integration_incompatible_shards_abort_before_write() {
    let source = SnapshotAdapter::new(
        SourceSnapshot::default()
            .with_table("shop_1", "orders", table(&[("id", "int", None)], &["id"]))
            .with_table("shop_2", "orders", table(&[("id", "datetime", None)], &["id"])),
    );
    let catalog = MemoryCatalog::new();
    let planner = SyncPlanner::new(config("shop_*")).unwrap();

    let result = planner.plan(&source, &catalog).await;

    assert!(matches!(
        result,
        Err(SyncError::IncompatibleColumnType { .. })
    ));
    assert!(!catalog.database_exists("dw").await.unwrap());
}

#[tokio::test]
async fn test_integration_file_catalog_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let planner = SyncPlanner::new(config_exact("shop_1,shop_2")).unwrap();

    let created = {
        let catalog = FileCatalog::open(dir.path()).await.unwrap();
        planner.plan(&sharded_source(), &catalog).await.unwrap()
    };
    assert_eq!(created.action, SyncAction::Created);
    assert_eq!(created.origins().len(), 2);

    let reopened = FileCatalog::open(dir.path()).await.unwrap();
    let again = planner.plan(&sharded_source(), &reopened).await.unwrap();

    assert_eq!(again.action, SyncAction::UseExisting);
    assert_eq!(again.target.fields, created.target.fields);
}

#[tokio::test]
async fn test_integration_new_shard_wider_than_target_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = FileCatalog::open(dir.path()).await.unwrap();

    SyncPlanner::new(config("shop_1"))
        .unwrap()
        .plan(&sharded_source(), &catalog)
        .await
        .unwrap();

    // shop_2 carries a wider sku and an extra column
    let result = SyncPlanner::new(config_exact("shop_1,shop_2"))
        .unwrap()
        .plan(&sharded_source(), &catalog)
        .await;

    assert!(matches!(result, Err(SyncError::SchemaMismatch { .. })));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_integration_live_evolution_and_commit() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = FileCatalog::open(dir.path()).await.unwrap();
    let id = TableIdentifier::new("dw", "orders");

    let plan = SyncPlanner::new(config("shop_1"))
        .unwrap()
        .plan(&sharded_source(), &catalog)
        .await
        .unwrap();

    let live = Arc::new(LiveTargetSchema::new(plan.target));
    let origin = TableRef::new("shop_1", "orders");
    let events: Vec<SchemaChangeEvent> = (0..20)
        .map(|i| {
            SchemaChangeEvent::new(
                origin.clone(),
                SchemaChange::AddColumn {
                    column: format!("extra_{}", i),
                    column_type: ColumnType::Integer { bits: 32 }.into(),
                },
            )
        })
        .collect();

    let reader = {
        let live = Arc::clone(&live);
        tokio::spawn(async move {
            let mut last_seen = 0;
            for _ in 0..50 {
                let snapshot = live.snapshot().await;
                assert!(snapshot.schema_id >= last_seen);
                assert_eq!(snapshot.fields.len() as u64, 2 + snapshot.schema_id);
                last_seen = snapshot.schema_id;
                tokio::task::yield_now().await;
            }
        })
    };

    let report = live.process_stream(stream::iter(events)).await;
    reader.await.unwrap();

    assert_eq!(report.applied.len(), 20);
    for schema in &report.applied {
        catalog.commit_schema(&id, schema).await.unwrap();
    }

    let latest = catalog.get_table(&id).await.unwrap().unwrap();
    assert_eq!(latest.schema_id, 20);
    assert_eq!(latest.fields.len(), 22);

    // A stale writer cannot commit over a newer version
    let stale = report.applied[0].clone();
    assert!(matches!(
        catalog.commit_schema(&id, &stale).await,
        Err(SyncError::SchemaVersionConflict { .. })
    ));
}

mod merge_properties {
    use cdcsync_core::models::{Column, ColumnType, SourceSchema, TableRef};
    use cdcsync_core::reconcile::merge;
    use proptest::prelude::*;

    fn shard(index: usize, bits: u8, length: u32) -> SourceSchema {
        SourceSchema::new(
            TableRef::new(format!("shop_{}", index), "orders"),
            vec![
                Column::new("id", ColumnType::Integer { bits }),
                Column::new(
                    "sku",
                    ColumnType::String {
                        max_length: Some(length),
                    },
                ),
            ],
            vec!["id".to_string()],
        )
    }

    proptest! {
        #[test]
        fn merged_types_are_the_widest_in_any_order(
            shards in prop::collection::vec(
                (prop::sample::select(vec![8u8, 16, 32, 64]), 1u32..1024),
                1..8,
            )
        ) {
            let forward: Vec<SourceSchema> = shards
                .iter()
                .enumerate()
                .map(|(i, (bits, length))| shard(i, *bits, *length))
                .collect();
            let mut backward = forward.clone();
            backward.reverse();

            let a = merge(&forward).unwrap();
            let b = merge(&backward).unwrap();

            let max_bits = shards.iter().map(|(bits, _)| *bits).max().unwrap();
            let max_length = shards.iter().map(|(_, length)| *length).max().unwrap();
            prop_assert_eq!(&a.fields(), &b.fields());
            prop_assert_eq!(
                &a.column("id").unwrap().column_type,
                &ColumnType::Integer { bits: max_bits }
            );
            prop_assert_eq!(
                &a.column("sku").unwrap().column_type,
                &ColumnType::String { max_length: Some(max_length) }
            );
            prop_assert_eq!(a.primary_key, vec!["id".to_string()]);
        }
    }
}
