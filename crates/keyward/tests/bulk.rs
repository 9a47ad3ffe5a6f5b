//! Bulk assignment: one batch per call, and part-way failures.

use keyward::store::{MemoryStore, StoreError};
use keyward::{Acl, AclConfig, AclError, Grant, Level, ResourceFilter};
use keyward_testkit::{account, doc, FailingStore};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn grants(count: usize) -> Vec<Grant> {
    (0..count)
        .map(|i| Grant::new(doc(&format!("d{}", i)), Level::READ))
        .collect()
}

#[tokio::test]
async fn test_bulk_assign_is_one_batch() {
    init_tracing();
    let acl = Acl::new(FailingStore::new(MemoryStore::new(), usize::MAX), AclConfig::default());

    let result = acl.assign_all(&account("a1"), grants(5)).await.unwrap();

    assert_eq!(result.inserted, 5);
    assert_eq!(acl.store().bulk_calls(), 1);
    assert_eq!(acl.store().batch_sizes(), vec![5]);
}

#[tokio::test]
async fn test_mixed_batch_upserts_and_deletes() {
    init_tracing();
    let acl = Acl::new(MemoryStore::new(), AclConfig::default());
    let entity = account("a1");
    acl.assign_all(&entity, grants(3)).await.unwrap();

    let result = acl
        .assign_all(
            &entity,
            vec![
                Grant::new(doc("d0"), Level::ABSENT),
                Grant::new(doc("d1"), Level::OWNER),
                Grant::new(doc("d9"), Level::WRITE),
            ],
        )
        .await
        .unwrap();

    assert_eq!(result.deleted, 1);
    assert_eq!(result.updated, 1);
    assert_eq!(result.inserted, 1);
    assert_eq!(result.touched(), 3);
    assert_eq!(acl.get_all(&entity, ResourceFilter::NoFilter).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_failure_mid_batch_keeps_committed_prefix() {
    init_tracing();
    let acl = Acl::new(FailingStore::new(MemoryStore::new(), 2), AclConfig::default());
    let entity = account("a1");

    let err = acl.assign_all(&entity, grants(4)).await.unwrap_err();

    match err {
        AclError::Store(StoreError::BulkWrite {
            index, committed, ..
        }) => {
            assert_eq!(index, 2);
            assert_eq!(committed, 2);
        }
        other => panic!("expected an aggregated bulk failure, got {:?}", other),
    }

    assert_eq!(acl.store().bulk_calls(), 1);
    assert_eq!(acl.test_all(&entity, &doc("d0")).await.unwrap(), Level::READ);
    assert_eq!(acl.test_all(&entity, &doc("d1")).await.unwrap(), Level::READ);
    assert_eq!(acl.test_all(&entity, &doc("d2")).await.unwrap(), Level::ABSENT);
    assert_eq!(acl.test_all(&entity, &doc("d3")).await.unwrap(), Level::ABSENT);
}

#[tokio::test]
async fn test_sqlite_rejected_op_commits_prefix() {
    init_tracing();
    let store = keyward::store::SqliteStore::open_memory().unwrap();
    let acl = Acl::new(store, AclConfig::default());
    let entity = account("a1");

    // Drive the store directly: the permission layer never sends a
    // negative-level upsert, so this is the only way to fail op 1.
    let ops = vec![
        keyward::store::WriteOp::upsert(
            keyward::Identity::merge(&entity, &doc("d0")),
            Level::READ,
            1,
        ),
        keyward::store::WriteOp::upsert(
            keyward::Identity::merge(&entity, &doc("d1")),
            Level::ABSENT,
            1,
        ),
    ];
    let err = keyward::store::Store::bulk_write(acl.store(), ops)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::BulkWrite { index: 1, committed: 1, .. }));

    assert_eq!(acl.test_all(&entity, &doc("d0")).await.unwrap(), Level::READ);
    assert_eq!(acl.test_all(&entity, &doc("d1")).await.unwrap(), Level::ABSENT);
}

#[tokio::test]
async fn test_empty_grants_do_not_touch_store() {
    init_tracing();
    let acl = Acl::new(FailingStore::new(MemoryStore::new(), 0), AclConfig::default());
    let result = acl.assign_all(&account("a1"), Vec::<Grant>::new()).await.unwrap();
    assert_eq!(result.touched(), 0);
    assert_eq!(acl.store().bulk_calls(), 0);
}
