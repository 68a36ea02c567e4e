//! Integration tests for the versioned store over the in-memory table.
//!
//! Covers the version family layout (V0 current, V1..VN archives) and the
//! documented lack of concurrency control.

use async_trait::async_trait;
use futures::TryStreamExt;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Barrier;
use vellum_core::{
    EntityKind, FieldMap, ItemKey, MemoryTable, NewEntity, ScanPage, ScanRequest, TableBackend,
    TableItem, VellumResult, VersionTag, VersionedStore,
};

fn fields(pairs: &[(&str, serde_json::Value)]) -> FieldMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn store() -> (VersionedStore, MemoryTable) {
    let table = MemoryTable::default();
    (VersionedStore::new(Arc::new(table.clone())), table)
}

#[tokio::test]
async fn test_create_then_get_returns_current_record() {
    let (store, _) = store();
    let created = store
        .create(NewEntity::new(
            EntityKind::Agreement,
            fields(&[("title", json!("Ours")), ("jurisdiction", json!("CA"))]),
        ))
        .await
        .unwrap();

    assert_eq!(created.version, VersionTag::CURRENT);
    assert_eq!(created.created_at, created.updated_at);

    let fetched = store
        .get_by_id(EntityKind::Agreement, &created.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched, created);

    assert!(store
        .get_by_id(EntityKind::Agreement, "missing")
        .await
        .unwrap()
        .is_none());
    // Same id under another kind is a different partition.
    assert!(store
        .get_by_id(EntityKind::User, &created.id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_versioned_update_keeps_exact_snapshot() {
    let (store, _) = store();
    let created = store
        .create(NewEntity::with_id(
            EntityKind::User,
            "u-1",
            fields(&[("email", json!("a@x.com")), ("firstName", json!("A"))]),
        ))
        .await
        .unwrap();

    let updated = store
        .update(EntityKind::User, "u-1", fields(&[("firstName", json!("B"))]), true)
        .await
        .unwrap();

    assert_eq!(updated.fields["firstName"], json!("B"));
    assert_eq!(updated.fields["email"], json!("a@x.com"));
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at > created.updated_at);

    let archived = store
        .get_version(EntityKind::User, "u-1", VersionTag::archived(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(archived.fields, created.fields);
    assert_eq!(archived.updated_at, created.updated_at);
    assert_eq!(archived.version, VersionTag::archived(1));
}

#[tokio::test]
async fn test_unversioned_update_adds_no_archive() {
    let (store, table) = store();
    store
        .create(NewEntity::with_id(
            EntityKind::Agreement,
            "a-1",
            fields(&[("status", json!("draft"))]),
        ))
        .await
        .unwrap();

    for _ in 0..3 {
        store
            .update(
                EntityKind::Agreement,
                "a-1",
                fields(&[("status", json!("pending_review"))]),
                false,
            )
            .await
            .unwrap();
    }

    assert_eq!(table.len().await, 1);
    let current = store
        .get_by_id(EntityKind::Agreement, "a-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.fields["status"], json!("pending_review"));
    assert_eq!(current.revision, 0);
}

#[tokio::test]
async fn test_archives_are_numbered_oldest_first() {
    let (store, _) = store();
    store
        .create(NewEntity::with_id(EntityKind::Document, "d-1", fields(&[("n", json!(0))])))
        .await
        .unwrap();

    for n in 1..=4 {
        store
            .update(EntityKind::Document, "d-1", fields(&[("n", json!(n))]), true)
            .await
            .unwrap();
    }

    let versions = store.list_versions(EntityKind::Document, "d-1").await.unwrap();
    let tags: Vec<String> = versions.iter().map(|r| r.version.to_string()).collect();
    assert_eq!(tags, vec!["V0", "V1", "V2", "V3", "V4"]);

    // V1 holds the state before the first update, V4 the state before the last.
    assert_eq!(versions[0].fields["n"], json!(4));
    assert_eq!(versions[1].fields["n"], json!(0));
    assert_eq!(versions[4].fields["n"], json!(3));
    assert_eq!(versions[0].revision, 4);

    let summary = store
        .history(EntityKind::Document, "d-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(summary.archived_versions, 4);
    assert_eq!(summary.current_revision, 4);
}

#[tokio::test]
async fn test_user_email_change_scenario() {
    let (store, table) = store();
    store
        .create(NewEntity::with_id(
            EntityKind::User,
            "u-1",
            fields(&[("email", json!("a@x.com"))]),
        ))
        .await
        .unwrap();
    store
        .update(EntityKind::User, "u-1", fields(&[("email", json!("b@x.com"))]), true)
        .await
        .unwrap();

    let keys: Vec<ItemKey> = table
        .query_partition("USER#u-1")
        .await
        .unwrap()
        .into_iter()
        .map(|item| item.key)
        .collect();
    assert_eq!(keys.len(), 2);

    let v0 = store.get_by_id(EntityKind::User, "u-1").await.unwrap().unwrap();
    let v1 = store
        .get_version(EntityKind::User, "u-1", VersionTag::archived(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(v0.fields["email"], json!("b@x.com"));
    assert_eq!(v1.fields["email"], json!("a@x.com"));

    assert_eq!(store.delete(EntityKind::User, "u-1").await.unwrap(), 2);
    assert!(table.is_empty().await);
}

#[tokio::test]
async fn test_update_missing_entity_writes_nothing() {
    let (store, table) = store();
    let err = store
        .update(EntityKind::User, "ghost", fields(&[("a", json!(1))]), true)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(table.is_empty().await);

    let err = store.delete(EntityKind::User, "ghost").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_query_by_kind_pages_current_records_only() {
    let (store, _) = store();
    for i in 0..5 {
        store
            .create(NewEntity::with_id(EntityKind::User, format!("u-{}", i), fields(&[("i", json!(i))])))
            .await
            .unwrap();
    }
    store
        .create(NewEntity::with_id(EntityKind::Agreement, "a-1", FieldMap::new()))
        .await
        .unwrap();
    store
        .update(EntityKind::User, "u-0", fields(&[("i", json!(10))]), true)
        .await
        .unwrap();

    let mut seen = Vec::new();
    let mut token: Option<String> = None;
    let mut pages = 0;
    loop {
        let page = store
            .query_by_kind(EntityKind::User, Some(2), token.as_deref())
            .await
            .unwrap();
        pages += 1;
        assert!(page.items.iter().all(|r| r.version.is_current()));
        seen.extend(page.items.into_iter().map(|r| r.id));
        match page.next_page_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }

    assert_eq!(pages, 3);
    seen.sort();
    assert_eq!(seen, vec!["u-0", "u-1", "u-2", "u-3", "u-4"]);

    let streamed: Vec<_> = store
        .stream_kind(EntityKind::User, 2)
        .try_collect()
        .await
        .unwrap();
    assert_eq!(streamed.len(), 5);

    let bad = store
        .query_by_kind(EntityKind::User, Some(2), Some("not-a-token"))
        .await;
    assert!(bad.is_err());
}

/// Holds the first two reads of a current record until both have happened.
struct LockstepTable {
    inner: MemoryTable,
    barrier: Barrier,
    held: AtomicUsize,
}

#[async_trait]
impl TableBackend for LockstepTable {
    async fn put_item(&self, item: TableItem) -> VellumResult<()> {
        self.inner.put_item(item).await
    }

    async fn get_item(&self, key: &ItemKey) -> VellumResult<Option<TableItem>> {
        let item = self.inner.get_item(key).await?;
        if key.sk == "V0" && self.held.fetch_add(1, Ordering::SeqCst) < 2 {
            self.barrier.wait().await;
        }
        Ok(item)
    }

    async fn delete_item(&self, key: &ItemKey) -> VellumResult<()> {
        self.inner.delete_item(key).await
    }

    async fn query_partition(&self, pk: &str) -> VellumResult<Vec<TableItem>> {
        self.inner.query_partition(pk).await
    }

    async fn scan(&self, request: ScanRequest) -> VellumResult<ScanPage> {
        self.inner.scan(request).await
    }

    fn table_name(&self) -> &str {
        self.inner.table_name()
    }
}

#[tokio::test]
async fn test_concurrent_versioned_updates_collide() {
    let inner = MemoryTable::default();
    let seed = VersionedStore::new(Arc::new(inner.clone()));
    seed.create(NewEntity::with_id(
        EntityKind::Agreement,
        "a-1",
        fields(&[("title", json!("start"))]),
    ))
    .await
    .unwrap();

    let store = VersionedStore::new(Arc::new(LockstepTable {
        inner: inner.clone(),
        barrier: Barrier::new(2),
        held: AtomicUsize::new(0),
    }));

    let (left, right) = tokio::join!(
        store.update(EntityKind::Agreement, "a-1", fields(&[("title", json!("left"))]), true),
        store.update(EntityKind::Agreement, "a-1", fields(&[("title", json!("right"))]), true),
    );
    left.unwrap();
    right.unwrap();

    // Both writers archived into V1 and one update to V0 was lost.
    let versions = seed.list_versions(EntityKind::Agreement, "a-1").await.unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[1].fields["title"], json!("start"));
    assert_eq!(versions[0].revision, 1);
    let title = versions[0].fields["title"].as_str().unwrap();
    assert!(title == "left" || title == "right");
}
