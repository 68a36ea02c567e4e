//! The versioned entity store.
//!
//! Every entity lives in one partition of the wide table. `V0` holds the
//! current record; a versioned update copies the current record into the
//! next archive slot before overwriting `V0`. Archive slot numbers come from
//! the current record's `revision`, so the first archive is `V1` and the
//! N-th is `VN`. Archives are never rewritten.
//!
//! The update sequence is a plain read-modify-write. Two concurrent versioned
//! updates of the same entity read the same revision and write the same
//! archive slot; the later write wins and the earlier snapshot is lost.

use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, Stream, TryStreamExt};
use std::sync::Arc;

use crate::error::{VellumError, VellumResult};
use crate::traits::{ScanRequest, TableBackend, TableItem};
use crate::types::{
    kind_prefix, partition_key, to_field_map, validate_fields, Entity, EntityKind, EntityRecord,
    FieldMap, ItemKey, NewEntity, Page, Stored, VersionSummary, VersionTag,
};

/// Generic persistence and version tracking for every entity kind.
///
/// The table backend is injected; clone the `Arc` to share one backend
/// between several stores or services.
pub struct VersionedStore {
    table: Arc<dyn TableBackend>,
}

impl VersionedStore {
    /// Create a store over the given table backend.
    pub fn new(table: Arc<dyn TableBackend>) -> Self {
        Self { table }
    }

    /// The underlying table backend.
    pub fn table(&self) -> &Arc<dyn TableBackend> {
        &self.table
    }

    /// Stamp timestamps and `V0`, then write the record.
    ///
    /// No uniqueness check is made; callers enforce uniqueness upstream.
    pub async fn create(&self, entity: NewEntity) -> VellumResult<EntityRecord> {
        if entity.id.is_empty() {
            return Err(VellumError::validation("Entity id must not be empty"));
        }
        validate_fields(&entity.fields)?;

        let now = Utc::now();
        let record = EntityRecord {
            id: entity.id,
            entity_type: entity.kind,
            version: VersionTag::CURRENT,
            revision: 0,
            created_at: now,
            updated_at: now,
            fields: entity.fields,
        };

        self.table.put_item(record_to_item(&record)?).await?;
        tracing::debug!(kind = %record.entity_type, id = %record.id, "created entity");
        Ok(record)
    }

    /// Create from a typed record.
    pub async fn create_typed<T: Entity>(&self, value: &T) -> VellumResult<Stored<T>> {
        self.create(NewEntity::from_entity(value)?)
            .await?
            .into_stored()
    }

    /// Current record of an entity, or `None` when there is none.
    pub async fn get_by_id(&self, kind: EntityKind, id: &str) -> VellumResult<Option<EntityRecord>> {
        self.get_version(kind, id, VersionTag::CURRENT).await
    }

    /// Record at one exact version slot, or `None` when the slot is empty.
    pub async fn get_version(
        &self,
        kind: EntityKind,
        id: &str,
        version: VersionTag,
    ) -> VellumResult<Option<EntityRecord>> {
        let key = ItemKey::for_entity(kind, id, version);
        match self.table.get_item(&key).await? {
            Some(item) => item_to_record(item).map(Some),
            None => Ok(None),
        }
    }

    /// Typed current record.
    pub async fn get_typed<T: Entity>(&self, id: &str) -> VellumResult<Option<Stored<T>>> {
        match self.get_by_id(T::KIND, id).await? {
            Some(record) => record.into_stored().map(Some),
            None => Ok(None),
        }
    }

    /// Merge `patch` into the current record.
    ///
    /// With `archive_previous` the pre-update snapshot is first written to the
    /// next archive slot; a failed archive write aborts before `V0` is touched.
    /// Without it `V0` is patched in place and no archive is produced.
    pub async fn update(
        &self,
        kind: EntityKind,
        id: &str,
        patch: FieldMap,
        archive_previous: bool,
    ) -> VellumResult<EntityRecord> {
        validate_fields(&patch)?;

        let current = self
            .get_by_id(kind, id)
            .await?
            .ok_or_else(|| VellumError::not_found(partition_key(kind, id)))?;

        let mut next = current.clone();
        next.apply_patch(&patch);
        next.version = VersionTag::CURRENT;
        next.updated_at = next_timestamp(current.updated_at);

        if archive_previous {
            let slot = current.revision.checked_add(1).ok_or_else(|| {
                VellumError::Internal(format!("{} has exhausted its version numbers", current.key()))
            })?;

            let mut snapshot = current;
            snapshot.version = VersionTag::archived(slot);
            self.table.put_item(record_to_item(&snapshot)?).await?;

            next.revision = slot;
            tracing::debug!(kind = %kind, id, archived = %snapshot.version, "archived previous version");
        }

        self.table.put_item(record_to_item(&next)?).await?;
        tracing::debug!(kind = %kind, id, revision = next.revision, archive_previous, "updated entity");
        Ok(next)
    }

    /// Replace the domain fields of a typed record with `value`.
    pub async fn update_typed<T: Entity>(
        &self,
        id: &str,
        value: &T,
        archive_previous: bool,
    ) -> VellumResult<Stored<T>> {
        self.update(T::KIND, id, to_field_map(value)?, archive_previous)
            .await?
            .into_stored()
    }

    /// Delete the current record and every archived version.
    ///
    /// Each version is deleted on its own. Every delete is attempted; if any
    /// failed the first error is returned and the rest stay orphaned.
    pub async fn delete(&self, kind: EntityKind, id: &str) -> VellumResult<usize> {
        let pk = partition_key(kind, id);
        let items = self.table.query_partition(&pk).await?;
        if items.is_empty() {
            return Err(VellumError::not_found(pk));
        }

        let total = items.len();
        let mut removed = 0;
        let mut first_error = None;
        for item in items {
            match self.table.delete_item(&item.key).await {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::warn!("Failed to delete {}: {}", item.key, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            return Err(VellumError::partial_delete(
                format!("Deleted {} of {} versions of {}", removed, total, pk),
                e,
            ));
        }

        tracing::debug!(kind = %kind, id, removed, "deleted entity");
        Ok(removed)
    }

    /// One page of current records of a kind.
    ///
    /// This is a full-table scan filtered on the key prefix and `V0`, so the
    /// cost grows with the whole table, not with the kind. A backend may
    /// return short pages; keep following `next_page_token`.
    pub async fn query_by_kind(
        &self,
        kind: EntityKind,
        limit: Option<usize>,
        page_token: Option<&str>,
    ) -> VellumResult<Page<EntityRecord>> {
        if limit == Some(0) {
            return Err(VellumError::validation("Page limit must be at least 1"));
        }

        let start = page_token.map(ItemKey::from_page_token).transpose()?;
        let request = ScanRequest::new()
            .with_pk_prefix(kind_prefix(kind))
            .with_sort_key(VersionTag::CURRENT.to_string())
            .with_limit(limit)
            .starting_after(start);

        let page = self.table.scan(request).await?;
        let items = page
            .items
            .into_iter()
            .map(item_to_record)
            .collect::<VellumResult<Vec<_>>>()?;

        Ok(Page {
            items,
            next_page_token: page.last_evaluated.map(|key| key.to_page_token()),
        })
    }

    /// Every current record of a kind, following all pages.
    pub async fn scan_kind(&self, kind: EntityKind) -> VellumResult<Vec<EntityRecord>> {
        let mut records = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = self.query_by_kind(kind, None, token.as_deref()).await?;
            records.extend(page.items);
            match page.next_page_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        Ok(records)
    }

    /// Stream the current records of a kind, fetching `page_size` at a time.
    pub fn stream_kind(
        &self,
        kind: EntityKind,
        page_size: usize,
    ) -> impl Stream<Item = VellumResult<EntityRecord>> + '_ {
        let pages = stream::try_unfold(Some(None::<String>), move |cursor| async move {
            let Some(token) = cursor else {
                return Ok::<_, VellumError>(None);
            };
            let page = self
                .query_by_kind(kind, Some(page_size), token.as_deref())
                .await?;
            let next = page.next_page_token.map(Some);
            Ok(Some((page.items, next)))
        });

        pages
            .map_ok(|items| stream::iter(items.into_iter().map(Ok)))
            .try_flatten()
    }

    /// Current records of a kind matching `predicate`.
    ///
    /// Stands in for a secondary index: scans the whole table.
    pub async fn find_where<F>(&self, kind: EntityKind, predicate: F) -> VellumResult<Vec<EntityRecord>>
    where
        F: Fn(&EntityRecord) -> bool,
    {
        let mut records = self.scan_kind(kind).await?;
        records.retain(|record| predicate(record));
        Ok(records)
    }

    /// Every stored version of an entity, ordered `V0, V1, ..., VN`.
    pub async fn list_versions(&self, kind: EntityKind, id: &str) -> VellumResult<Vec<EntityRecord>> {
        let items = self.table.query_partition(&partition_key(kind, id)).await?;
        let mut records = items
            .into_iter()
            .map(item_to_record)
            .collect::<VellumResult<Vec<_>>>()?;
        records.sort_by_key(|record| record.version);
        Ok(records)
    }

    /// Summary of an entity's version family, `None` when it has no current record.
    pub async fn history(&self, kind: EntityKind, id: &str) -> VellumResult<Option<VersionSummary>> {
        let versions = self.list_versions(kind, id).await?;
        let Some(current) = versions.iter().find(|r| r.version.is_current()) else {
            return Ok(None);
        };

        Ok(Some(VersionSummary {
            id: current.id.clone(),
            kind,
            current_revision: current.revision,
            archived_versions: (versions.len() - 1) as u32,
            created_at: current.created_at,
            last_modified: current.updated_at,
        }))
    }
}

/// Modification time for a new write: now, but never at or before `previous`.
fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

fn record_to_item(record: &EntityRecord) -> VellumResult<TableItem> {
    Ok(TableItem::new(record.key(), to_field_map(record)?))
}

fn item_to_record(item: TableItem) -> VellumResult<EntityRecord> {
    let record: EntityRecord = serde_json::from_value(serde_json::Value::Object(item.body))
        .map_err(|e| VellumError::parse(format!("Item {} is not an entity record: {}", item.key, e)))?;

    if record.key() != item.key {
        return Err(VellumError::parse(format!(
            "Item {} carries attributes of {}",
            item.key,
            record.key()
        )));
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryTable;
    use crate::error::ErrorCode;
    use crate::traits::ScanPage;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fields(value: serde_json::Value) -> FieldMap {
        value.as_object().unwrap().clone()
    }

    /// Memory table that fails selected writes.
    struct FlakyTable {
        inner: MemoryTable,
        fail_put_sk: Option<&'static str>,
        fail_delete_sk: Option<&'static str>,
        deletes_attempted: AtomicUsize,
    }

    impl FlakyTable {
        fn new(inner: MemoryTable) -> Self {
            Self {
                inner,
                fail_put_sk: None,
                fail_delete_sk: None,
                deletes_attempted: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TableBackend for FlakyTable {
        async fn put_item(&self, item: TableItem) -> VellumResult<()> {
            if self.fail_put_sk == Some(item.key.sk.as_str()) {
                return Err(VellumError::storage(format!("throttled writing {}", item.key)));
            }
            self.inner.put_item(item).await
        }

        async fn get_item(&self, key: &ItemKey) -> VellumResult<Option<TableItem>> {
            self.inner.get_item(key).await
        }

        async fn delete_item(&self, key: &ItemKey) -> VellumResult<()> {
            self.deletes_attempted.fetch_add(1, Ordering::SeqCst);
            if self.fail_delete_sk == Some(key.sk.as_str()) {
                return Err(VellumError::storage(format!("throttled deleting {}", key)));
            }
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

    async fn seeded(table: MemoryTable) -> (VersionedStore, EntityRecord) {
        let store = VersionedStore::new(Arc::new(table));
        let record = store
            .create(NewEntity::with_id(
                EntityKind::User,
                "u-1",
                fields(json!({"email": "a@x.com", "firstName": "Ann"})),
            ))
            .await
            .unwrap();
        (store, record)
    }

    #[tokio::test]
    async fn test_failed_archive_write_leaves_current_untouched() {
        let memory = MemoryTable::default();
        let (_, original) = seeded(memory.clone()).await;

        let mut flaky = FlakyTable::new(memory);
        flaky.fail_put_sk = Some("V1");
        let store = VersionedStore::new(Arc::new(flaky));

        let err = store
            .update(EntityKind::User, "u-1", fields(json!({"firstName": "Bea"})), true)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::StoOperationFailed);

        let current = store.get_by_id(EntityKind::User, "u-1").await.unwrap().unwrap();
        assert_eq!(current, original);
    }

    #[tokio::test]
    async fn test_failed_current_write_keeps_archive() {
        let memory = MemoryTable::default();
        seeded(memory.clone()).await;

        let mut flaky = FlakyTable::new(memory);
        flaky.fail_put_sk = Some("V0");
        let store = VersionedStore::new(Arc::new(flaky));

        assert!(store
            .update(EntityKind::User, "u-1", fields(json!({"firstName": "Bea"})), true)
            .await
            .is_err());

        // No compensation: the snapshot stays, V0 still has the old name.
        let archived = store
            .get_version(EntityKind::User, "u-1", VersionTag::archived(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(archived.get_str("firstName"), Some("Ann"));
        let current = store.get_by_id(EntityKind::User, "u-1").await.unwrap().unwrap();
        assert_eq!(current.get_str("firstName"), Some("Ann"));
        assert_eq!(current.revision, 0);
    }

    #[tokio::test]
    async fn test_partial_delete_attempts_every_version() {
        let memory = MemoryTable::default();
        let (store, _) = seeded(memory.clone()).await;
        for name in ["Bea", "Cat"] {
            store
                .update(EntityKind::User, "u-1", fields(json!({"firstName": name})), true)
                .await
                .unwrap();
        }

        let mut flaky = FlakyTable::new(memory.clone());
        flaky.fail_delete_sk = Some("V1");
        let flaky = Arc::new(flaky);
        let store = VersionedStore::new(flaky.clone());

        let err = store.delete(EntityKind::User, "u-1").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::StoPartialDelete);
        assert!(err.to_string().contains("Deleted 2 of 3 versions of USER#u-1"));
        let cause = std::error::Error::source(&err).map(|e| e.to_string());
        assert!(cause.unwrap().contains("throttled deleting"));
        assert_eq!(flaky.deletes_attempted.load(Ordering::SeqCst), 3);

        // V1 is orphaned, everything else is gone.
        let left = store.list_versions(EntityKind::User, "u-1").await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].version, VersionTag::archived(1));
        assert!(store.history(EntityKind::User, "u-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reserved_fields_rejected_without_writes() {
        let memory = MemoryTable::default();
        let (store, _) = seeded(memory.clone()).await;

        let err = store
            .update(EntityKind::User, "u-1", fields(json!({"revision": 42})), true)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValReservedField);
        assert_eq!(memory.len().await, 1);

        let err = store
            .create(NewEntity::new(EntityKind::User, fields(json!({"createdAt": "x"}))))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValReservedField);
        assert_eq!(memory.len().await, 1);
    }

    #[tokio::test]
    async fn test_corrupt_item_is_a_parse_error() {
        let memory = MemoryTable::default();
        memory
            .put_item(TableItem::new(
                ItemKey::current(EntityKind::User, "bad"),
                fields(json!({"id": "other", "entityType": "user", "version": "V0",
                    "createdAt": "2024-01-01T00:00:00Z", "updatedAt": "2024-01-01T00:00:00Z"})),
            ))
            .await
            .unwrap();
        let store = VersionedStore::new(Arc::new(memory));

        let err = store.get_by_id(EntityKind::User, "bad").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ParseInvalidRecord);
    }

    #[tokio::test]
    async fn test_zero_limit_rejected() {
        let store = VersionedStore::new(Arc::new(MemoryTable::default()));
        assert!(store
            .query_by_kind(EntityKind::User, Some(0), None)
            .await
            .is_err());
    }

    #[test]
    fn test_next_timestamp_is_strictly_later() {
        let future = Utc::now() + Duration::hours(1);
        assert!(next_timestamp(future) > future);
        let past = Utc::now() - Duration::hours(1);
        assert!(next_timestamp(past) > past);
    }
}
