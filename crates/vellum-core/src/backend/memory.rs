//! In-memory table backend.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::VellumResult;
use crate::traits::{ScanPage, ScanRequest, TableBackend, TableItem};
use crate::types::{FieldMap, ItemKey};

/// Process-local wide table ordered by `(pk, sk)`.
///
/// Cloning shares the same underlying table.
#[derive(Clone)]
pub struct MemoryTable {
    name: String,
    items: Arc<RwLock<BTreeMap<ItemKey, FieldMap>>>,
}

impl MemoryTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Number of items across all partitions.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

impl Default for MemoryTable {
    fn default() -> Self {
        Self::new("vellum")
    }
}

#[async_trait]
impl TableBackend for MemoryTable {
    async fn put_item(&self, item: TableItem) -> VellumResult<()> {
        self.items.write().await.insert(item.key, item.body);
        Ok(())
    }

    async fn get_item(&self, key: &ItemKey) -> VellumResult<Option<TableItem>> {
        let items = self.items.read().await;
        Ok(items
            .get(key)
            .map(|body| TableItem::new(key.clone(), body.clone())))
    }

    async fn delete_item(&self, key: &ItemKey) -> VellumResult<()> {
        self.items.write().await.remove(key);
        Ok(())
    }

    async fn query_partition(&self, pk: &str) -> VellumResult<Vec<TableItem>> {
        let items = self.items.read().await;
        let start = ItemKey::new(pk, "");
        Ok(items
            .range(start..)
            .take_while(|(key, _)| key.pk == pk)
            .map(|(key, body)| TableItem::new(key.clone(), body.clone()))
            .collect())
    }

    async fn scan(&self, request: ScanRequest) -> VellumResult<ScanPage> {
        let items = self.items.read().await;
        let lower = match &request.exclusive_start {
            Some(key) => Bound::Excluded(key.clone()),
            None => Bound::Unbounded,
        };

        let mut matching = items
            .range((lower, Bound::Unbounded))
            .filter(|(key, _)| request.matches(key));

        let mut page = ScanPage::default();
        let limit = request.limit.unwrap_or(usize::MAX);
        for (key, body) in matching.by_ref() {
            page.items.push(TableItem::new(key.clone(), body.clone()));
            if page.items.len() >= limit {
                break;
            }
        }

        if page.items.len() >= limit && matching.next().is_some() {
            page.last_evaluated = page.items.last().map(|item| item.key.clone());
        }

        Ok(page)
    }

    fn table_name(&self) -> &str {
        &self.name
    }
}
