use crate::models::item::{item_key, Item};
use async_trait::async_trait;
use service_core::error::AppError;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::RwLock;

/// One page of a full-table scan.
#[derive(Debug, Clone, Default)]
pub struct ScanPage {
    pub items: Vec<Item>,
    /// Continuation token; `None` once the scan is complete.
    pub last_evaluated_key: Option<String>,
}

/// Key-value document store holding question records.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch the page of items that follows `exclusive_start_key`.
    async fn scan(&self, exclusive_start_key: Option<&str>) -> Result<ScanPage, AppError>;
    async fn get_item(&self, id: &str) -> Result<Option<Item>, AppError>;
    /// Insert or fully replace an item.
    async fn put_item(&self, item: Item) -> Result<(), AppError>;
    /// Set the given attributes on an existing item.
    async fn update_item(&self, id: &str, changes: Item) -> Result<(), AppError>;
    /// Remove an item. Removing a missing item is not an error.
    async fn delete_item(&self, id: &str) -> Result<(), AppError>;
    /// Write several items; returns the items the store did not process.
    async fn batch_put(&self, items: Vec<Item>) -> Result<Vec<Item>, AppError>;
    async fn health_check(&self) -> Result<(), AppError>;
}

pub(crate) fn require_key(item: &Item) -> Result<String, AppError> {
    item_key(item)
        .map(str::to_string)
        .ok_or_else(|| AppError::validation("Item is missing its primary key"))
}

/// Ordered in-process store with a fixed scan page size.
pub struct InMemoryDocumentStore {
    items: RwLock<BTreeMap<String, Item>>,
    page_size: usize,
}

impl InMemoryDocumentStore {
    pub fn new(page_size: usize) -> Self {
        Self {
            items: RwLock::new(BTreeMap::new()),
            page_size: page_size.max(1),
        }
    }

    pub fn with_items(page_size: usize, items: impl IntoIterator<Item = Item>) -> Self {
        let store = Self::new(page_size);
        {
            let mut map = store.items.write().unwrap_or_else(|e| e.into_inner());
            for item in items {
                if let Some(key) = item_key(&item).map(str::to_string) {
                    map.insert(key, item);
                }
            }
        }
        store
    }

    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new(100)
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn scan(&self, exclusive_start_key: Option<&str>) -> Result<ScanPage, AppError> {
        let map = self.items.read().unwrap_or_else(|e| e.into_inner());
        let lower = match exclusive_start_key {
            Some(key) => Bound::Excluded(key.to_string()),
            None => Bound::Unbounded,
        };

        let mut remaining = map.range((lower, Bound::Unbounded));
        let items: Vec<Item> = remaining
            .by_ref()
            .take(self.page_size)
            .map(|(_, item)| item.clone())
            .collect();

        let last_evaluated_key = if remaining.next().is_some() {
            items.last().and_then(item_key).map(str::to_string)
        } else {
            None
        };

        Ok(ScanPage {
            items,
            last_evaluated_key,
        })
    }

    async fn get_item(&self, id: &str) -> Result<Option<Item>, AppError> {
        let map = self.items.read().unwrap_or_else(|e| e.into_inner());
        Ok(map.get(id).cloned())
    }

    async fn put_item(&self, item: Item) -> Result<(), AppError> {
        let key = require_key(&item)?;
        let mut map = self.items.write().unwrap_or_else(|e| e.into_inner());
        map.insert(key, item);
        Ok(())
    }

    async fn update_item(&self, id: &str, changes: Item) -> Result<(), AppError> {
        let mut map = self.items.write().unwrap_or_else(|e| e.into_inner());
        let item = map.get_mut(id).ok_or_else(AppError::not_found)?;
        item.extend(changes);
        Ok(())
    }

    async fn delete_item(&self, id: &str) -> Result<(), AppError> {
        let mut map = self.items.write().unwrap_or_else(|e| e.into_inner());
        map.remove(id);
        Ok(())
    }

    async fn batch_put(&self, items: Vec<Item>) -> Result<Vec<Item>, AppError> {
        let mut map = self.items.write().unwrap_or_else(|e| e.into_inner());
        let mut unprocessed = Vec::new();
        for item in items {
            match item_key(&item).map(str::to_string) {
                Some(key) => {
                    map.insert(key, item);
                }
                None => unprocessed.push(item),
            }
        }
        Ok(unprocessed)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}
