//! In-memory catalog store

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{store_key, CatalogStore};
use crate::app::models::CatalogEntry;
use crate::errors::StoreResult;

/// Catalog store that lives only as long as the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, CatalogEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with entries
    pub fn with_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|e| (store_key(&e.identifier), e))
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn get(&self, identifier: &str) -> StoreResult<Option<CatalogEntry>> {
        Ok(self.entries.read().await.get(&store_key(identifier)).cloned())
    }

    async fn put(&self, entry: &CatalogEntry) -> StoreResult<()> {
        self.entries
            .write()
            .await
            .insert(store_key(&entry.identifier), entry.clone());
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<CatalogEntry>> {
        Ok(self.entries.read().await.values().cloned().collect())
    }
}
