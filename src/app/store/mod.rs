//! Persistent cache of remote catalog metadata
//!
//! The store maps an entry identifier to its last-known [`CatalogEntry`].
//! Callers treat every store failure as a cache miss, so implementations only
//! need to report errors, never recover from them.

pub mod file;
pub mod memory;

use async_trait::async_trait;

use crate::app::models::CatalogEntry;
use crate::errors::StoreResult;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// Keyed storage for catalog entries
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Look up an entry by identifier (case-insensitive)
    async fn get(&self, identifier: &str) -> StoreResult<Option<CatalogEntry>>;

    /// Insert or replace an entry; last write wins
    async fn put(&self, entry: &CatalogEntry) -> StoreResult<()>;

    /// Insert or replace several entries as one write
    async fn put_many(&self, entries: &[CatalogEntry]) -> StoreResult<()> {
        for entry in entries {
            self.put(entry).await?;
        }
        Ok(())
    }

    /// Every stored entry, ordered by identifier
    async fn list(&self) -> StoreResult<Vec<CatalogEntry>>;
}

pub(crate) fn store_key(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}
