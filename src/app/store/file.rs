//! JSON file backed catalog store
//!
//! The whole catalog is held in memory and rewritten on every `put` using the
//! temp-file + rename pattern, so a crash mid-write leaves the previous file
//! intact. Writes are serialized by the write half of the lock.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use super::{store_key, CatalogStore};
use crate::app::models::CatalogEntry;
use crate::constants::files;
use crate::errors::{StoreError, StoreResult};

const STORE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    entries: Vec<CatalogEntry>,
}

/// Catalog store persisted as a single JSON document
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, CatalogEntry>>,
}

impl JsonFileStore {
    /// Open the store at `path`, loading existing entries if the file exists
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the file cannot be read and
    /// `StoreError::Corrupted` if it does not decode
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();

        let entries = match fs::read(&path).await {
            Ok(bytes) => {
                let file: StoreFile =
                    serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupted {
                        path: path.clone(),
                        reason: e.to_string(),
                    })?;
                if file.version != STORE_VERSION {
                    return Err(StoreError::Corrupted {
                        path,
                        reason: format!("unsupported store version {}", file.version),
                    });
                }
                info!(
                    "Loaded {} cached catalog entries from {}",
                    file.entries.len(),
                    path.display()
                );
                file.entries
                    .into_iter()
                    .map(|e| (store_key(&e.identifier), e))
                    .collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No catalog store at {}, starting empty", path.display());
                BTreeMap::new()
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Empty store that will overwrite whatever is at `path` on first write
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_snapshot(&self, entries: &BTreeMap<String, CatalogEntry>) -> StoreResult<()> {
        let snapshot = StoreFile {
            version: STORE_VERSION,
            entries: entries.values().cloned().collect(),
        };
        let content = serde_json::to_vec_pretty(&snapshot)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let mut temp_name = self.path.as_os_str().to_os_string();
        temp_name.push(files::TEMP_FILE_SUFFIX);
        let temp_path = PathBuf::from(temp_name);

        fs::write(&temp_path, &content)
            .await
            .map_err(|source| StoreError::Io {
                path: temp_path.clone(),
                source,
            })?;

        fs::rename(&temp_path, &self.path).await.map_err(|source| {
            error!("Failed to rename temporary store file: {}", source);
            StoreError::Io {
                path: self.path.clone(),
                source,
            }
        })
    }
}

#[async_trait]
impl CatalogStore for JsonFileStore {
    async fn get(&self, identifier: &str) -> StoreResult<Option<CatalogEntry>> {
        Ok(self.entries.read().await.get(&store_key(identifier)).cloned())
    }

    async fn put(&self, entry: &CatalogEntry) -> StoreResult<()> {
        // Hold the write lock across the file write so snapshots never interleave
        let mut entries = self.entries.write().await;
        entries.insert(store_key(&entry.identifier), entry.clone());
        self.write_snapshot(&entries).await
    }

    async fn put_many(&self, batch: &[CatalogEntry]) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut entries = self.entries.write().await;
        for entry in batch {
            entries.insert(store_key(&entry.identifier), entry.clone());
        }
        self.write_snapshot(&entries).await
    }

    async fn list(&self) -> StoreResult<Vec<CatalogEntry>> {
        Ok(self.entries.read().await.values().cloned().collect())
    }
}
