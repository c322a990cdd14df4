//! Local ROM inventory scanning
//!
//! Walks the destination directory (one level, no recursion) and derives an
//! identifier from every archive file name. The rules live in the pure
//! [`extract_identifier`] so they can be tested without a filesystem.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tokio::fs;
use tracing::{debug, info};

use crate::app::models::LocalRomRecord;
use crate::constants::files;
use crate::errors::{ScanError, ScanResult};

/// First region/version marker in a file stem
#[allow(clippy::expect_used)]
static VARIANT_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[(\[{\s]|[_-][vV]\d").expect("marker regex is valid"));

#[allow(clippy::expect_used)]
static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_]+$").expect("identifier regex is valid"));

/// Derive a ROM identifier from an archive file name
///
/// Returns `None` when the extension does not match or when what is left after
/// cutting region/version markers is not a plain `[a-z0-9_]+` token.
pub fn extract_identifier(filename: &str, extension: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if !ext.eq_ignore_ascii_case(extension) {
        return None;
    }

    let cut = VARIANT_MARKER.find(stem).map_or(stem.len(), |m| m.start());
    let identifier = stem[..cut].trim().to_lowercase();

    IDENTIFIER.is_match(&identifier).then_some(identifier)
}

/// Result of scanning a ROM directory
#[derive(Debug, Clone, Default)]
pub struct InventoryReport {
    /// One record per identifier, ordered by identifier
    pub records: Vec<LocalRomRecord>,
    /// Archives whose names did not yield an identifier
    pub unparsed: usize,
}

impl InventoryReport {
    pub fn identifiers(&self) -> HashSet<String> {
        self.records.iter().map(|r| r.identifier.clone()).collect()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        let wanted = identifier.to_lowercase();
        self.records.iter().any(|r| r.identifier == wanted)
    }

    pub fn total_size(&self) -> u64 {
        self.records.iter().map(|r| r.size).sum()
    }
}

/// Scanner for archives of one extension
#[derive(Debug, Clone)]
pub struct InventoryScanner {
    extension: String,
}

impl Default for InventoryScanner {
    fn default() -> Self {
        Self::new(files::ARCHIVE_EXTENSION)
    }
}

impl InventoryScanner {
    pub fn new(extension: impl Into<String>) -> Self {
        let extension: String = extension.into();
        Self {
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    /// Scan `directory` for archives
    ///
    /// # Errors
    ///
    /// Returns `ScanError::DirectoryNotAccessible` if the directory does not
    /// exist or is not a directory, and `ScanError::Io` if reading it fails
    /// partway. Unparseable file names are counted, not errors.
    pub async fn scan(&self, directory: &Path) -> ScanResult<InventoryReport> {
        let metadata = fs::metadata(directory).await.ok();
        if !metadata.is_some_and(|m| m.is_dir()) {
            return Err(ScanError::DirectoryNotAccessible {
                path: directory.to_path_buf(),
            });
        }

        let io_error = |source| ScanError::Io {
            path: directory.to_path_buf(),
            source,
        };

        let mut records: BTreeMap<String, LocalRomRecord> = BTreeMap::new();
        let mut unparsed = 0;
        let mut entries = fs::read_dir(directory).await.map_err(io_error)?;

        while let Some(dir_entry) = entries.next_entry().await.map_err(io_error)? {
            let file_name = dir_entry.file_name();
            let Some(name) = file_name.to_str() else {
                unparsed += 1;
                continue;
            };
            if name.starts_with('.') || !self.has_extension(name) {
                continue;
            }

            let metadata = dir_entry.metadata().await.map_err(io_error)?;
            if !metadata.is_file() {
                continue;
            }

            match extract_identifier(name, &self.extension) {
                Some(identifier) => {
                    let path: PathBuf = dir_entry.path();
                    records
                        .entry(identifier.clone())
                        .or_insert_with(|| LocalRomRecord {
                            identifier,
                            path,
                            size: metadata.len(),
                        });
                }
                None => {
                    debug!("Could not derive identifier from {}", name);
                    unparsed += 1;
                }
            }
        }

        info!(
            "Found {} ROM archives in {} ({} unparsed)",
            records.len(),
            directory.display(),
            unparsed
        );

        Ok(InventoryReport {
            records: records.into_values().collect(),
            unparsed,
        })
    }

    fn has_extension(&self, name: &str) -> bool {
        name.rsplit_once('.')
            .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case(&self.extension))
    }
}
