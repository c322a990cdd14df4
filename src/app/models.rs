//! Data models for catalog entries, local inventory and assembled artifacts
//!
//! These types are the plain data flowing between the pipeline stages. Catalog
//! entries are persisted by the store; everything else is recomputed per run.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Role of a file part within a set
///
/// Bases are complete on their own; deltas only make sense once the base they
/// patch is present. The derived ordering places every base before any delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartRole {
    Base,
    Delta,
}

impl PartRole {
    /// Parse a role token as found in page markup
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "base" | "parent" => Some(PartRole::Base),
            "delta" | "clone" | "patch" => Some(PartRole::Delta),
            _ => None,
        }
    }
}

impl std::fmt::Display for PartRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartRole::Base => write!(f, "base"),
            PartRole::Delta => write!(f, "delta"),
        }
    }
}

/// One downloadable file belonging to a catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePart {
    /// Path relative to the destination directory, e.g. `ddonpach.zip`
    pub name: String,
    /// Byte size when known
    pub size: Option<u64>,
    /// Absolute download URL
    pub url: Url,
    /// Base or delta
    pub role: PartRole,
}

impl FilePart {
    pub fn new(name: impl Into<String>, url: Url, role: PartRole, size: Option<u64>) -> Self {
        Self {
            name: name.into(),
            size,
            url,
            role,
        }
    }
}

/// Sort parts into dependency order: bases first, stable within a role
pub fn order_parts(parts: &mut [FilePart]) {
    parts.sort_by_key(|p| p.role);
}

/// One remote-cataloged game and its known file parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Stable identifier (the ROM set name), lowercase
    pub identifier: String,
    /// Human-readable title
    pub display_name: String,
    /// Developer the entry was listed under
    pub developer: String,
    /// Manufacturer listing path the entry was found on
    pub manufacturer: String,
    /// Genre or category token from the detail page
    pub category: Option<String>,
    /// Parent set identifier for clones
    pub parent: Option<String>,
    /// Known parts; replaced wholesale on refresh
    pub parts: Vec<FilePart>,
    /// When this entry was last fetched from the remote
    pub refreshed_at: DateTime<Utc>,
}

impl CatalogEntry {
    /// Whether the entry was refreshed within `window` of `now`
    pub fn is_fresh(&self, window: std::time::Duration, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(window) {
            Ok(window) => now.signed_duration_since(self.refreshed_at) < window,
            Err(_) => true,
        }
    }

    /// Replace the parts list in one step and bump the refresh timestamp
    pub fn replace_parts(&mut self, parts: Vec<FilePart>, now: DateTime<Utc>) {
        self.parts = parts;
        self.refreshed_at = now;
    }

    /// Sum of known part sizes
    pub fn known_size(&self) -> u64 {
        self.parts.iter().filter_map(|p| p.size).sum()
    }
}

/// A ROM archive found in the local collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalRomRecord {
    /// Identifier derived from the file name
    pub identifier: String,
    /// Full path of the archive
    pub path: PathBuf,
    /// Size on disk in bytes
    pub size: u64,
}

/// Result of successfully materializing one entry on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembledArtifact {
    /// Entry identifier
    pub identifier: String,
    /// Path of the entry's own archive
    pub path: PathBuf,
    /// Total bytes across all placed parts
    pub total_size: u64,
    /// Bytes transferred by this run, excluding reused parts
    #[serde(default)]
    pub bytes_fetched: u64,
    /// Every file belonging to the artifact, in plan order
    pub files: Vec<PathBuf>,
    /// True if nothing had to be fetched
    pub already_present: bool,
}
