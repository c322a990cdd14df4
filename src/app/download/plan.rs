//! Validated download plans

use std::collections::HashSet;
use std::path::{Component, Path};

use crate::app::models::{FilePart, PartRole};
use crate::errors::{DownloadError, DownloadResult};

/// Ordered parts for one entry plus the file they assemble into
///
/// A plan can only be built from parts that pass validation: at least one
/// part, bases ahead of deltas, unique and safe relative names, known sizes,
/// and one part named after the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPlan {
    identifier: String,
    target: String,
    parts: Vec<FilePart>,
}

impl DownloadPlan {
    /// Build a plan from parts in dependency order
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::NoPartsFound` for an empty part list and
    /// `DownloadError::InvalidPlan` naming the first rule the parts break
    pub fn new(
        identifier: &str,
        parts: Vec<FilePart>,
        archive_extension: &str,
    ) -> DownloadResult<Self> {
        if parts.is_empty() {
            return Err(DownloadError::NoPartsFound {
                identifier: identifier.to_string(),
            });
        }

        let invalid = |reason: String| DownloadError::InvalidPlan {
            identifier: identifier.to_string(),
            reason,
        };

        let mut seen_base = false;
        let mut names = HashSet::new();
        for part in &parts {
            match part.role {
                PartRole::Base => seen_base = true,
                PartRole::Delta if !seen_base => {
                    return Err(invalid(format!(
                        "delta part {} is not preceded by a base",
                        part.name
                    )))
                }
                PartRole::Delta => {}
            }

            if !is_safe_relative(&part.name) {
                return Err(invalid(format!("unsafe part name {:?}", part.name)));
            }
            if !names.insert(part.name.to_lowercase()) {
                return Err(invalid(format!("duplicate part name {}", part.name)));
            }
            if part.size.is_none() {
                return Err(invalid(format!("size of part {} is unknown", part.name)));
            }
        }

        let target = format!("{}.{}", identifier, archive_extension.trim_start_matches('.'));
        if !parts.iter().any(|p| p.name.eq_ignore_ascii_case(&target)) {
            return Err(invalid(format!("no part produces {}", target)));
        }

        Ok(Self {
            identifier: identifier.to_string(),
            target,
            parts,
        })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// File name of the assembled artifact, e.g. `ddonpachj.zip`
    pub fn target_name(&self) -> &str {
        &self.target
    }

    /// Parts in fetch order
    pub fn parts(&self) -> &[FilePart] {
        &self.parts
    }

    /// Sum of all part sizes
    pub fn total_size(&self) -> u64 {
        self.parts.iter().filter_map(|p| p.size).sum()
    }
}

fn is_safe_relative(name: &str) -> bool {
    if name.is_empty() || name.contains('\\') {
        return false;
    }
    Path::new(name)
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
}
