//! Catalog filtering and naming heuristics
//!
//! All of these are best-effort string rules: the remote catalog mixes genres
//! freely and its titles carry version and region noise. They are kept as pure
//! functions so each rule can be pinned down by table tests.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

/// Region/version suffixes, most specific first
const VARIANT_SUFFIXES: &[&str] = &[
    "blk", "blka", "blkb", "ja", "jb", "jc", "ua", "ub", "ka", "kb", "ea", "eb", "hk", "tw",
    "kr", "nv", "bl", "sp", "cn", "j", "u", "k", "a", "b", "c", "e", "t", "o",
];

#[allow(clippy::expect_used)]
static TRAILING_PAREN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([^)]*\)\s*$").expect("paren regex is valid"));

#[allow(clippy::expect_used)]
static TRAILING_BRACKET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\[[^\]]*\]\s*$").expect("bracket regex is valid"));

/// Trailing group that opens with a release date, e.g. `(1997/02/05 ...)`
#[allow(clippy::expect_used)]
static TRAILING_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([\d/\s.]+[^)]*\)\s*$").expect("date regex is valid"));

#[allow(clippy::expect_used)]
static MASTER_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*MASTER\s*VER\.?.*$").expect("version regex is valid"));

/// Denylist and skip-list policy for catalog entries
#[derive(Debug, Clone, Default)]
pub struct CatalogFilter {
    keywords: Vec<String>,
    skip_identifiers: HashSet<String>,
}

impl CatalogFilter {
    pub fn new<K, S>(keywords: K, skip_identifiers: S) -> Self
    where
        K: IntoIterator,
        K::Item: AsRef<str>,
        S: IntoIterator,
        S::Item: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            skip_identifiers: skip_identifiers
                .into_iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .collect(),
        }
    }

    /// Identifier is on the explicit skip list
    pub fn is_skipped(&self, identifier: &str) -> bool {
        self.skip_identifiers.contains(&identifier.to_lowercase())
    }

    /// First denylist keyword found in the title, identifier or category
    pub fn matched_keyword(
        &self,
        title: &str,
        identifier: &str,
        category: Option<&str>,
    ) -> Option<&str> {
        let haystacks = [
            title.to_lowercase(),
            identifier.to_lowercase(),
            category.map(str::to_lowercase).unwrap_or_default(),
        ];
        self.keywords
            .iter()
            .find(|keyword| haystacks.iter().any(|h| h.contains(keyword.as_str())))
            .map(String::as_str)
    }

    /// Whether an entry should be dropped from listings
    pub fn is_excluded(&self, title: &str, identifier: &str, category: Option<&str>) -> bool {
        self.is_skipped(identifier) || self.matched_keyword(title, identifier, category).is_some()
    }
}

/// Identifier with a known region/version suffix removed
///
/// Used to deduplicate variants listed under several manufacturer paths:
/// `gunbirdj` and `gunbird` collapse to the same base. Short names are left
/// alone so that distinct games are not merged.
pub fn base_identifier(identifier: &str) -> String {
    for suffix in VARIANT_SUFFIXES {
        if identifier.ends_with(suffix) && identifier.len() > suffix.len() + 3 {
            let base = &identifier[..identifier.len() - suffix.len()];
            if base.len() >= 4 {
                return base.to_string();
            }
        }
    }
    identifier.to_string()
}

/// Strip one trailing `( … )` group, then one trailing `[ … ]` group
///
/// A title that would be left empty is returned whitespace-collapsed but
/// otherwise untouched.
pub fn clean_title(raw: &str) -> String {
    let title = collapse_whitespace(raw);
    let cleaned = {
        let without_paren = TRAILING_PAREN.replace(&title, "");
        let without_bracket = TRAILING_BRACKET.replace(&without_paren, "");
        without_bracket.trim().to_string()
    };
    if cleaned.is_empty() {
        title
    } else {
        cleaned
    }
}

/// Display name for an entry, preferring configured overrides
pub fn display_name(identifier: &str, title: &str, overrides: &HashMap<String, String>) -> String {
    if let Some(name) = overrides
        .get(&base_identifier(identifier))
        .or_else(|| overrides.get(identifier))
    {
        return name.clone();
    }

    let name = collapse_whitespace(title);
    let name = TRAILING_DATE.replace(&name, "");
    let name = MASTER_VERSION.replace(&name, "");

    let name = name.trim().to_string();
    if name.is_empty() {
        identifier.to_string()
    } else {
        name
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
