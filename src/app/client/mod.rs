//! Remote catalog client
//!
//! This module turns the catalog website into structured [`CatalogEntry`]
//! records: it walks paginated manufacturer listings, fetches game detail pages,
//! filters out non-shmup entries and caches everything in a [`CatalogStore`].
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and building
//! - `http`: the [`Transport`] seam and its reqwest implementation
//! - `parse`: listing and detail page parsing
//! - `filter`: denylist, deduplication and naming heuristics

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};
use url::Url;

use crate::app::models::{order_parts, CatalogEntry, FilePart};
use crate::app::retry::RetryPolicy;
use crate::app::store::CatalogStore;
use crate::constants::{defaults, limits, mdk};
use crate::errors::{CatalogError, CatalogResult};

pub mod config;
pub mod filter;
pub mod http;
pub mod parse;

pub use config::ClientConfig;
pub use filter::{base_identifier, clean_title, display_name, CatalogFilter};
pub use http::{HttpHandler, Transport};
pub use parse::{parse_detail, parse_listing, DetailPage, ListingPage, ListingRow};

/// Catalog policy: where to look and what to keep
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Catalog site root
    pub base_url: Url,
    /// Developer name -> manufacturer listing paths
    pub developers: BTreeMap<String, Vec<String>>,
    /// Denylist and skip-list
    pub filter: CatalogFilter,
    /// Display-name overrides keyed by identifier
    pub display_names: HashMap<String, String>,
    /// How long a cached entry short-circuits the detail fetch
    pub freshness_window: Duration,
    /// Upper bound on listing pages followed per manufacturer path
    pub max_listing_pages: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(mdk::BASE_URL).expect("catalog base URL constant is valid"),
            developers: defaults::DEVELOPERS
                .iter()
                .map(|(name, paths)| {
                    (
                        name.to_string(),
                        paths.iter().map(|p| p.to_string()).collect(),
                    )
                })
                .collect(),
            filter: CatalogFilter::new(defaults::DENYLIST_KEYWORDS, defaults::SKIP_IDENTIFIERS),
            display_names: defaults::DISPLAY_NAMES
                .iter()
                .map(|(id, name)| (id.to_string(), name.to_string()))
                .collect(),
            freshness_window: defaults::FRESHNESS_WINDOW,
            max_listing_pages: limits::MAX_LISTING_PAGES,
        }
    }
}

/// Outcome of listing one developer
#[derive(Debug, Clone, Default)]
pub struct ListingReport {
    /// Canonical developer name
    pub developer: String,
    /// Entries that survived filtering, in listing order
    pub entries: Vec<CatalogEntry>,
    /// Entries dropped because their detail page failed
    pub skipped: usize,
    /// Entries dropped by the skip list or denylist
    pub filtered: usize,
    /// Entries answered from the store without a detail fetch
    pub cache_hits: usize,
}

/// Client for the remote ROM catalog
///
/// Holds a [`Transport`] for all network access and a [`CatalogStore`] for
/// caching. Every network call goes through the configured [`RetryPolicy`].
pub struct CatalogClient {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CatalogStore>,
    config: CatalogConfig,
    retry: RetryPolicy,
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.config.base_url.as_str())
            .field("developers", &self.config.developers.len())
            .field("retry", &self.retry)
            .finish()
    }
}

impl CatalogClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn CatalogStore>,
        config: CatalogConfig,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            store,
            config,
            retry,
        }
    }

    /// Configured developer names, sorted
    pub fn list_developers(&self) -> Vec<String> {
        self.config.developers.keys().cloned().collect()
    }

    /// Find a configured developer by case-insensitive name
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::UnknownDeveloper` listing the available names
    pub fn resolve_developer(&self, name: &str) -> CatalogResult<&str> {
        let wanted = name.trim();
        self.config
            .developers
            .keys()
            .find(|known| known.eq_ignore_ascii_case(wanted))
            .map(String::as_str)
            .ok_or_else(|| CatalogError::UnknownDeveloper {
                name: name.to_string(),
                available: self.list_developers().join(", "),
            })
    }

    /// List a developer's games from the remote catalog
    ///
    /// Walks every manufacturer path of the developer, deduplicates variants by
    /// base identifier, filters out denylisted entries and resolves each
    /// remaining entry through the store or its detail page.
    ///
    /// # Arguments
    ///
    /// * `developer` - Developer name, matched case-insensitively
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::UnknownDeveloper` for an unconfigured name and
    /// `CatalogError::RemoteUnavailable` once a listing page exhausts its
    /// retries. Failures on individual detail pages are only counted.
    pub async fn list_games(&self, developer: &str) -> CatalogResult<ListingReport> {
        let developer = self.resolve_developer(developer)?.to_string();
        let paths = self
            .config
            .developers
            .get(&developer)
            .cloned()
            .unwrap_or_default();

        let mut report = ListingReport {
            developer: developer.clone(),
            ..Default::default()
        };
        let mut seen_bases = HashSet::new();
        let now = Utc::now();

        for path in &paths {
            let rows = self.fetch_listing(path).await?;
            debug!("{} rows listed under {}", rows.len(), path);
            let mut fetched = Vec::new();

            for row in rows {
                if self.config.filter.is_skipped(&row.identifier) {
                    debug!("Skipping {} (skip list)", row.identifier);
                    report.filtered += 1;
                    continue;
                }
                let base = base_identifier(&row.identifier);
                if seen_bases.contains(&base) {
                    debug!("Skipping {} (duplicate variant)", row.identifier);
                    continue;
                }

                let title = clean_title(&row.title);
                let name = display_name(&row.identifier, &title, &self.config.display_names);
                let matched = self.config.filter.matched_keyword(&name, &row.identifier, None);
                if let Some(keyword) = matched {
                    debug!("Filtered {} (matched '{}')", row.identifier, keyword);
                    report.filtered += 1;
                    continue;
                }

                let window = self.config.freshness_window;
                let cached = self
                    .cached_entry(&row.identifier)
                    .await
                    .filter(|e| !e.parts.is_empty() && e.is_fresh(window, now));

                let entry = match cached {
                    Some(entry) => {
                        report.cache_hits += 1;
                        entry
                    }
                    None => match self.fetch_detail(&row.identifier).await {
                        Ok(detail) => {
                            let entry = self.build_entry(&developer, path, &row, &name, detail);
                            fetched.push(entry.clone());
                            entry
                        }
                        Err(e) => {
                            warn!("Skipping {}: {}", row.identifier, e);
                            report.skipped += 1;
                            continue;
                        }
                    },
                };

                // Category is only known after the detail fetch
                if let Some(keyword) = self.config.filter.matched_keyword(
                    &entry.display_name,
                    &entry.identifier,
                    entry.category.as_deref(),
                ) {
                    debug!("Filtered {} (matched '{}')", entry.identifier, keyword);
                    report.filtered += 1;
                    continue;
                }

                seen_bases.insert(base);
                report.entries.push(entry);
            }

            self.store_entries(&fetched).await;
        }

        info!(
            "{}: {} games ({} filtered, {} skipped, {} cached)",
            developer,
            report.entries.len(),
            report.filtered,
            report.skipped,
            report.cache_hits
        );
        Ok(report)
    }

    /// A developer's games as currently cached, without network access
    ///
    /// Store failures are logged and yield an empty list.
    pub async fn cached_games(&self, developer: &str) -> CatalogResult<Vec<CatalogEntry>> {
        let developer = self.resolve_developer(developer)?;
        match self.store.list().await {
            Ok(entries) => Ok(entries
                .into_iter()
                .filter(|e| e.developer.eq_ignore_ascii_case(developer))
                .collect()),
            Err(e) => {
                warn!("Catalog store unavailable, treating as empty: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// Every cached entry regardless of developer
    pub async fn all_cached(&self) -> Vec<CatalogEntry> {
        self.store.list().await.unwrap_or_else(|e| {
            warn!("Catalog store unavailable, treating as empty: {}", e);
            Vec::new()
        })
    }

    /// Resolve the live, ordered parts of an entry
    ///
    /// The detail page is fetched again when the entry has no parts or is
    /// older than the freshness window; the refreshed entry is written back to
    /// the store. Every part is then probed, taking the advertised size where
    /// there is one.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::MalformedDetail` or `CatalogError::RemoteUnavailable`
    /// if a needed refresh fails, and `CatalogError::PartUnavailable` for the
    /// first part that does not answer its probe.
    pub async fn resolve_parts(&self, entry: &CatalogEntry) -> CatalogResult<Vec<FilePart>> {
        let now = Utc::now();
        let mut entry = entry.clone();

        if entry.parts.is_empty() || !entry.is_fresh(self.config.freshness_window, now) {
            debug!("Refreshing parts of {}", entry.identifier);
            let detail = self.fetch_detail(&entry.identifier).await?;
            entry.category = detail.category.or(entry.category);
            entry.parent = detail.parent.or(entry.parent);
            let mut parts = detail.parts;
            order_parts(&mut parts);
            entry.replace_parts(parts, now);
            self.store_entry(&entry).await;
        }

        let mut live = Vec::with_capacity(entry.parts.len());
        for part in &entry.parts {
            let probed = self
                .retry
                .run(&format!("probe {}", part.name), || {
                    self.transport.probe(&part.url)
                })
                .await;

            let size = probed.map_err(|e| {
                warn!(
                    "Part {} of {} did not answer: {}",
                    part.name, entry.identifier, e.last_error
                );
                CatalogError::PartUnavailable {
                    identifier: entry.identifier.clone(),
                    part: part.name.clone(),
                    reason: e.last_error.to_string(),
                }
            })?;

            let mut part = part.clone();
            if size.is_some() {
                part.size = size;
            }
            live.push(part);
        }

        order_parts(&mut live);
        Ok(live)
    }

    /// The transport used for all network access
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    fn endpoint(&self, prefix: &str, name: &str) -> CatalogResult<Url> {
        let relative = format!("{}/{}", prefix, name);
        self.config
            .base_url
            .join(&relative)
            .map_err(|e| CatalogError::InvalidUrl {
                url: format!("{}{}", self.config.base_url, relative),
                error: e.to_string(),
            })
    }

    /// Every row across the pages of one manufacturer listing
    async fn fetch_listing(&self, path: &str) -> CatalogResult<Vec<ListingRow>> {
        let mut page_url = self.endpoint(mdk::MANUFACTURER_PATH, path)?;
        let mut visited = HashSet::new();
        let mut rows = Vec::new();

        for _ in 0..self.config.max_listing_pages {
            if !visited.insert(page_url.clone()) {
                warn!("Pagination loop detected at {}", page_url);
                break;
            }

            let current = page_url.clone();
            let html = self
                .retry
                .run(&format!("listing {}", current), || {
                    self.transport.fetch_page(&current)
                })
                .await
                .map_err(|e| CatalogError::RemoteUnavailable {
                    url: current.to_string(),
                    attempts: e.attempts,
                    reason: e.last_error.to_string(),
                })?;

            let page = parse_listing(&html, &current).map_err(|source| {
                CatalogError::MalformedListing {
                    url: current.to_string(),
                    source,
                }
            })?;
            rows.extend(page.rows);

            match page.next {
                Some(next) => page_url = next,
                None => break,
            }
        }

        Ok(rows)
    }

    async fn fetch_detail(&self, identifier: &str) -> CatalogResult<DetailPage> {
        let url = self.endpoint(mdk::GAME_PATH, identifier)?;
        let html = self
            .retry
            .run(&format!("detail {}", identifier), || {
                self.transport.fetch_page(&url)
            })
            .await
            .map_err(|e| CatalogError::RemoteUnavailable {
                url: url.to_string(),
                attempts: e.attempts,
                reason: e.last_error.to_string(),
            })?;

        parse_detail(&html, identifier, &url).map_err(|source| CatalogError::MalformedDetail {
            identifier: identifier.to_string(),
            source,
        })
    }

    fn build_entry(
        &self,
        developer: &str,
        manufacturer: &str,
        row: &ListingRow,
        listing_name: &str,
        detail: DetailPage,
    ) -> CatalogEntry {
        let display_name = if listing_name == row.identifier {
            display_name(&row.identifier, &detail.title, &self.config.display_names)
        } else {
            listing_name.to_string()
        };

        let mut parts = detail.parts;
        order_parts(&mut parts);

        CatalogEntry {
            identifier: row.identifier.clone(),
            display_name,
            developer: developer.to_string(),
            manufacturer: manufacturer.to_string(),
            category: detail.category,
            parent: detail.parent,
            parts,
            refreshed_at: Utc::now(),
        }
    }

    async fn cached_entry(&self, identifier: &str) -> Option<CatalogEntry> {
        match self.store.get(identifier).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Catalog store read failed for {}: {}", identifier, e);
                None
            }
        }
    }

    async fn store_entries(&self, entries: &[CatalogEntry]) {
        if let Err(e) = self.store.put_many(entries).await {
            warn!("Catalog store write failed for {} entries: {}", entries.len(), e);
        }
    }

    async fn store_entry(&self, entry: &CatalogEntry) {
        if let Err(e) = self.store.put(entry).await {
            warn!("Catalog store write failed for {}: {}", entry.identifier, e);
        }
    }
}
