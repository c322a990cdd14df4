//! End-to-end fetch-and-reconcile flows
//!
//! A [`Pipeline`] wires the catalog client, inventory scanner, reconciliation
//! and batch runner together for one developer or for every configured
//! developer. In all-developers mode a developer whose listing is unavailable
//! is recorded and the survey moves on to the next one.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::app::batch::{BatchRunner, BatchSummary};
use crate::app::client::CatalogClient;
use crate::app::inventory::{InventoryReport, InventoryScanner};
use crate::app::models::CatalogEntry;
use crate::app::reconcile::reconcile;
use crate::app::records::{GameRecord, OrientationPolicy};
use crate::errors::{Result, ScanError};

/// Selection and behaviour of a fetch run
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Only select entries missing locally
    pub missing_only: bool,
    /// Restrict the selection to these identifiers
    pub only: Vec<String>,
    /// Cap on the number of selected entries
    pub limit: Option<usize>,
    /// Answer from the catalog store instead of the remote
    pub offline: bool,
    /// Stop after selection; download nothing
    pub dry_run: bool,
}

/// What happened for one developer
#[derive(Debug, Clone, Default)]
pub struct DeveloperRun {
    pub developer: String,
    /// Entries in scope after filtering
    pub listed: usize,
    /// Listing entries dropped because their detail page failed
    pub skipped: usize,
    /// Listing entries dropped by the denylist or skip list
    pub filtered: usize,
    /// Entries answered from the catalog store
    pub cache_hits: usize,
    /// In-scope entries already present locally
    pub present: usize,
    /// Entries chosen for download
    pub selected: Vec<CatalogEntry>,
    /// Batch outcome; `None` on a dry run or empty selection
    pub summary: Option<BatchSummary>,
}

/// Result of running every configured developer
#[derive(Debug, Default)]
pub struct SurveyReport {
    pub runs: Vec<DeveloperRun>,
    /// Developers that could not be processed, with the reason
    pub failures: Vec<(String, String)>,
}

impl SurveyReport {
    pub fn succeeded(&self) -> usize {
        self.runs
            .iter()
            .filter_map(|r| r.summary.as_ref())
            .map(BatchSummary::succeeded)
            .sum()
    }
}

/// The assembled fetch-and-reconcile pipeline
pub struct Pipeline {
    client: Arc<CatalogClient>,
    scanner: InventoryScanner,
    runner: BatchRunner,
    destination: PathBuf,
    orientation: OrientationPolicy,
}

impl Pipeline {
    pub fn new(
        client: Arc<CatalogClient>,
        scanner: InventoryScanner,
        runner: BatchRunner,
        destination: impl Into<PathBuf>,
        orientation: OrientationPolicy,
    ) -> Self {
        Self {
            client,
            scanner,
            runner,
            destination: destination.into(),
            orientation,
        }
    }

    pub fn client(&self) -> &CatalogClient {
        &self.client
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Scan the destination; a directory that does not exist yet is empty
    pub async fn inventory(&self) -> Result<InventoryReport> {
        match self.scanner.scan(&self.destination).await {
            Ok(report) => Ok(report),
            Err(ScanError::DirectoryNotAccessible { path }) if !path.exists() => {
                info!("{} does not exist yet, nothing owned", path.display());
                Ok(InventoryReport::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// List, reconcile, select and download one developer's games
    ///
    /// # Errors
    ///
    /// Returns the catalog error when the developer is unknown or its listing
    /// is unavailable, and scan errors for an unreadable destination.
    /// Per-entry failures end up in the batch summary instead.
    pub async fn run_developer(
        &self,
        developer: &str,
        options: &FetchOptions,
    ) -> Result<DeveloperRun> {
        let mut run = DeveloperRun {
            developer: self.client.resolve_developer(developer)?.to_string(),
            ..Default::default()
        };

        let entries = if options.offline {
            let entries = self.client.cached_games(developer).await?;
            run.cache_hits = entries.len();
            entries
        } else {
            let report = self.client.list_games(developer).await?;
            run.skipped = report.skipped;
            run.filtered = report.filtered;
            run.cache_hits = report.cache_hits;
            report.entries
        };
        run.listed = entries.len();

        let inventory = self.inventory().await?;
        let reconciliation = reconcile(&entries, &inventory.records, options.missing_only);
        run.present = entries
            .iter()
            .filter(|e| inventory.contains(&e.identifier))
            .count();

        run.selected = select(reconciliation.into_entries(), options);
        info!(
            "{}: {} listed, {} owned, {} selected",
            run.developer,
            run.listed,
            run.present,
            run.selected.len()
        );

        if !options.dry_run && !run.selected.is_empty() {
            run.summary = Some(self.runner.run(run.selected.clone()).await);
        }
        Ok(run)
    }

    /// Run every configured developer, isolating per-developer failures
    pub async fn run_all(&self, options: &FetchOptions) -> SurveyReport {
        let mut survey = SurveyReport::default();
        for developer in self.client.list_developers() {
            match self.run_developer(&developer, options).await {
                Ok(run) => survey.runs.push(run),
                Err(e) => {
                    warn!("Skipping developer {}: {}", developer, e);
                    survey.failures.push((developer, e.to_string()));
                }
            }
        }
        survey
    }

    /// Records for the artifacts a run newly assembled
    pub fn records(&self, run: &DeveloperRun) -> Vec<GameRecord> {
        let Some(summary) = &run.summary else {
            return Vec::new();
        };
        summary
            .new_artifacts()
            .filter_map(|(report, artifact)| {
                run.selected
                    .iter()
                    .find(|e| e.identifier == report.identifier)
                    .map(|entry| GameRecord::from_artifact(entry, artifact, &self.orientation))
            })
            .collect()
    }

    /// Records for every owned game the catalog store knows about
    pub async fn owned_records(&self) -> Result<Vec<GameRecord>> {
        let inventory = self.inventory().await?;
        let cached = self.client.all_cached().await;

        let records = inventory
            .records
            .iter()
            .filter_map(|local| {
                let entry = cached
                    .iter()
                    .find(|e| e.identifier.eq_ignore_ascii_case(&local.identifier))?;
                Some(GameRecord {
                    identifier: entry.identifier.clone(),
                    display_name: entry.display_name.clone(),
                    developer: entry.developer.clone(),
                    orientation: self.orientation.orientation(&entry.identifier),
                    files: vec![local.path.clone()],
                })
            })
            .collect();
        Ok(records)
    }
}

/// Apply the identifier restriction and limit, preserving order
fn select(entries: Vec<CatalogEntry>, options: &FetchOptions) -> Vec<CatalogEntry> {
    let only: HashSet<String> = options.only.iter().map(|id| id.to_lowercase()).collect();
    let selected = entries
        .into_iter()
        .filter(|e| only.is_empty() || only.contains(&e.identifier.to_lowercase()));

    match options.limit {
        Some(limit) => selected.take(limit).collect(),
        None => selected.collect(),
    }
}
