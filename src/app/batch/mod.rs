//! Batch execution of download plans
//!
//! The runner drives the orchestrator over a selection of catalog entries with
//! a bounded number of entries in flight. Each entry is planned and executed in
//! isolation: whatever goes wrong is recorded in its [`EntryReport`] and the
//! batch moves on.
//!
//! - `summary`: outcome types and totals
//! - `signals`: Ctrl-C/SIGTERM cancellation flag

pub mod signals;
pub mod summary;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::app::download::DownloadOrchestrator;
use crate::app::models::CatalogEntry;
use crate::constants::workers;
use crate::errors::{AppError, DownloadError};

pub use signals::{cancellation_channel, is_cancelled, SignalHandler};
pub use summary::{format_bytes, BatchSummary, EntryOutcome, EntryReport};

/// Runs the orchestrator over many entries
pub struct BatchRunner {
    orchestrator: Arc<DownloadOrchestrator>,
    destination: PathBuf,
    workers: usize,
    cancel: watch::Receiver<bool>,
    progress: Option<ProgressBar>,
}

impl BatchRunner {
    /// Create a runner writing into `destination`
    ///
    /// `workers` is clamped to `1..=MAX_WORKER_COUNT`.
    pub fn new(
        orchestrator: Arc<DownloadOrchestrator>,
        destination: impl Into<PathBuf>,
        workers: usize,
        cancel: watch::Receiver<bool>,
    ) -> Self {
        Self {
            orchestrator,
            destination: destination.into(),
            workers: workers.clamp(1, workers::MAX_WORKER_COUNT),
            cancel,
            progress: None,
        }
    }

    /// Grow `bar` by each batch's size and tick it once per finished entry
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = Some(bar);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Plan and execute every entry, returning outcomes in input order
    pub async fn run(&self, entries: Vec<CatalogEntry>) -> BatchSummary {
        let started = Instant::now();
        info!(
            "Processing {} entries with {} worker(s)",
            entries.len(),
            self.workers
        );
        if let Some(bar) = &self.progress {
            bar.inc_length(entries.len() as u64);
        }

        let mut indexed: Vec<(usize, EntryReport)> = stream::iter(entries.into_iter().enumerate())
            .map(|(index, entry)| async move { (index, self.run_entry(entry).await) })
            .buffer_unordered(self.workers)
            .collect()
            .await;
        indexed.sort_by_key(|(index, _)| *index);

        let summary = BatchSummary {
            reports: indexed.into_iter().map(|(_, report)| report).collect(),
            duration: started.elapsed(),
        };
        info!("Batch finished: {}", summary.summary());
        summary
    }

    async fn run_entry(&self, entry: CatalogEntry) -> EntryReport {
        let outcome = if is_cancelled(&self.cancel) {
            debug!("Not starting {}: cancelled", entry.identifier);
            EntryOutcome::Cancelled
        } else {
            self.process(&entry).await
        };

        if let Some(bar) = &self.progress {
            bar.set_message(entry.identifier.clone());
            bar.inc(1);
        }

        EntryReport {
            identifier: entry.identifier,
            display_name: entry.display_name,
            developer: entry.developer,
            outcome,
        }
    }

    async fn process(&self, entry: &CatalogEntry) -> EntryOutcome {
        let plan = match self.orchestrator.plan(entry).await {
            Ok(plan) => plan,
            Err(AppError::Download(e @ DownloadError::NoPartsFound { .. })) => {
                warn!("Skipping {}: {}", entry.identifier, e);
                return EntryOutcome::Skipped {
                    reason: e.to_string(),
                };
            }
            Err(e) => {
                warn!("Could not plan {}: {}", entry.identifier, e);
                return EntryOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        match self.orchestrator.execute(&plan, &self.destination).await {
            Ok(artifact) => EntryOutcome::Succeeded { artifact },
            Err(e) => EntryOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }
}
