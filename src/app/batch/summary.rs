//! Per-entry outcomes and batch totals

use std::time::Duration;

use serde::Serialize;

use crate::app::models::AssembledArtifact;

/// What happened to one entry in a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum EntryOutcome {
    Succeeded { artifact: AssembledArtifact },
    Skipped { reason: String },
    Failed { reason: String },
    Cancelled,
}

/// One entry's outcome with enough context to report it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryReport {
    pub identifier: String,
    pub display_name: String,
    pub developer: String,
    pub outcome: EntryOutcome,
}

/// Result of running a batch, in input order
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub reports: Vec<EntryReport>,
    pub duration: Duration,
}

impl BatchSummary {
    fn count(&self, matches: impl Fn(&EntryOutcome) -> bool) -> usize {
        self.reports.iter().filter(|r| matches(&r.outcome)).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, EntryOutcome::Succeeded { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, EntryOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, EntryOutcome::Failed { .. }))
    }

    pub fn cancelled(&self) -> usize {
        self.count(|o| matches!(o, EntryOutcome::Cancelled))
    }

    /// Artifacts assembled by this batch, excluding ones already on disk
    pub fn new_artifacts(&self) -> impl Iterator<Item = (&EntryReport, &AssembledArtifact)> {
        self.reports.iter().filter_map(|r| match &r.outcome {
            EntryOutcome::Succeeded { artifact } if !artifact.already_present => {
                Some((r, artifact))
            }
            _ => None,
        })
    }

    /// Bytes transferred by this batch
    pub fn bytes_fetched(&self) -> u64 {
        self.new_artifacts().map(|(_, a)| a.bytes_fetched).sum()
    }

    /// True when nothing failed
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn summary(&self) -> String {
        format!(
            "{} succeeded, {} skipped, {} failed, {} cancelled ({} fetched in {:.1}s)",
            self.succeeded(),
            self.skipped(),
            self.failed(),
            self.cancelled(),
            format_bytes(self.bytes_fetched()),
            self.duration.as_secs_f64()
        )
    }
}

/// Format a byte count as a human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let value = bytes as f64;
    if value < KB {
        format!("{} B", bytes)
    } else if value < MB {
        format!("{:.1} KB", value / KB)
    } else if value < GB {
        format!("{:.1} MB", value / MB)
    } else {
        format!("{:.2} GB", value / GB)
    }
}
