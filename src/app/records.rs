//! Output records for downstream consumers
//!
//! A [`GameRecord`] is plain data describing one game on disk. How records are
//! rendered is up to the [`RecordSink`] they are handed to.

use std::collections::HashSet;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::app::client::base_identifier;
use crate::app::models::{AssembledArtifact, CatalogEntry};

/// Screen orientation of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Vertical,
    Horizontal,
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Orientation::Vertical => write!(f, "vertical"),
            Orientation::Horizontal => write!(f, "horizontal"),
        }
    }
}

/// Decides orientation from a list of known horizontal games
#[derive(Debug, Clone, Default)]
pub struct OrientationPolicy {
    horizontal: HashSet<String>,
}

impl OrientationPolicy {
    pub fn new<I>(horizontal: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Self {
            horizontal: horizontal
                .into_iter()
                .map(|id| id.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Horizontal if the identifier or its base is listed; vertical otherwise
    pub fn orientation(&self, identifier: &str) -> Orientation {
        let identifier = identifier.to_lowercase();
        if self.horizontal.contains(&identifier)
            || self.horizontal.contains(&base_identifier(&identifier))
        {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        }
    }
}

/// One game ready for a downstream consumer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub identifier: String,
    pub display_name: String,
    pub developer: String,
    pub orientation: Orientation,
    pub files: Vec<PathBuf>,
}

impl GameRecord {
    /// Record for a freshly assembled artifact
    pub fn from_artifact(
        entry: &CatalogEntry,
        artifact: &AssembledArtifact,
        policy: &OrientationPolicy,
    ) -> Self {
        Self {
            identifier: artifact.identifier.clone(),
            display_name: entry.display_name.clone(),
            developer: entry.developer.clone(),
            orientation: policy.orientation(&artifact.identifier),
            files: artifact.files.clone(),
        }
    }
}

/// Consumer of game records
pub trait RecordSink {
    fn emit(&mut self, record: &GameRecord) -> io::Result<()>;

    /// Called once after the last record
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Sink that keeps records in memory
#[derive(Debug, Default)]
pub struct VecSink {
    pub records: Vec<GameRecord>,
}

impl RecordSink for VecSink {
    fn emit(&mut self, record: &GameRecord) -> io::Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// Hand every record to `sink`, then finish it
pub fn emit_all<'a, S>(
    sink: &mut S,
    records: impl IntoIterator<Item = &'a GameRecord>,
) -> io::Result<usize>
where
    S: RecordSink + ?Sized,
{
    let mut count = 0;
    for record in records {
        sink.emit(record)?;
        count += 1;
    }
    sink.finish()?;
    Ok(count)
}
