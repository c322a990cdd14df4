//! Core application logic for shmupfetch
//!
//! This module contains the fetch-and-reconcile pipeline: the remote catalog
//! client, the catalog store, the local inventory scanner, reconciliation, the
//! download orchestrator and the batch runner that drives it.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use shmupfetch::app::{
//!     CatalogClient, CatalogConfig, ClientConfig, HttpHandler, JsonFileStore, RetryPolicy,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = Arc::new(HttpHandler::from_config(&ClientConfig::default())?);
//! let store = Arc::new(JsonFileStore::open("catalog.json").await?);
//! let client = CatalogClient::new(
//!     transport,
//!     store,
//!     CatalogConfig::default(),
//!     RetryPolicy::default(),
//! );
//!
//! let report = client.list_games("cave").await?;
//! for entry in &report.entries {
//!     println!("{} ({})", entry.display_name, entry.identifier);
//! }
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod client;
pub mod download;
pub mod inventory;
pub mod models;
pub mod pipeline;
pub mod reconcile;
pub mod records;
pub mod retry;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main public API
pub use batch::{BatchRunner, BatchSummary, EntryOutcome, EntryReport, SignalHandler};
pub use client::{
    base_identifier, clean_title, display_name, CatalogClient, CatalogConfig, CatalogFilter,
    ClientConfig, HttpHandler, ListingReport, Transport,
};
pub use download::{DownloadConfig, DownloadOrchestrator, DownloadPlan};
pub use inventory::{extract_identifier, InventoryReport, InventoryScanner};
pub use models::{AssembledArtifact, CatalogEntry, FilePart, LocalRomRecord, PartRole};
pub use pipeline::{DeveloperRun, FetchOptions, Pipeline, SurveyReport};
pub use reconcile::{reconcile, Possession, ReconciliationResult};
pub use records::{GameRecord, Orientation, OrientationPolicy, RecordSink, VecSink};
pub use retry::RetryPolicy;
pub use store::{CatalogStore, JsonFileStore, MemoryStore};
