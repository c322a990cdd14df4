//! Prelude module for the shmupfetch library
//!
//! Re-exports the items needed to assemble and run the pipeline with a single
//! `use shmupfetch::prelude::*;`.

// Core result types
pub use crate::errors::{AppError, Result};

// Pipeline components
pub use crate::app::{
    reconcile, BatchRunner, BatchSummary, CatalogClient, CatalogConfig, CatalogEntry,
    CatalogStore, ClientConfig, DownloadConfig, DownloadOrchestrator, FetchOptions, GameRecord,
    HttpHandler, InventoryScanner, JsonFileStore, MemoryStore, Pipeline, RecordSink, RetryPolicy,
    Transport,
};

pub use crate::config::AppConfig;

// Commonly used constants
pub use crate::constants::{DEFAULT_WORKER_COUNT, MAX_WORKER_COUNT, USER_AGENT};

pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;
