//! shmupfetch library
//!
//! Discovers arcade shoot-'em-up ROM sets on a remote catalog site, reconciles
//! them against a local collection and downloads the missing sets with
//! retrying, size verification and atomic placement.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
