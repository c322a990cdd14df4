//! Download planning and execution
//!
//! - `plan`: validated, ordered part lists
//! - `orchestrator`: staging, retrying, verifying and placing parts

pub mod orchestrator;
pub mod plan;

pub use orchestrator::{DownloadConfig, DownloadOrchestrator};
pub use plan::DownloadPlan;
