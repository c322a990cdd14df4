//! Command-line interface components
//!
//! This module contains CLI-specific code for shmupfetch: argument parsing,
//! command handlers, record output and progress display.

pub mod args;
pub mod commands;
pub mod output;
pub mod progress;

pub use args::{Cli, Commands, FetchArgs, GenerateArgs, GlobalArgs, OutputFormat, ScanArgs};
pub use commands::{handle_developers, handle_fetch, handle_generate, handle_scan};
pub use output::{sink_for, JsonLinesSink, TextSink};
