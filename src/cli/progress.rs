//! Terminal progress helpers
//!
//! Spinners and bars are drawn on stderr only when it is a terminal; otherwise
//! hidden bars are returned so callers never need to branch.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Whether progress output would reach a terminal
pub fn is_terminal() -> bool {
    atty::is(atty::Stream::Stderr)
}

/// Spinner for an operation of unknown length
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    if !is_terminal() {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["◐", "◓", "◑", "◒", "●"]),
    );
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

/// Bar counting finished entries; its length grows with each batch
pub fn entry_bar() -> ProgressBar {
    if !is_terminal() {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}
