//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag. The run
//! summary is a single line; failed modules are listed below it.

use std::fmt::Display;

use tracing::Level;

use crate::core::ledger::PublishLedger;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }

    /// Maximum tracing level for this verbosity.
    pub fn log_level(self) -> Level {
        match self {
            Verbosity::Quiet => Level::WARN,
            Verbosity::Normal => Level::INFO,
            Verbosity::Debug => Level::DEBUG,
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Format a list of items.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Modules the run abandoned, including those that failed before
/// resolution started (cache, repository or download errors).
pub fn failed_modules(ledger: &PublishLedger) -> Vec<String> {
    ledger.failed().iter().map(ToString::to_string).collect()
}

/// Render the end-of-run report.
pub fn format_summary(ledger: &PublishLedger) -> String {
    let summary = ledger.summary();
    let failed = failed_modules(ledger);
    if failed.is_empty() {
        format!("Done: {}", summary)
    } else {
        format!(
            "Done: {}\nFailed modules:\n{}",
            summary,
            format_list(&failed, "  ")
        )
    }
}

/// Print the end-of-run report.
///
/// Failures are shown even in quiet mode.
pub fn summary(ledger: &PublishLedger, verbosity: Verbosity) {
    let report = format_summary(ledger);
    if ledger.summary().is_clean() {
        print(report, verbosity);
    } else {
        eprintln!("{}", report);
    }
}
