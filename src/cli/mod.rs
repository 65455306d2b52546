//! cli
//!
//! Command-line interface layer for modpub.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install the tracing subscriber
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to the
//! [`crate::engine`] for execution. Every module-level failure is counted in
//! the run summary; a run with failures exits non-zero.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result};

use crate::ui::output::Verbosity;

/// Execution context shared by command handlers.
#[derive(Debug, Clone)]
pub struct Context {
    /// Directory the command runs in
    pub cwd: PathBuf,
    /// Output verbosity
    pub verbosity: Verbosity,
}

/// Install the stderr subscriber for `verbosity`.
///
/// A second call in the same process keeps the first subscriber.
pub fn init_logging(verbosity: Verbosity) {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(verbosity.log_level())
        .with_target(false)
        .try_init();
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse_args();
    let verbosity = Verbosity::from_flags(cli.quiet, cli.debug);
    init_logging(verbosity);

    let cwd = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("cannot determine the working directory")?,
    };
    let ctx = Context { cwd, verbosity };

    commands::dispatch(cli.command, &ctx)
}
