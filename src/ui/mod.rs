//! ui
//!
//! User-facing output.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and display
//!
//! # Design
//!
//! Progress and diagnostics are tracing events on stderr. Results meant for
//! the user (the run summary, generated completions) go through this module
//! so the quiet flag is honored in one place.

pub mod output;
