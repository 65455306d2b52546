//! modpub - Publish Go module dependency graphs to an artifact repository
//!
//! modpub walks the dependency graph of a Go module (or of a whole project),
//! settles each module's manifest, and publishes every module version once
//! to a Go repository on an artifact server.
//!
//! # Architecture
//!
//! The codebase follows a layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Resolution state machine, walk driver and project flow
//! - [`core`] - Domain types, manifests, the publish ledger and config
//! - [`cache`] - The local module download cache
//! - [`fetch`] - Downloading modules from the repository or upstream
//! - [`tool`] - Running `go mod` in an explicit directory
//! - [`repository`] - Abstraction for the artifact repository (Artifactory v1)
//! - [`ui`] - User-facing output
//!
//! # Correctness Invariants
//!
//! modpub maintains the following invariants:
//!
//! 1. Every module version is resolved and published at most once per run
//! 2. Manifests the run edits carry exactly one marker line
//! 3. Cached manifests are restored unless overwriting was requested
//! 4. Scratch directories are removed on every exit path

pub mod cache;
pub mod cli;
pub mod core;
pub mod engine;
pub mod fetch;
pub mod repository;
pub mod tool;
pub mod ui;
