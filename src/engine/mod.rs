//! engine
//!
//! Orchestrates a run: resolve manifests, walk dependencies, publish.
//!
//! # Architecture
//!
//! The engine is the only layer that combines the collaborators (cache,
//! downloader, module tool, repository) with the publish ledger:
//!
//! 1. **Acquire**: claim an identity in the ledger, load it from the cache
//!    or download it
//! 2. **Prepare**: unpack it into a scratch directory and settle its manifest
//! 3. **Expand**: extract the graph and acquire every new dependency
//! 4. **Descend**: drive each dependency to completion, depth-first
//! 5. **Finish**: restore mutated manifests, publish once, clean up
//!
//! # Invariants
//!
//! - Each identity is resolved by at most one context per run
//! - Each identity is published at most once per run
//! - A failure abandons one branch, never the run
//! - Scratch directories never outlive their context
//! - The process working directory is never changed
//!
//! # Modules
//!
//! - [`resolve`]: The per-module state machine and the walk driver
//! - [`project`]: The project-level entry point
//! - [`scratch`]: Scratch directory guards

pub mod project;
pub mod resolve;
pub mod scratch;

pub use project::{publish_project_deps, ManifestGuard};
pub use resolve::{
    BranchError, Collaborators, ResolutionContext, ResolutionState, ResolveError, ResolveOptions,
    Resolver, Walk,
};
pub use scratch::ScratchDir;
