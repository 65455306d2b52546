//! repository
//!
//! Abstraction for the upstream artifact repository modules are published to.
//!
//! # Architecture
//!
//! The `Repository` trait defines the three primitives the resolver needs:
//! publish a module version, fetch the manifest the repository already
//! serves, and check whether a module version exists. Commands use the
//! [`create_repository`] factory rather than naming an implementation.
//!
//! Repository failures never abort a run: each one is local to the module
//! being handled.
//!
//! # Modules
//!
//! - `traits`: Core `Repository` trait and request/error types
//! - [`artifactory`]: Artifactory implementation over HTTP
//! - [`mock`]: Mock implementation for deterministic testing
//! - `factory`: Repository selection and creation

pub mod artifactory;
mod factory;
pub mod mock;
mod traits;

pub use artifactory::{ArtifactoryRepository, Credentials};
pub use factory::{create_repository, valid_repository_names, RepositoryProvider};
pub use traits::*;
