//! core
//!
//! Core domain types, schemas, and run-scoped state for modpub.
//!
//! # Modules
//!
//! - [`types`] - Strong types: ModuleIdentity and path escaping
//! - [`manifest`] - Manifest pattern matching and the edit marker
//! - [`descriptor`] - A module version ready to be unpacked and published
//! - [`ledger`] - The publish ledger shared by a whole run
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid identities at construction time
//! - Schemas are strict and self-describing
//! - The ledger is the only shared mutable state of a run

pub mod config;
pub mod descriptor;
pub mod ledger;
pub mod manifest;
pub mod types;
