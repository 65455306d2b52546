//! core::descriptor
//!
//! The in-memory view of one module version: identity, manifest, archive.
//!
//! The manifest is the only mutable part. The archive path and the declared
//! requirements are fixed when the descriptor is loaded; rewriting the
//! manifest later (after `tidy`, or when restoring the original) does not
//! change what the module declared when it was first seen.

use std::path::{Path, PathBuf};

use tracing::info;

use super::manifest::declared_requirements;
use super::types::ModuleIdentity;
use crate::repository::{PublishRequest, Repository, RepositoryError};

/// One module version as loaded from the cache or a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    identity: ModuleIdentity,
    manifest: Vec<u8>,
    archive: PathBuf,
    declared: Vec<ModuleIdentity>,
}

impl ModuleDescriptor {
    /// Construct a descriptor from its parts.
    pub fn load(
        identity: ModuleIdentity,
        manifest: Vec<u8>,
        archive: impl Into<PathBuf>,
        declared: Vec<ModuleIdentity>,
    ) -> Self {
        Self {
            identity,
            manifest,
            archive: archive.into(),
            declared,
        }
    }

    /// Construct a descriptor, reading the declared requirements from the
    /// manifest itself.
    pub fn from_manifest(
        identity: ModuleIdentity,
        manifest: Vec<u8>,
        archive: impl Into<PathBuf>,
    ) -> Self {
        let declared = declared_requirements(&manifest);
        Self::load(identity, manifest, archive, declared)
    }

    pub fn identity(&self) -> &ModuleIdentity {
        &self.identity
    }

    pub fn manifest(&self) -> &[u8] {
        &self.manifest
    }

    pub fn archive(&self) -> &Path {
        &self.archive
    }

    /// Requirements declared by the manifest at load time.
    pub fn declared(&self) -> &[ModuleIdentity] {
        &self.declared
    }

    /// Replace the manifest content.
    pub fn set_manifest(&mut self, manifest: Vec<u8>) {
        self.manifest = manifest;
    }

    /// Upload this module version to `target_repo`.
    ///
    /// The transport error is returned as-is; there is no retry.
    pub async fn publish(
        &self,
        progress_label: &str,
        target_repo: &str,
        publisher: &dyn Repository,
    ) -> Result<(), RepositoryError> {
        info!(
            "Publishing: {} to {}:{}",
            self.identity, target_repo, progress_label
        );
        publisher
            .publish(PublishRequest {
                identity: self.identity.clone(),
                manifest: self.manifest.clone(),
                archive: self.archive.clone(),
                target_repo: target_repo.to_string(),
                progress_label: progress_label.to_string(),
            })
            .await
    }
}
