//! engine::project
//!
//! Publishing every dependency of the user's project.
//!
//! The project itself is never published. Its manifest is created with
//! `init` when missing; when it declares nothing, `tidy` populates it for
//! the duration of the run and a [`ManifestGuard`] puts the previous content
//! back afterwards, on every exit path.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::resolve::{ResolveError, Resolver, Walk};
use crate::core::types::ModuleIdentity;
use crate::tool::ResolutionRoot;

/// Restores a manifest's content when dropped.
#[derive(Debug)]
pub struct ManifestGuard {
    path: PathBuf,
    original: Vec<u8>,
    armed: bool,
}

impl ManifestGuard {
    /// Remember the current content of `path`.
    pub fn arm(path: impl Into<PathBuf>, original: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            original,
            armed: true,
        }
    }

    /// Keep whatever the file contains now.
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ManifestGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        debug!(path = %self.path.display(), "restoring project manifest");
        if let Err(e) = fs::write(&self.path, &self.original) {
            warn!("Failed to restore {}: {}", self.path.display(), e);
        }
    }
}

fn project_io(path: &Path, e: io::Error) -> ResolveError {
    ResolveError::ProjectIo {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// Resolve and publish every module in the project's graph.
///
/// # Errors
///
/// Fails when the project manifest cannot be created, read or populated,
/// or when its graph cannot be extracted. Failures of individual
/// dependencies are counted in the ledger instead.
pub async fn publish_project_deps(
    resolver: &Resolver<'_>,
    project_dir: &Path,
) -> Result<Walk, ResolveError> {
    let root = ResolutionRoot::for_project(project_dir);
    let manifest_path = root.manifest_path();
    let tool = resolver.tool();

    if !manifest_path.exists() {
        info!("No go.mod in {}, running go mod init", project_dir.display());
        tool.init(&root, None, resolver.patterns().marker())
            .map_err(ResolveError::ProjectInit)?;
    }

    let manifest = fs::read(&manifest_path).map_err(|e| project_io(&manifest_path, e))?;
    let _guard = if resolver.patterns().is_non_empty(&manifest) {
        debug!("project manifest declares requirements");
        None
    } else {
        debug!("project manifest is empty, running go mod tidy");
        let guard = ManifestGuard::arm(&manifest_path, manifest);
        tool.tidy(&root).map_err(ResolveError::ProjectTool)?;
        Some(guard)
    };

    let edges = tool.graph(&root).map_err(ResolveError::ProjectTool)?;
    let targets: Vec<ModuleIdentity> = edges.into_iter().map(|e| e.to).collect();
    info!(
        "Resolving {} modules for {}",
        targets.len(),
        project_dir.display()
    );

    Ok(resolver.resolve_all(&targets).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn guard_restores_on_drop() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("go.mod");
        fs::write(&path, "module p\n").unwrap();
        {
            let _guard = ManifestGuard::arm(&path, b"module p\n".to_vec());
            fs::write(&path, "module p\n\nrequire x v1.0.0\n").unwrap();
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "module p\n");
    }

    #[test]
    fn disarmed_guard_keeps_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("go.mod");
        let guard = ManifestGuard::arm(&path, b"old".to_vec());
        fs::write(&path, "new").unwrap();
        guard.disarm();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }
}
