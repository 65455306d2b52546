//! engine::scratch
//!
//! Per-module scratch directories.
//!
//! A scratch directory holds one unpacked module while its manifest is
//! prepared. It is removed when the module is done, whatever the outcome:
//! explicitly through [`ScratchDir::close`], which logs removal errors, or
//! on drop as a fallback.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::{Builder, TempDir};
use tracing::{debug, warn};

use crate::core::types::ModuleIdentity;

/// Subdirectory the module is unpacked into.
const MODULE_DIR: &str = "module";

/// A scratch directory owned by one resolution context.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
    module_dir: PathBuf,
}

impl ScratchDir {
    /// Create a scratch directory under `root`, or the system temp dir.
    pub fn new(root: Option<&Path>, id: &ModuleIdentity) -> io::Result<Self> {
        let mut builder = Builder::new();
        builder.prefix("modpub-");
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        let module_dir = dir.path().join(MODULE_DIR);
        std::fs::create_dir(&module_dir)?;
        debug!(module = %id, path = %dir.path().display(), "created scratch directory");
        Ok(Self { dir, module_dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where the module root lives inside the scratch directory.
    pub fn module_dir(&self) -> &Path {
        &self.module_dir
    }

    /// Remove the directory, logging failures.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            warn!("Failed to remove scratch directory {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_removes_directory() {
        let root = TempDir::new().unwrap();
        let id: ModuleIdentity = "example.com/a@v1.0.0".parse().unwrap();
        let scratch = ScratchDir::new(Some(root.path()), &id).unwrap();
        let path = scratch.path().to_path_buf();
        assert!(scratch.module_dir().is_dir());
        assert!(scratch.module_dir().starts_with(&path));
        scratch.close();
        assert!(!path.exists());
    }

    #[test]
    fn drop_removes_directory() {
        let root = TempDir::new().unwrap();
        let id: ModuleIdentity = "example.com/a@v1.0.0".parse().unwrap();
        let path = {
            let scratch = ScratchDir::new(Some(root.path()), &id).unwrap();
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
