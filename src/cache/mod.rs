//! cache
//!
//! The local module cache.
//!
//! # Architecture
//!
//! [`ModuleCache`] is the seam between the resolver and the on-disk module
//! cache. The production implementation, [`FsModuleCache`], reads the Go
//! download cache layout:
//!
//! ```text
//! <root>/<escaped path>/@v/<version>.mod
//! <root>/<escaped path>/@v/<version>.zip
//! ```
//!
//! A module is considered cached only when both files are present.
//!
//! The cache is shared with the `go` tool and other processes. Writes
//! replace the `.mod` file only, never the archive.
//!
//! # Modules
//!
//! - [`archive`]: Unpacking module zips into scratch directories
//! - [`mock`]: In-memory cache for deterministic testing

pub mod archive;
pub mod mock;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::core::descriptor::ModuleDescriptor;
use crate::core::types::ModuleIdentity;

pub use archive::unpack_module;

/// Errors from cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error at '{path}': {message}")]
    Io { path: PathBuf, message: String },

    #[error("invalid module archive '{path}': {message}")]
    Archive { path: PathBuf, message: String },

    #[error("unsafe path in archive entry: {0}")]
    UnsafeEntry(String),
}

/// Read/write access to cached module versions.
pub trait ModuleCache: Send + Sync {
    /// Look up a cached module version.
    ///
    /// Returns `Ok(None)` when the module is not cached.
    fn lookup(&self, id: &ModuleIdentity) -> Result<Option<ModuleDescriptor>, CacheError>;

    /// Replace the cached manifest of a module version.
    fn write_manifest(&self, id: &ModuleIdentity, manifest: &[u8]) -> Result<(), CacheError>;
}

/// Go download cache on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsModuleCache {
    root: PathBuf,
}

impl FsModuleCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default cache root.
    ///
    /// `$GOMODCACHE/cache/download`, else `$GOPATH/pkg/mod/cache/download`
    /// (first `GOPATH` entry), else `~/go/pkg/mod/cache/download`.
    pub fn default_root() -> Option<PathBuf> {
        if let Some(modcache) = non_empty_env("GOMODCACHE") {
            return Some(PathBuf::from(modcache).join("cache").join("download"));
        }
        let gopath = match non_empty_env("GOPATH") {
            Some(gopath) => std::env::split_paths(&gopath).next()?,
            None => dirs::home_dir()?.join("go"),
        };
        Some(gopath.join("pkg").join("mod").join("cache").join("download"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn version_dir(&self, id: &ModuleIdentity) -> PathBuf {
        self.root.join(id.escaped_path()).join("@v")
    }

    /// Path of the cached manifest.
    pub fn mod_path(&self, id: &ModuleIdentity) -> PathBuf {
        self.version_dir(id).join(format!("{}.mod", id.version()))
    }

    /// Path of the cached archive.
    pub fn zip_path(&self, id: &ModuleIdentity) -> PathBuf {
        self.version_dir(id).join(format!("{}.zip", id.version()))
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn io_err(path: &Path, e: io::Error) -> CacheError {
    CacheError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

impl ModuleCache for FsModuleCache {
    fn lookup(&self, id: &ModuleIdentity) -> Result<Option<ModuleDescriptor>, CacheError> {
        let mod_path = self.mod_path(id);
        let zip_path = self.zip_path(id);
        if !zip_path.is_file() {
            debug!(module = %id, "not cached");
            return Ok(None);
        }
        let manifest = match fs::read(&mod_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(module = %id, "archive cached without manifest");
                return Ok(None);
            }
            Err(e) => return Err(io_err(&mod_path, e)),
        };
        Ok(Some(ModuleDescriptor::from_manifest(
            id.clone(),
            manifest,
            zip_path,
        )))
    }

    fn write_manifest(&self, id: &ModuleIdentity, manifest: &[u8]) -> Result<(), CacheError> {
        let path = self.mod_path(id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }

        // The go tool stores cache files read-only.
        let readonly = match fs::metadata(&path) {
            Ok(meta) if meta.permissions().readonly() => {
                let mut perms = meta.permissions();
                #[allow(clippy::permissions_set_readonly_false)]
                perms.set_readonly(false);
                fs::set_permissions(&path, perms).map_err(|e| io_err(&path, e))?;
                true
            }
            _ => false,
        };

        let result = fs::write(&path, manifest).map_err(|e| io_err(&path, e));

        if readonly {
            if let Ok(meta) = fs::metadata(&path) {
                let mut perms = meta.permissions();
                perms.set_readonly(true);
                fs::set_permissions(&path, perms).map_err(|e| io_err(&path, e))?;
            }
        }
        if result.is_ok() {
            debug!(module = %id, path = %path.display(), "wrote cached manifest");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn id(s: &str) -> ModuleIdentity {
        s.parse().unwrap()
    }

    fn seed(cache: &FsModuleCache, m: &ModuleIdentity, manifest: &str) {
        fs::create_dir_all(cache.mod_path(m).parent().unwrap()).unwrap();
        fs::write(cache.mod_path(m), manifest).unwrap();
        fs::write(cache.zip_path(m), b"zip").unwrap();
    }

    #[test]
    fn layout_uses_escaped_paths() {
        let cache = FsModuleCache::new("/c");
        let m = id("github.com/Azure/sdk@v1.0.0");
        assert_eq!(
            cache.mod_path(&m),
            PathBuf::from("/c/github.com/!azure/sdk/@v/v1.0.0.mod")
        );
        assert_eq!(
            cache.zip_path(&m),
            PathBuf::from("/c/github.com/!azure/sdk/@v/v1.0.0.zip")
        );
    }

    #[test]
    fn lookup_missing_is_none() {
        let tmp = TempDir::new().unwrap();
        let cache = FsModuleCache::new(tmp.path());
        assert!(cache.lookup(&id("example.com/a@v1.0.0")).unwrap().is_none());
    }

    #[test]
    fn lookup_needs_both_files() {
        let tmp = TempDir::new().unwrap();
        let cache = FsModuleCache::new(tmp.path());
        let m = id("example.com/a@v1.0.0");
        seed(&cache, &m, "module example.com/a\n");
        fs::remove_file(cache.zip_path(&m)).unwrap();
        assert!(cache.lookup(&m).unwrap().is_none());
    }

    #[test]
    fn lookup_loads_descriptor() {
        let tmp = TempDir::new().unwrap();
        let cache = FsModuleCache::new(tmp.path());
        let m = id("example.com/a@v1.0.0");
        seed(
            &cache,
            &m,
            "module example.com/a\n\nrequire example.com/b v0.1.0\n",
        );
        let d = cache.lookup(&m).unwrap().unwrap();
        assert_eq!(d.identity(), &m);
        assert_eq!(d.archive(), cache.zip_path(&m));
        assert_eq!(d.declared(), &[id("example.com/b@v0.1.0")]);
    }

    #[test]
    fn write_manifest_replaces_readonly_file() {
        let tmp = TempDir::new().unwrap();
        let cache = FsModuleCache::new(tmp.path());
        let m = id("example.com/a@v1.0.0");
        seed(&cache, &m, "module example.com/a\n");
        let mut perms = fs::metadata(cache.mod_path(&m)).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(cache.mod_path(&m), perms).unwrap();

        cache.write_manifest(&m, b"rewritten").unwrap();
        assert_eq!(fs::read(cache.mod_path(&m)).unwrap(), b"rewritten");
        assert!(fs::metadata(cache.mod_path(&m))
            .unwrap()
            .permissions()
            .readonly());
    }
}
