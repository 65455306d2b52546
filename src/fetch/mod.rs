//! fetch
//!
//! Downloading module versions that are missing from the local cache.
//!
//! # Architecture
//!
//! A [`Downloader`] fetches one module version into the local cache and
//! returns its descriptor. The resolver picks the [`DownloadSource`]: the
//! target repository when it already serves the module (so the copy the
//! repository holds is reused), otherwise the upstream source.
//!
//! # Modules
//!
//! - [`go`]: `go mod download -json` implementation
//! - [`mock`]: Scriptable implementation for deterministic testing

pub mod go;
pub mod mock;

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::core::descriptor::ModuleDescriptor;
use crate::core::types::ModuleIdentity;
use crate::tool::ToolError;

pub use go::GoDownloader;

/// Where a module version is downloaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DownloadSource {
    /// The target repository's module proxy.
    Repository,
    /// The configured upstream proxy or VCS.
    Upstream,
}

impl fmt::Display for DownloadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadSource::Repository => write!(f, "repository"),
            DownloadSource::Upstream => write!(f, "upstream"),
        }
    }
}

/// Errors from downloading a module version.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("repository cannot serve modules for download")]
    NoRepositoryProxy,

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("failed to download {module} from {source_kind}: {message}")]
    Download {
        module: ModuleIdentity,
        source_kind: DownloadSource,
        message: String,
    },

    #[error("unexpected download output for {module}: {message}")]
    InvalidOutput {
        module: ModuleIdentity,
        message: String,
    },

    #[error("failed to read '{path}': {message}")]
    Io { path: PathBuf, message: String },
}

/// Fetches module versions into the local cache.
pub trait Downloader: Send + Sync {
    /// Download `id` from `source` and load it.
    fn download(
        &self,
        id: &ModuleIdentity,
        source: DownloadSource,
    ) -> Result<ModuleDescriptor, FetchError>;
}
