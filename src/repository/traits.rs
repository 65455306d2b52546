//! repository::traits
//!
//! Repository trait definition for the upstream artifact repository.
//!
//! # Design
//!
//! The `Repository` trait is async because every operation involves network
//! I/O. All methods return `Result` so a failure stays local to the module
//! being handled; no method retries, retry policy belongs to the caller.
//!
//! # Example
//!
//! ```ignore
//! use modpub::repository::{PublishRequest, Repository};
//!
//! async fn publish_one(repo: &dyn Repository, request: PublishRequest) {
//!     if !repo.exists(&request.identity, &request.target_repo).await? {
//!         repo.publish(request).await?;
//!     }
//! }
//! ```

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::types::ModuleIdentity;

/// Errors from repository operations.
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    /// Authentication is required but not configured.
    #[error("authentication required")]
    AuthRequired,

    /// Authentication failed (bad credentials, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested artifact or repository was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The repository returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the repository
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),

    /// A local file needed for the request could not be read.
    #[error("failed to read '{path}': {message}")]
    LocalIo {
        /// The file that could not be read
        path: PathBuf,
        /// The underlying error
        message: String,
    },
}

/// Everything needed to publish one module version.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    /// Module being published
    pub identity: ModuleIdentity,
    /// Manifest content to publish as `<version>.mod`
    pub manifest: Vec<u8>,
    /// Module archive to publish as `<version>.zip`
    pub archive: PathBuf,
    /// Name of the target repository
    pub target_repo: String,
    /// Progress label, e.g. `"3/10"`
    pub progress_label: String,
}

/// The upstream artifact repository.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`.
///
/// # Error Handling
///
/// Callers treat every error as local to one module: it is logged, counted
/// as a failure, and the walk continues with the next module.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Repository kind (e.g., "artifactory").
    fn name(&self) -> &'static str;

    /// Upload archive, manifest and version info for one module version.
    ///
    /// # Errors
    ///
    /// - `AuthFailed` if the credentials may not deploy to `target_repo`
    /// - `NetworkError` on transport failure
    /// - `LocalIo` if the archive cannot be read
    async fn publish(&self, request: PublishRequest) -> Result<(), RepositoryError>;

    /// Fetch the manifest the repository already serves for a module.
    ///
    /// # Returns
    ///
    /// `Some(bytes)` when the repository has the module, `None` when it
    /// doesn't.
    async fn fetch_published_manifest(
        &self,
        id: &ModuleIdentity,
        target_repo: &str,
    ) -> Result<Option<Vec<u8>>, RepositoryError>;

    /// Check whether the repository already has a module version.
    async fn exists(&self, id: &ModuleIdentity, target_repo: &str)
        -> Result<bool, RepositoryError>;

    /// GOPROXY URL serving `target_repo`, used to download reusable copies.
    ///
    /// `None` when the repository cannot act as a module proxy.
    fn proxy_url(&self, target_repo: &str) -> Option<String>;
}
