//! repository::factory
//!
//! Repository selection and creation.
//!
//! # Design
//!
//! Commands use `create_repository()` instead of importing a specific
//! repository implementation, so the resolver stays independent of the
//! server it publishes to.
//!
//! # Example
//!
//! ```ignore
//! use modpub::repository::{create_repository, Credentials};
//!
//! let repo = create_repository(
//!     "https://example.jfrog.io/artifactory",
//!     Credentials::Anonymous,
//!     None, // default provider
//! )?;
//! ```

use super::artifactory::{ArtifactoryRepository, Credentials};
use super::traits::{Repository, RepositoryError};

/// Supported repository providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryProvider {
    /// Artifactory Go repositories
    Artifactory,
}

impl RepositoryProvider {
    /// Get all available providers.
    pub fn all() -> &'static [RepositoryProvider] {
        &[RepositoryProvider::Artifactory]
    }

    /// Get the provider name as used in configuration.
    pub fn name(&self) -> &'static str {
        match self {
            RepositoryProvider::Artifactory => "artifactory",
        }
    }

    /// Parse a provider from its configuration name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|p| p.name().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for RepositoryProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Names accepted for the `provider` config key.
pub fn valid_repository_names() -> Vec<&'static str> {
    RepositoryProvider::all().iter().map(|p| p.name()).collect()
}

/// Create a repository client.
///
/// # Errors
///
/// - `NotFound` if `provider` names an unknown provider
/// - `ApiError` if `url` is not an http(s) URL
pub fn create_repository(
    url: &str,
    credentials: Credentials,
    provider: Option<&str>,
) -> Result<Box<dyn Repository>, RepositoryError> {
    let provider = match provider {
        Some(name) => RepositoryProvider::parse(name).ok_or_else(|| {
            RepositoryError::NotFound(format!(
                "unknown repository provider '{}', must be one of: {}",
                name,
                valid_repository_names().join(", ")
            ))
        })?,
        None => RepositoryProvider::Artifactory,
    };

    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(RepositoryError::ApiError {
            status: 0,
            message: format!("repository url must be http(s): '{}'", url),
        });
    }

    match provider {
        RepositoryProvider::Artifactory => {
            Ok(Box::new(ArtifactoryRepository::new(url, credentials)))
        }
    }
}
