//! core::config::schema
//!
//! Configuration schema types.
//!
//! The global file and the project file share one schema; values in the
//! project file override the global ones key by key.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$MODPUB_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/modpub/config.toml`
//! 3. `~/.modpub/config.toml`
//!
//! # Project Config
//!
//! Located at `<project>/.modpub.toml`.
//!
//! # Validation
//!
//! Config values are validated after parsing to ensure they conform to
//! expected formats (e.g., the repository URL must be http(s)).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// One configuration file.
///
/// # Example
///
/// ```toml
/// [repository]
/// url = "https://example.jfrog.io/artifactory"
/// user = "ci"
/// access_token = "..."
///
/// [resolve]
/// edit_message = "// Generated by modpub"
/// overwrite_cache = false
/// go_binary = "/usr/local/go/bin/go"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Target repository server
    pub repository: Option<RepositorySection>,

    /// Resolution settings
    pub resolve: Option<ResolveSection>,
}

impl FileConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(repository) = &self.repository {
            repository.validate()?;
        }
        if let Some(resolve) = &self.resolve {
            resolve.validate()?;
        }
        Ok(())
    }

    /// Overlay `other` on top of `self`; keys set in `other` win.
    pub fn merged_with(self, other: &FileConfig) -> FileConfig {
        FileConfig {
            repository: merge_section(self.repository, other.repository.as_ref(), |base, over| {
                RepositorySection {
                    url: over.url.clone().or(base.url),
                    provider: over.provider.clone().or(base.provider),
                    user: over.user.clone().or(base.user),
                    password: over.password.clone().or(base.password),
                    access_token: over.access_token.clone().or(base.access_token),
                }
            }),
            resolve: merge_section(self.resolve, other.resolve.as_ref(), |base, over| {
                ResolveSection {
                    edit_message: over.edit_message.clone().or(base.edit_message),
                    overwrite_cache: over.overwrite_cache.or(base.overwrite_cache),
                    cache_dir: over.cache_dir.clone().or(base.cache_dir),
                    scratch_dir: over.scratch_dir.clone().or(base.scratch_dir),
                    go_binary: over.go_binary.clone().or(base.go_binary),
                    upstream_proxy: over.upstream_proxy.clone().or(base.upstream_proxy),
                }
            }),
        }
    }
}

fn merge_section<T: Clone + Default>(
    base: Option<T>,
    over: Option<&T>,
    merge: impl FnOnce(T, &T) -> T,
) -> Option<T> {
    match (base, over) {
        (None, None) => None,
        (Some(base), None) => Some(base),
        (base, Some(over)) => Some(merge(base.unwrap_or_default(), over)),
    }
}

/// `[repository]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepositorySection {
    /// Server base URL, e.g. `https://example.jfrog.io/artifactory`
    pub url: Option<String>,

    /// Repository provider (default: "artifactory")
    pub provider: Option<String>,

    /// User name
    pub user: Option<String>,

    /// Password or API key
    pub password: Option<String>,

    /// Access token; takes precedence over the password
    pub access_token: Option<String>,
}

impl RepositorySection {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.url {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(ConfigError::InvalidValue(format!(
                    "repository url must start with http:// or https://, got '{}'",
                    url
                )));
            }
        }

        if let Some(provider) = &self.provider {
            let valid = crate::repository::valid_repository_names();
            if !valid.contains(&provider.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid repository provider '{}', must be one of: {}",
                    provider,
                    valid.join(", ")
                )));
            }
        }

        if self.password.is_some() && self.user.is_none() {
            return Err(ConfigError::InvalidValue(
                "repository password requires a user".to_string(),
            ));
        }
        Ok(())
    }

    /// True if the section holds a secret.
    pub fn has_secret(&self) -> bool {
        self.password.is_some() || self.access_token.is_some()
    }
}

/// `[resolve]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ResolveSection {
    /// Marker comment prepended to manifests the tool edits
    pub edit_message: Option<String>,

    /// Keep tidied manifests in the cache
    pub overwrite_cache: Option<bool>,

    /// Module cache root (`GOMODCACHE`)
    pub cache_dir: Option<PathBuf>,

    /// Parent directory for scratch directories
    pub scratch_dir: Option<PathBuf>,

    /// Path of the `go` binary
    pub go_binary: Option<PathBuf>,

    /// GOPROXY value for upstream downloads
    pub upstream_proxy: Option<String>,
}

impl ResolveSection {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(message) = &self.edit_message {
            if !message.trim_start().starts_with("//") {
                return Err(ConfigError::InvalidValue(format!(
                    "edit_message must be a '//' comment, got '{}'",
                    message
                )));
            }
        }
        if let Some(proxy) = &self.upstream_proxy {
            if proxy.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "upstream_proxy cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}
