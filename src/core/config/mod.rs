//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! modpub has two configuration scopes:
//! - **Global**: User-level settings (repository server, credentials)
//! - **Project**: Per-project overrides
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Project config file
//! 4. Environment (`MODPUB_ACCESS_TOKEN`)
//! 5. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$MODPUB_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/modpub/config.toml`
//! 3. `~/.modpub/config.toml`
//!
//! # Project Config Location
//!
//! `<project>/.modpub.toml`
//!
//! # Example
//!
//! ```no_run
//! use modpub::core::config::Config;
//! use std::path::Path;
//!
//! let result = Config::load(Some(Path::new("/path/to/project"))).unwrap();
//! let config = result.config;
//!
//! println!("Edit message: {}", config.edit_message());
//! if let Some(url) = config.repository_url() {
//!     println!("Publishing to {}", url);
//! }
//! ```

pub mod schema;

pub use schema::{FileConfig, RepositorySection, ResolveSection};

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::cache::FsModuleCache;
use crate::core::manifest::DEFAULT_EDIT_MESSAGE;
use crate::repository::Credentials;

/// Environment variable overriding the access token.
pub const ACCESS_TOKEN_ENV: &str = "MODPUB_ACCESS_TOKEN";

/// File name of the project config.
pub const PROJECT_CONFIG_FILE: &str = ".modpub.toml";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("no repository url configured; set [repository] url in {0}")]
    MissingRepositoryUrl(String),

    #[error("no module cache directory found; set [resolve] cache_dir")]
    NoCacheDir,
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// The warning message.
    pub message: String,
    /// The path that triggered the warning.
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

/// Merged configuration from all sources.
///
/// Accessors apply precedence and defaults.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global and project files merged
    merged: FileConfig,
    /// Token from the environment, if set
    env_token: Option<String>,
    /// Path to the global config file (if loaded)
    global_path: Option<PathBuf>,
    /// Path to the project config file (if loaded)
    project_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `project_dir` is provided, also loads the project config.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed.
    /// Missing config files are not an error (defaults are used).
    pub fn load(project_dir: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        let global_path = Self::find_global();
        let mut result = Self::load_from(global_path.as_deref(), project_dir)?;
        result.config.env_token = std::env::var(ACCESS_TOKEN_ENV)
            .ok()
            .filter(|t| !t.is_empty());
        Ok(result)
    }

    /// Load from an explicit global file and project directory.
    ///
    /// The environment is not consulted.
    pub fn load_from(
        global_path: Option<&Path>,
        project_dir: Option<&Path>,
    ) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();

        let global = match global_path {
            Some(path) if path.exists() => Some(Self::read_config(path)?),
            _ => None,
        };

        let project_path = project_dir
            .map(|dir| dir.join(PROJECT_CONFIG_FILE))
            .filter(|p| p.exists());
        let project = match &project_path {
            Some(path) => {
                let config = Self::read_config(path)?;
                if config.repository.as_ref().is_some_and(|r| r.has_secret()) {
                    warnings.push(ConfigWarning {
                        message: "Project config contains credentials; prefer the global config or MODPUB_ACCESS_TOKEN".to_string(),
                        path: path.clone(),
                    });
                }
                Some(config)
            }
            None => None,
        };

        let merged = match (global.clone(), &project) {
            (Some(g), Some(p)) => g.merged_with(p),
            (Some(g), None) => g,
            (None, Some(p)) => p.clone(),
            (None, None) => FileConfig::default(),
        };
        merged.validate()?;

        Ok(ConfigLoadResult {
            config: Config {
                merged,
                env_token: None,
                global_path: global.and(global_path.map(Path::to_path_buf)),
                project_path,
            },
            warnings,
        })
    }

    /// Locate the global config file.
    fn find_global() -> Option<PathBuf> {
        // 1. Check $MODPUB_CONFIG
        if let Ok(path) = std::env::var("MODPUB_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Check $XDG_CONFIG_HOME/modpub/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("modpub/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        // 3. Check ~/.modpub/config.toml
        let path = dirs::home_dir()?.join(".modpub/config.toml");
        path.exists().then_some(path)
    }

    fn read_config(path: &Path) -> Result<FileConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Build a config from an in-memory file, for tests and embedding.
    pub fn from_file_config(merged: FileConfig) -> Result<Self, ConfigError> {
        merged.validate()?;
        Ok(Self {
            merged,
            ..Default::default()
        })
    }

    /// Override the access token, as `MODPUB_ACCESS_TOKEN` does.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.env_token = Some(token.into());
        self
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    fn repository(&self) -> Option<&RepositorySection> {
        self.merged.repository.as_ref()
    }

    fn resolve(&self) -> Option<&ResolveSection> {
        self.merged.resolve.as_ref()
    }

    /// Repository server URL, if configured.
    pub fn repository_url(&self) -> Option<&str> {
        self.repository().and_then(|r| r.url.as_deref())
    }

    /// Repository server URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingRepositoryUrl` if not configured.
    pub fn require_repository_url(&self) -> Result<&str, ConfigError> {
        self.repository_url().ok_or_else(|| {
            ConfigError::MissingRepositoryUrl(
                self.global_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "~/.modpub/config.toml".to_string()),
            )
        })
    }

    /// Repository provider name, if configured.
    pub fn repository_provider(&self) -> Option<&str> {
        self.repository().and_then(|r| r.provider.as_deref())
    }

    /// Credentials for the repository.
    ///
    /// An access token (environment first, then config) wins over a
    /// user/password pair. Anonymous when nothing is configured.
    pub fn credentials(&self) -> Credentials {
        let user = self.repository().and_then(|r| r.user.clone());
        let token = self
            .env_token
            .clone()
            .or_else(|| self.repository().and_then(|r| r.access_token.clone()));
        if let Some(token) = token {
            return Credentials::AccessToken { user, token };
        }
        match (user, self.repository().and_then(|r| r.password.clone())) {
            (Some(user), Some(password)) => Credentials::Basic { user, password },
            _ => Credentials::Anonymous,
        }
    }

    /// Marker comment for edited manifests.
    ///
    /// Defaults to `// Generated by modpub`.
    pub fn edit_message(&self) -> &str {
        self.resolve()
            .and_then(|r| r.edit_message.as_deref())
            .unwrap_or(DEFAULT_EDIT_MESSAGE)
    }

    /// Whether tidied manifests stay in the cache.
    ///
    /// Defaults to `false`.
    pub fn overwrite_cache(&self) -> bool {
        self.resolve()
            .and_then(|r| r.overwrite_cache)
            .unwrap_or(false)
    }

    /// Configured module cache (`GOMODCACHE`), if any.
    pub fn module_cache(&self) -> Option<&Path> {
        self.resolve().and_then(|r| r.cache_dir.as_deref())
    }

    /// Download cache root: `<module cache>/cache/download`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NoCacheDir` if nothing is configured and no
    /// default location can be derived.
    pub fn cache_dir(&self) -> Result<PathBuf, ConfigError> {
        match self.module_cache() {
            Some(dir) => Ok(dir.join("cache").join("download")),
            None => FsModuleCache::default_root().ok_or(ConfigError::NoCacheDir),
        }
    }

    /// Parent of scratch directories, if configured.
    pub fn scratch_dir(&self) -> Option<&Path> {
        self.resolve().and_then(|r| r.scratch_dir.as_deref())
    }

    /// The `go` binary.
    ///
    /// Defaults to `go` on the `PATH`.
    pub fn go_binary(&self) -> PathBuf {
        self.resolve()
            .and_then(|r| r.go_binary.clone())
            .unwrap_or_else(|| PathBuf::from("go"))
    }

    /// GOPROXY value for upstream downloads, if configured.
    pub fn upstream_proxy(&self) -> Option<&str> {
        self.resolve().and_then(|r| r.upstream_proxy.as_deref())
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Get the path to the loaded project config file.
    pub fn project_config_loaded_from(&self) -> Option<&Path> {
        self.project_path.as_deref()
    }
}
