//! core::types
//!
//! Strong types for module identities.
//!
//! # Types
//!
//! - [`ModuleIdentity`] - Validated `(path, version)` pair naming one module version
//!
//! # Validation
//!
//! Identities are validated at construction time. A path must be non-empty,
//! contain no whitespace and no `@`; a version must start with `v`.
//!
//! # Case Escaping
//!
//! The Go module cache and the GOPROXY protocol store paths in a
//! case-insensitive-safe form where every uppercase letter `X` becomes `!x`.
//! [`escape_path`] produces that form.
//!
//! # Examples
//!
//! ```
//! use modpub::core::types::ModuleIdentity;
//!
//! let id: ModuleIdentity = "github.com/BurntSushi/toml@v1.2.0".parse().unwrap();
//! assert_eq!(id.path(), "github.com/BurntSushi/toml");
//! assert_eq!(id.version(), "v1.2.0");
//! assert_eq!(id.escaped_path(), "github.com/!burnt!sushi/toml");
//!
//! assert!("no-version".parse::<ModuleIdentity>().is_err());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid module path: {0}")]
    InvalidModulePath(String),

    #[error("invalid module version: {0}")]
    InvalidVersion(String),

    #[error("invalid module identity '{0}', expected <path>@<version>")]
    InvalidIdentity(String),
}

/// A validated module identity: the canonical ledger key.
///
/// Two identities are equal when both path and version are equal. The path
/// is stored unescaped (with its original case).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModuleIdentity {
    path: String,
    version: String,
}

impl ModuleIdentity {
    /// Create a new validated identity.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidModulePath` or `TypeError::InvalidVersion`
    /// if either part is malformed.
    pub fn new(path: impl Into<String>, version: impl Into<String>) -> Result<Self, TypeError> {
        let path = path.into();
        let version = version.into();
        Self::validate_path(&path)?;
        Self::validate_version(&version)?;
        Ok(Self { path, version })
    }

    fn validate_path(path: &str) -> Result<(), TypeError> {
        if path.is_empty() {
            return Err(TypeError::InvalidModulePath(
                "module path cannot be empty".into(),
            ));
        }
        if path.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(TypeError::InvalidModulePath(format!(
                "'{}' contains whitespace",
                path
            )));
        }
        if path.contains('@') {
            return Err(TypeError::InvalidModulePath(format!(
                "'{}' contains '@'",
                path
            )));
        }
        if path.starts_with('/') || path.ends_with('/') || path.contains("//") {
            return Err(TypeError::InvalidModulePath(format!(
                "'{}' has an empty path element",
                path
            )));
        }
        if path.split('/').any(|elem| elem == "." || elem == "..") {
            return Err(TypeError::InvalidModulePath(format!(
                "'{}' contains a relative path element",
                path
            )));
        }
        Ok(())
    }

    fn validate_version(version: &str) -> Result<(), TypeError> {
        if !version.starts_with('v') || version.len() < 2 {
            return Err(TypeError::InvalidVersion(format!(
                "'{}' must look like v<major>.<minor>.<patch>",
                version
            )));
        }
        if version
            .chars()
            .any(|c| c.is_whitespace() || c == '/' || c == '@')
        {
            return Err(TypeError::InvalidVersion(format!(
                "'{}' contains an illegal character",
                version
            )));
        }
        Ok(())
    }

    /// The module path, unescaped.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The module version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The module path in cache-escaped form.
    pub fn escaped_path(&self) -> String {
        escape_path(&self.path)
    }

    /// Directory name a module archive unpacks to: `<path>@<version>`.
    pub fn archive_prefix(&self) -> String {
        format!("{}@{}", self.path, self.version)
    }
}

impl fmt::Display for ModuleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.path, self.version)
    }
}

impl FromStr for ModuleIdentity {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (path, version) = s
            .trim()
            .rsplit_once('@')
            .ok_or_else(|| TypeError::InvalidIdentity(s.to_string()))?;
        Self::new(path, version)
    }
}

impl TryFrom<String> for ModuleIdentity {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ModuleIdentity> for String {
    fn from(id: ModuleIdentity) -> Self {
        id.to_string()
    }
}

/// Escape a module path for the cache: `A` becomes `!a`.
pub fn escape_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        if c.is_ascii_uppercase() {
            out.push('!');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
