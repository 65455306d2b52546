//! core::manifest
//!
//! Manifest (`go.mod`) pattern matching.
//!
//! # Overview
//!
//! The resolver only needs to know two things about a manifest's text:
//!
//! - whether it is **non-empty**, i.e. declares at least one requirement.
//!   A manifest the `go` tool synthesized for a pre-modules repository
//!   (`module example.com/x` and nothing else) is empty.
//! - whether it is **tool-edited**, i.e. already carries the marker comment
//!   this tool prepends when it restores an originally empty manifest.
//!
//! Both patterns are compiled once per run. A compilation failure is the
//! only fatal, non branch-local error of a run.
//!
//! # Example
//!
//! ```
//! use modpub::core::manifest::ManifestPatterns;
//!
//! let patterns = ManifestPatterns::new("// Generated by modpub").unwrap();
//! assert!(patterns.is_non_empty(b"module x\n\nrequire y v1.0.0\n"));
//! assert!(!patterns.is_non_empty(b"module x\n"));
//!
//! let marked = patterns.with_marker(b"module x\n");
//! assert!(patterns.is_tool_edited(&marked));
//! assert_eq!(patterns.with_marker(&marked), marked);
//! ```

use regex::Regex;
use thiserror::Error;

use super::types::ModuleIdentity;

/// Pattern matching a line that declares a dependency.
pub const NON_EMPTY_PATTERN: &str = r"^\s*require\s+\S";

/// Marker comment prepended to restored manifests by default.
pub const DEFAULT_EDIT_MESSAGE: &str = "// Generated by modpub";

/// Errors from compiling manifest patterns.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("failed to compile manifest pattern '{pattern}': {source}")]
    Compile {
        pattern: String,
        source: regex::Error,
    },

    #[error("edit message must be a '//' comment, got '{0}'")]
    InvalidMarker(String),
}

/// Compiled manifest patterns.
#[derive(Debug, Clone)]
pub struct ManifestPatterns {
    non_empty: Regex,
    tool_edited: Regex,
    marker: String,
}

impl ManifestPatterns {
    /// Compile the patterns for the given marker comment.
    ///
    /// # Errors
    ///
    /// Returns `PatternError` if the marker is not a line comment or if a
    /// pattern fails to compile.
    pub fn new(marker: &str) -> Result<Self, PatternError> {
        let marker = marker.trim();
        if !marker.starts_with("//") {
            return Err(PatternError::InvalidMarker(marker.to_string()));
        }
        let non_empty = compile(NON_EMPTY_PATTERN)?;
        let tool_edited = compile(&format!(r"^\s*{}", regex::escape(marker)))?;
        Ok(Self {
            non_empty,
            tool_edited,
            marker: marker.to_string(),
        })
    }

    /// The marker comment.
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// True if any line declares a dependency.
    pub fn is_non_empty(&self, manifest: &[u8]) -> bool {
        any_line_matches(&self.non_empty, manifest)
    }

    /// True if the marker comment is already present.
    pub fn is_tool_edited(&self, manifest: &[u8]) -> bool {
        any_line_matches(&self.tool_edited, manifest)
    }

    /// Prefix the manifest with the marker comment unless already present.
    pub fn with_marker(&self, manifest: &[u8]) -> Vec<u8> {
        if self.is_tool_edited(manifest) {
            return manifest.to_vec();
        }
        let mut out = Vec::with_capacity(self.marker.len() + 2 + manifest.len());
        out.extend_from_slice(self.marker.as_bytes());
        out.extend_from_slice(b"\n\n");
        out.extend_from_slice(manifest);
        out
    }
}

fn compile(pattern: &str) -> Result<Regex, PatternError> {
    Regex::new(pattern).map_err(|source| PatternError::Compile {
        pattern: pattern.to_string(),
        source,
    })
}

fn any_line_matches(re: &Regex, manifest: &[u8]) -> bool {
    String::from_utf8_lossy(manifest)
        .lines()
        .any(|line| re.is_match(line))
}

/// Read the requirements a manifest declares.
///
/// Handles both `require path version` and `require ( ... )` blocks.
/// Malformed entries are skipped; comments are ignored.
pub fn declared_requirements(manifest: &[u8]) -> Vec<ModuleIdentity> {
    let text = String::from_utf8_lossy(manifest);
    let mut out = Vec::new();
    let mut in_block = false;

    for raw in text.lines() {
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }
        if in_block {
            if line == ")" {
                in_block = false;
                continue;
            }
            push_requirement(line, &mut out);
            continue;
        }
        let Some(rest) = line.strip_prefix("require") else {
            continue;
        };
        if !rest.starts_with(char::is_whitespace) && !rest.starts_with('(') {
            continue;
        }
        let rest = rest.trim();
        if rest == "(" {
            in_block = true;
        } else {
            push_requirement(rest, &mut out);
        }
    }
    out
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn push_requirement(entry: &str, out: &mut Vec<ModuleIdentity>) {
    let mut parts = entry.split_whitespace();
    if let (Some(path), Some(version)) = (parts.next(), parts.next()) {
        let path = path.trim_matches('"');
        if let Ok(id) = ModuleIdentity::new(path, version) {
            out.push(id);
        }
    }
}
