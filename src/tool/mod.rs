//! tool
//!
//! The module tool: `init`, `tidy` and `graph` over a module directory.
//!
//! # Architecture
//!
//! Every call takes an explicit [`ResolutionRoot`] naming the directory the
//! tool runs in and the module it belongs to. Implementations run with that
//! directory as the working directory of the child process; the
//! process-wide working directory is never changed.
//!
//! # Modules
//!
//! - [`go`]: Production implementation running the `go` binary
//! - [`mock`]: Scriptable implementation for deterministic testing

pub mod go;
pub mod mock;

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::core::types::ModuleIdentity;

pub use go::GoTool;

/// File name of a module manifest.
pub const MANIFEST_FILE: &str = "go.mod";

/// File name of the checksum file next to a manifest.
pub const CHECKSUM_FILE: &str = "go.sum";

/// Errors from module tool invocations.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to run '{program}': {message}")]
    Spawn { program: String, message: String },

    #[error("'{command}' failed in {root} (exit {}): {stderr}", exit_label(.status))]
    Failed {
        command: String,
        root: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("I/O error at '{path}': {message}")]
    Io { path: PathBuf, message: String },
}

fn exit_label(status: &Option<i32>) -> String {
    status.map_or_else(|| "signal".to_string(), |s| s.to_string())
}

/// Directory a tool call runs in, and the module it belongs to.
///
/// `module` is `None` for the user's own project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRoot {
    dir: PathBuf,
    module: Option<ModuleIdentity>,
}

impl ResolutionRoot {
    /// Root for a dependency unpacked into `dir`.
    pub fn for_module(dir: impl Into<PathBuf>, module: ModuleIdentity) -> Self {
        Self {
            dir: dir.into(),
            module: Some(module),
        }
    }

    /// Root for the user's project.
    pub fn for_project(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            module: None,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn module(&self) -> Option<&ModuleIdentity> {
        self.module.as_ref()
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    pub fn checksum_path(&self) -> PathBuf {
        self.dir.join(CHECKSUM_FILE)
    }
}

impl fmt::Display for ResolutionRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.module {
            Some(m) => write!(f, "{} ({})", m, self.dir.display()),
            None => write!(f, "project ({})", self.dir.display()),
        }
    }
}

/// One edge of the module graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphEdge {
    /// Requiring node as printed by the tool (`path` or `path@version`).
    pub from: String,
    /// Required module version.
    pub to: ModuleIdentity,
}

/// Operations of the module tool.
pub trait ModuleTool: Send + Sync {
    /// Create a manifest in `root`, prefixed with `edit_message`.
    ///
    /// `module_path` of `None` lets the tool infer the path.
    fn init(
        &self,
        root: &ResolutionRoot,
        module_path: Option<&str>,
        edit_message: &str,
    ) -> Result<(), ToolError>;

    /// Add missing requirements to the manifest in `root`.
    fn tidy(&self, root: &ResolutionRoot) -> Result<(), ToolError>;

    /// Full requirement graph of the module in `root`.
    fn graph(&self, root: &ResolutionRoot) -> Result<Vec<GraphEdge>, ToolError>;
}

/// Parse `go mod graph` output.
///
/// Each line is `from to@version`. Every distinct versioned `to` node is
/// returned once, in first-seen order. Pseudo-nodes such as `go@1.21` or
/// `toolchain@go1.21.0` are skipped.
pub fn parse_graph(output: &str) -> Vec<GraphEdge> {
    let mut seen = std::collections::HashSet::new();
    let mut edges = Vec::new();
    for line in output.lines() {
        let mut parts = line.split_whitespace();
        let (Some(from), Some(to)) = (parts.next(), parts.next()) else {
            continue;
        };
        let to: ModuleIdentity = match to.parse() {
            Ok(id) => id,
            Err(e) => {
                debug!(node = to, error = %e, "skipping graph node");
                continue;
            }
        };
        if seen.insert(to.clone()) {
            edges.push(GraphEdge {
                from: from.to_string(),
                to,
            });
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ModuleIdentity {
        s.parse().unwrap()
    }

    #[test]
    fn parse_graph_dedupes_targets() {
        let out = "\
example.com/root example.com/a@v1.0.0
example.com/root example.com/b@v2.0.0
example.com/a@v1.0.0 example.com/b@v2.0.0
example.com/b@v2.0.0 example.com/c@v0.3.1
";
        let edges = parse_graph(out);
        let targets: Vec<_> = edges.iter().map(|e| e.to.clone()).collect();
        assert_eq!(
            targets,
            vec![
                id("example.com/a@v1.0.0"),
                id("example.com/b@v2.0.0"),
                id("example.com/c@v0.3.1"),
            ]
        );
        assert_eq!(edges[2].from, "example.com/b@v2.0.0");
    }

    #[test]
    fn parse_graph_skips_pseudo_nodes() {
        let out = "example.com/root go@1.21\nexample.com/root toolchain@go1.21.0\n";
        assert!(parse_graph(out).is_empty());
    }

    #[test]
    fn parse_graph_empty_output_is_leaf() {
        assert!(parse_graph("").is_empty());
        assert!(parse_graph("\n\n").is_empty());
    }

    #[test]
    fn root_display() {
        let r = ResolutionRoot::for_module("/tmp/x", id("example.com/a@v1.0.0"));
        assert_eq!(r.to_string(), "example.com/a@v1.0.0 (/tmp/x)");
        assert_eq!(r.manifest_path(), PathBuf::from("/tmp/x/go.mod"));
        let p = ResolutionRoot::for_project("/work");
        assert_eq!(p.to_string(), "project (/work)");
        assert!(p.module().is_none());
    }

    #[test]
    fn tool_error_display() {
        let err = ToolError::Failed {
            command: "go mod tidy".into(),
            root: "project (/w)".into(),
            status: Some(1),
            stderr: "no network".into(),
        };
        assert_eq!(
            err.to_string(),
            "'go mod tidy' failed in project (/w) (exit 1): no network"
        );
    }
}
