//! tool::mock
//!
//! Scriptable module tool for testing.
//!
//! # Behavior
//!
//! The mock works on the real manifest file in the resolution root:
//!
//! - `init` writes `<edit message>\n\nmodule <path>\n`, or fails if
//!   scripted to.
//! - `tidy` writes the manifest scripted for the module, if any, and
//!   otherwise leaves the file alone.
//! - `graph` returns the scripted edges, if any, and otherwise the
//!   requirements declared by the manifest currently on disk. It can be
//!   scripted to fail a number of times first.
//!
//! Scripts are keyed by module identity; `None` is the project.

use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, Mutex};

use super::{GraphEdge, ModuleTool, ResolutionRoot, ToolError};
use crate::core::manifest::declared_requirements;
use crate::core::types::ModuleIdentity;

type Key = Option<ModuleIdentity>;

/// Recorded tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    Init(Key),
    Tidy(Key),
    Graph(Key),
}

/// Scriptable module tool.
#[derive(Debug, Clone, Default)]
pub struct MockModuleTool {
    inner: Arc<Mutex<MockToolInner>>,
}

#[derive(Debug, Default)]
struct MockToolInner {
    tidy_results: HashMap<Key, Vec<u8>>,
    graph_results: HashMap<Key, Vec<ModuleIdentity>>,
    fail_init: Vec<Key>,
    fail_tidy: Vec<Key>,
    graph_failures: HashMap<Key, usize>,
    calls: Vec<ToolCall>,
}

fn failure(command: &str, root: &ResolutionRoot) -> ToolError {
    ToolError::Failed {
        command: command.to_string(),
        root: root.to_string(),
        status: Some(1),
        stderr: "injected failure".to_string(),
    }
}

fn io_err(root: &ResolutionRoot, e: std::io::Error) -> ToolError {
    ToolError::Io {
        path: root.manifest_path(),
        message: e.to_string(),
    }
}

impl MockModuleTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Manifest `tidy` writes for a module.
    pub fn tidy_writes(&self, key: Key, manifest: impl Into<Vec<u8>>) -> &Self {
        self.lock().tidy_results.insert(key, manifest.into());
        self
    }

    /// Edges `graph` returns for a module.
    pub fn graph_returns(&self, key: Key, targets: Vec<ModuleIdentity>) -> &Self {
        self.lock().graph_results.insert(key, targets);
        self
    }

    /// Make `init` fail for a module.
    pub fn fail_init(&self, key: Key) -> &Self {
        self.lock().fail_init.push(key);
        self
    }

    /// Make `tidy` fail for a module.
    pub fn fail_tidy(&self, key: Key) -> &Self {
        self.lock().fail_tidy.push(key);
        self
    }

    /// Make the next `times` calls to `graph` fail for a module.
    pub fn fail_graph(&self, key: Key, times: usize) -> &Self {
        self.lock().graph_failures.insert(key, times);
        self
    }

    /// Every call, in order.
    pub fn calls(&self) -> Vec<ToolCall> {
        self.lock().calls.clone()
    }

    /// Number of calls matching `call`.
    pub fn count(&self, call: &ToolCall) -> usize {
        self.lock().calls.iter().filter(|c| *c == call).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockToolInner> {
        self.inner.lock().unwrap()
    }
}

impl ModuleTool for MockModuleTool {
    fn init(
        &self,
        root: &ResolutionRoot,
        module_path: Option<&str>,
        edit_message: &str,
    ) -> Result<(), ToolError> {
        let key = root.module().cloned();
        let mut inner = self.lock();
        inner.calls.push(ToolCall::Init(key.clone()));
        if inner.fail_init.contains(&key) {
            return Err(failure("go mod init", root));
        }
        let path = module_path
            .map(str::to_string)
            .or_else(|| key.as_ref().map(|m| m.path().to_string()))
            .unwrap_or_else(|| "example.com/project".to_string());
        fs::write(
            root.manifest_path(),
            format!("{}\n\nmodule {}\n", edit_message, path),
        )
        .map_err(|e| io_err(root, e))
    }

    fn tidy(&self, root: &ResolutionRoot) -> Result<(), ToolError> {
        let key = root.module().cloned();
        let mut inner = self.lock();
        inner.calls.push(ToolCall::Tidy(key.clone()));
        if inner.fail_tidy.contains(&key) {
            return Err(failure("go mod tidy", root));
        }
        if let Some(manifest) = inner.tidy_results.get(&key) {
            fs::write(root.manifest_path(), manifest).map_err(|e| io_err(root, e))?;
        }
        Ok(())
    }

    fn graph(&self, root: &ResolutionRoot) -> Result<Vec<GraphEdge>, ToolError> {
        let key = root.module().cloned();
        let mut inner = self.lock();
        inner.calls.push(ToolCall::Graph(key.clone()));
        if let Some(remaining) = inner.graph_failures.get_mut(&key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(failure("go mod graph", root));
            }
        }

        let from = key
            .as_ref()
            .map_or_else(|| "project".to_string(), |m| m.path().to_string());
        let targets = match inner.graph_results.get(&key) {
            Some(targets) => targets.clone(),
            None => {
                let manifest = fs::read(root.manifest_path()).map_err(|e| io_err(root, e))?;
                declared_requirements(&manifest)
            }
        };
        Ok(targets
            .into_iter()
            .map(|to| GraphEdge {
                from: from.clone(),
                to,
            })
            .collect())
    }
}
