//! tool::go
//!
//! [`ModuleTool`] backed by the `go` binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use super::{parse_graph, GraphEdge, ModuleTool, ResolutionRoot, ToolError};

/// Runs `go mod init|tidy|graph` as child processes.
#[derive(Debug, Clone)]
pub struct GoTool {
    program: PathBuf,
    env: Vec<(String, String)>,
}

impl GoTool {
    /// Use the given `go` binary.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            env: Vec::new(),
        }
    }

    /// Set an environment variable for every invocation.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// A `go` command with the configured environment, running in `dir`.
    pub(crate) fn command(&self, dir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.current_dir(dir)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        cmd
    }

    pub(crate) fn spawn_error(&self, e: std::io::Error) -> ToolError {
        ToolError::Spawn {
            program: self.program.display().to_string(),
            message: e.to_string(),
        }
    }

    /// Run `go <args>` in `root`, returning stdout.
    fn run(&self, root: &ResolutionRoot, args: &[&str]) -> Result<String, ToolError> {
        let command = format!("go {}", args.join(" "));
        debug!(%command, %root, "running");

        let output = self
            .command(root.dir())
            .args(args)
            .output()
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(ToolError::Failed {
                command,
                root: root.to_string(),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for GoTool {
    fn default() -> Self {
        Self::new("go")
    }
}

impl ModuleTool for GoTool {
    fn init(
        &self,
        root: &ResolutionRoot,
        module_path: Option<&str>,
        edit_message: &str,
    ) -> Result<(), ToolError> {
        let mut args = vec!["mod", "init"];
        if let Some(path) = module_path {
            args.push(path);
        }
        self.run(root, &args)?;

        let manifest_path = root.manifest_path();
        let io_err = |e: std::io::Error| ToolError::Io {
            path: manifest_path.clone(),
            message: e.to_string(),
        };
        let content = fs::read(&manifest_path).map_err(io_err)?;
        if !content.starts_with(edit_message.as_bytes()) {
            let mut edited = Vec::with_capacity(edit_message.len() + 2 + content.len());
            edited.extend_from_slice(edit_message.as_bytes());
            edited.extend_from_slice(b"\n\n");
            edited.extend_from_slice(&content);
            fs::write(&manifest_path, edited).map_err(io_err)?;
        }
        Ok(())
    }

    fn tidy(&self, root: &ResolutionRoot) -> Result<(), ToolError> {
        self.run(root, &["mod", "tidy"]).map(|_| ())
    }

    fn graph(&self, root: &ResolutionRoot) -> Result<Vec<GraphEdge>, ToolError> {
        let output = self.run(root, &["mod", "graph"])?;
        Ok(parse_graph(&output))
    }
}
