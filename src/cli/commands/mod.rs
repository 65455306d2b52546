//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each publishing handler:
//! 1. Loads configuration and builds the collaborators ([`Session`])
//! 2. Calls the engine to resolve and publish
//! 3. Prints the summary and maps failures to the exit code
//!
//! # Async Commands
//!
//! Publishing talks to the artifact repository over HTTP, so handlers build
//! a tokio runtime and `block_on` the async engine.

mod completion;
mod publish;
mod publish_deps;

pub use completion::completion;
pub use publish::publish;
pub use publish_deps::publish_deps;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use tempfile::TempDir;
use tracing::debug;

use super::args::{Command, PublishOptions};
use super::Context;
use crate::cache::FsModuleCache;
use crate::core::config::Config;
use crate::core::ledger::PublishLedger;
use crate::engine::{Collaborators, ResolveOptions, Resolver};
use crate::fetch::GoDownloader;
use crate::repository::{create_repository, Repository};
use crate::tool::GoTool;
use crate::ui::output;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<ExitCode> {
    match command {
        Command::PublishDeps { options } => publish_deps(ctx, &options),
        Command::Publish { module, options } => publish(ctx, &module, &options),
        Command::Completion { shell } => completion(shell).map(|()| ExitCode::SUCCESS),
    }
}

/// Collaborators of one publishing run, built from configuration.
pub(crate) struct Session {
    config: Config,
    cache: FsModuleCache,
    tool: GoTool,
    downloader: GoDownloader,
    repository: Box<dyn Repository>,
    // Working directory of `go mod download`; removed with the session.
    _download_dir: TempDir,
}

impl Session {
    /// Load configuration for `ctx` and connect to the repository.
    pub(crate) fn open(ctx: &Context, target_repo: &str) -> Result<Self> {
        let loaded = Config::load(Some(&ctx.cwd))?;
        for warning in &loaded.warnings {
            output::warn(
                format!("{}: {}", warning.path.display(), warning.message),
                ctx.verbosity,
            );
        }
        let config = loaded.config;

        let url = config.require_repository_url()?;
        let repository =
            create_repository(url, config.credentials(), config.repository_provider())?;
        debug!(repository = repository.name(), %url, "connected");

        let mut tool = GoTool::new(config.go_binary());
        if let Some(dir) = config.module_cache() {
            tool = tool.with_env("GOMODCACHE", dir.display().to_string());
        }
        let cache = FsModuleCache::new(config.cache_dir()?);

        let download_dir = tempfile::Builder::new()
            .prefix("modpub-download-")
            .tempdir()
            .context("cannot create a download directory")?;
        let mut downloader = GoDownloader::new(tool.clone(), download_dir.path())
            .with_repository_proxy(repository.proxy_url(target_repo));
        if let Some(proxy) = config.upstream_proxy() {
            downloader = downloader.with_upstream_proxy(proxy);
        }

        Ok(Self {
            config,
            cache,
            tool,
            downloader,
            repository,
            _download_dir: download_dir,
        })
    }

    /// Resolution options: config first, CLI flags on top.
    pub(crate) fn resolve_options(&self, options: &PublishOptions) -> ResolveOptions {
        let mut resolve = ResolveOptions::new(&options.target_repo);
        resolve.edit_message = self.config.edit_message().to_string();
        resolve.overwrite_cache = options.overwrite_cache || self.config.overwrite_cache();
        resolve.scratch_root = self.config.scratch_dir().map(Into::into);
        resolve
    }

    /// A resolver over this session's collaborators.
    pub(crate) fn resolver(&self, options: &PublishOptions) -> Result<Resolver<'_>> {
        let collaborators = Collaborators {
            cache: &self.cache,
            downloader: &self.downloader,
            tool: &self.tool,
            repository: self.repository.as_ref(),
        };
        let resolver = Resolver::new(
            collaborators,
            Arc::new(PublishLedger::new()),
            self.resolve_options(options),
        )?;
        Ok(resolver)
    }
}

/// Print the summary and turn failures into a non-zero exit code.
pub(crate) fn finish(ledger: &PublishLedger, ctx: &Context) -> ExitCode {
    output::summary(ledger, ctx.verbosity);
    if ledger.summary().is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
