//! cli::commands::publish_deps
//!
//! Publish every dependency of the project in the working directory.
//!
//! # Design
//!
//! The project's own manifest is created or populated only when needed and
//! restored when the run ends; see [`crate::engine::project`].
//!
//! # Example
//!
//! ```bash
//! modpub --cwd ./service publish-deps go-local
//! ```

use std::process::ExitCode;

use anyhow::{bail, Result};
use tracing::debug;

use super::{finish, Session};
use crate::cli::args::PublishOptions;
use crate::cli::Context;
use crate::engine::publish_project_deps;

/// Run the publish-deps command.
pub fn publish_deps(ctx: &Context, options: &PublishOptions) -> Result<ExitCode> {
    if !ctx.cwd.is_dir() {
        bail!("'{}' is not a directory", ctx.cwd.display());
    }
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(publish_deps_async(ctx, options))
}

async fn publish_deps_async(ctx: &Context, options: &PublishOptions) -> Result<ExitCode> {
    let session = Session::open(ctx, &options.target_repo)?;
    let resolver = session.resolver(options)?;

    let walk = publish_project_deps(&resolver, &ctx.cwd).await?;
    debug!(modules = walk.len(), "walk finished");
    Ok(finish(resolver.ledger(), ctx))
}
