//! cli::commands::publish
//!
//! Publish one module version and its dependency graph.
//!
//! # Example
//!
//! ```bash
//! modpub publish github.com/pkg/errors@v0.9.1 go-local
//! ```

use std::process::ExitCode;

use anyhow::Result;
use tracing::{debug, info};

use super::{finish, Session};
use crate::cli::args::PublishOptions;
use crate::cli::Context;
use crate::core::types::ModuleIdentity;

/// Run the publish command.
///
/// This is a synchronous wrapper that uses tokio to run the async implementation.
pub fn publish(ctx: &Context, module: &ModuleIdentity, options: &PublishOptions) -> Result<ExitCode> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(publish_async(ctx, module, options))
}

async fn publish_async(
    ctx: &Context,
    module: &ModuleIdentity,
    options: &PublishOptions,
) -> Result<ExitCode> {
    let session = Session::open(ctx, &options.target_repo)?;
    let resolver = session.resolver(options)?;

    info!("Publishing {} to {}", module, options.target_repo);
    let walk = resolver.publish_module(module).await;
    debug!(modules = walk.len(), "walk finished");
    Ok(finish(resolver.ledger(), ctx))
}
