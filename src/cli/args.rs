//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::core::types::ModuleIdentity;

/// modpub - Publish Go module dependency graphs to an artifact repository
#[derive(Parser, Debug)]
#[command(name = "modpub")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if modpub was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output: warnings, errors and failures only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Options shared by the publishing commands.
#[derive(Args, Debug, Clone)]
pub struct PublishOptions {
    /// Name of the Go repository on the artifact server
    pub target_repo: String,

    /// Keep tidied manifests in the module cache
    #[arg(long)]
    pub overwrite_cache: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Publish every dependency of the project in the working directory
    #[command(
        name = "publish-deps",
        long_about = "Publish every dependency of the project in the working directory.\n\n\
            Resolves the project's full module graph and publishes each module \
            version that the target repository does not already have. The project \
            itself is never published. A missing go.mod is created with `go mod init`; \
            an empty one is populated with `go mod tidy` for the duration of the \
            run and restored afterwards.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Publish the dependencies of the current project
    modpub publish-deps go-local

    # Publish the dependencies of another project
    modpub --cwd ../service publish-deps go-local"
    )]
    PublishDeps {
        #[command(flatten)]
        options: PublishOptions,
    },

    /// Publish one module version and everything it depends on
    #[command(
        name = "publish",
        long_about = "Publish one module version and its dependency graph.\n\n\
            The module is taken from the local module cache when present and \
            downloaded otherwise. Modules the target repository already serves \
            are reused and not published again.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Publish a module and its dependencies
    modpub publish github.com/pkg/errors@v0.9.1 go-local"
    )]
    Publish {
        /// Module to publish, as <path>@<version>
        module: ModuleIdentity,

        #[command(flatten)]
        options: PublishOptions,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        long_about = "Generate shell completion scripts for tab-completion.\n\n\
            Outputs a completion script for the specified shell. Add the output \
            to your shell's configuration to enable tab-completion for modpub commands.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Bash (add to ~/.bashrc)
    modpub completion bash >> ~/.bashrc

    # Zsh (add to ~/.zshrc)
    modpub completion zsh >> ~/.zshrc

    # Fish
    modpub completion fish > ~/.config/fish/completions/modpub.fish

    # PowerShell
    modpub completion powershell >> $PROFILE"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_publish() {
        let cli = Cli::try_parse_from([
            "modpub",
            "publish",
            "github.com/pkg/errors@v0.9.1",
            "go-local",
            "--overwrite-cache",
        ])
        .unwrap();
        match cli.command {
            Command::Publish { module, options } => {
                assert_eq!(module.path(), "github.com/pkg/errors");
                assert_eq!(options.target_repo, "go-local");
                assert!(options.overwrite_cache);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn parse_publish_deps_with_globals() {
        let cli =
            Cli::try_parse_from(["modpub", "publish-deps", "go-local", "--cwd", "/p", "-q"])
                .unwrap();
        assert!(cli.quiet);
        assert_eq!(cli.cwd, Some(PathBuf::from("/p")));
        assert!(matches!(cli.command, Command::PublishDeps { .. }));
    }

    #[test]
    fn reject_module_without_version() {
        let result = Cli::try_parse_from(["modpub", "publish", "github.com/pkg/errors", "go"]);
        assert!(result.is_err());
    }
}
