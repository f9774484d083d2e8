//! Command-line interface for tributors.
//!
//! Each command is implemented as a separate module with its own argument
//! structure and execution logic:
//!
//! - `init` - create contributor metadata files
//! - `update` - reconcile metadata files from the host and registries
//! - `update-lookup` - backfill the identity cache from metadata files
//! - `version` - print the crate version
//!
//! # Global Options
//!
//! All commands support `--verbose`/`--quiet` for output level and
//! `--skip-cache` to run without loading or persisting `.tributors`.
//!
//! ```bash
//! tributors init allcontrib --repo owner/name
//! tributors update all --thresh 2
//! tributors --skip-cache update allcontrib
//! tributors update-lookup
//! ```

pub mod common;
mod init;
mod update;
mod update_lookup;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Main CLI structure for tributors.
#[derive(Parser)]
#[command(
    name = "tributors",
    about = "Reconcile contributor identity across contributor metadata files",
    version,
    long_about = "Tributors keeps a repository's contributor metadata files (.all-contributorsrc, \
.zenodo.json, codemeta.json) in agreement, sharing identity knowledge through a local \
.tributors cache enriched from GitHub and ORCID."
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Skip loading and saving the .tributors cache file
    #[arg(long, global = true)]
    skip_cache: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize contributor metadata files
    Init(init::InitCommand),

    /// Update contributor metadata files from the host and registries
    Update(update::UpdateCommand),

    /// Update the .tributors cache from existing metadata files
    UpdateLookup(update_lookup::UpdateLookupCommand),

    /// Show the software version
    Version,
}

impl Cli {
    /// The tracing filter directive implied by the verbosity flags, `None`
    /// under `--quiet`. Threaded into the subscriber at startup rather than
    /// set through the environment.
    #[must_use]
    pub fn log_level(&self) -> Option<&'static str> {
        if self.quiet {
            None
        } else if self.verbose {
            Some("debug")
        } else {
            Some("info")
        }
    }

    /// Execute the selected command.
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Init(cmd) => cmd.execute(self.skip_cache).await,
            Commands::Update(cmd) => cmd.execute(self.skip_cache).await,
            Commands::UpdateLookup(cmd) => cmd.execute(self.skip_cache),
            Commands::Version => {
                println!(env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_structure() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_log_level_from_flags() {
        let cli = Cli::parse_from(["tributors", "version"]);
        assert_eq!(cli.log_level(), Some("info"));
        let cli = Cli::parse_from(["tributors", "--verbose", "version"]);
        assert_eq!(cli.log_level(), Some("debug"));
        let cli = Cli::parse_from(["tributors", "--quiet", "version"]);
        assert_eq!(cli.log_level(), None);
    }

    #[test]
    fn test_unknown_resource_rejected() {
        let result =
            Cli::try_parse_from(["tributors", "update", "bitbucket"]);
        assert!(result.is_err());
    }
}
