//! Tributors CLI entry point
//!
//! This is the main executable for tributors. It parses command-line
//! arguments, threads the verbosity flags into the tracing subscriber
//! (no process-global level mutation), executes the command, and renders
//! failures as user-friendly errors with a non-zero exit status.
//!
//! The CLI supports:
//! - `init` - create contributor metadata files
//! - `update` - reconcile metadata files from GitHub/ORCID/Zenodo
//! - `update-lookup` - backfill the .tributors cache from metadata files
//! - `version` - print the crate version

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tributors::cli;
use tributors::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    init_tracing(cli.log_level());

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}

/// Install the tracing subscriber for this run. The level comes from the
/// CLI flags; an explicit `RUST_LOG` refines the default level only.
fn init_tracing(level: Option<&str>) {
    let filter = match level {
        None => return,
        Some("info") if std::env::var("RUST_LOG").is_ok() => EnvFilter::from_default_env(),
        Some(level) => EnvFilter::new(level),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}
