//! Initialize contributor metadata files.
//!
//! Creates the standard empty `.all-contributorsrc` for the repository,
//! and/or synthesizes a `.zenodo.json` from a published deposit record
//! (which requires `--doi`). Existing files are never overwritten without
//! `--force`.
//!
//! ```bash
//! tributors init allcontrib --repo owner/name
//! tributors init zenodo --doi 10.5281/zenodo.1012531
//! tributors init all --repo owner/name --doi 10.5281/zenodo.1012531
//! ```

use anyhow::Result;
use clap::Args;

use super::common::{FileArgs, ResourceArg, expand_resources};
use crate::core::ResourceKind;
use crate::orchestrator::{InitOptions, TributorsClient};

/// Command to initialize one or more contributor metadata files.
#[derive(Args, Debug)]
pub struct InitCommand {
    /// Resources to initialize (`all` = allcontrib and zenodo)
    #[arg(required = true, value_name = "RESOURCE")]
    resources: Vec<ResourceArg>,

    /// The repository address (owner/name), if not exported to
    /// GITHUB_REPOSITORY
    #[arg(long)]
    repo: Option<String>,

    /// Overwrite existing files
    #[arg(short, long)]
    force: bool,

    /// The Zenodo DOI to synthesize the deposit descriptor from
    #[arg(long)]
    doi: Option<String>,

    #[command(flatten)]
    files: FileArgs,
}

impl InitCommand {
    /// Execute the init command.
    pub async fn execute(self, skip_cache: bool) -> Result<()> {
        let resources = expand_resources(
            &self.resources,
            &[ResourceKind::AllContrib, ResourceKind::Zenodo],
        );
        let mut client = TributorsClient::new(skip_cache)?;
        client
            .init(InitOptions {
                resources,
                repo: self.repo,
                force: self.force,
                doi: self.doi,
                files: self.files.into_overrides(),
            })
            .await
    }
}
