//! Update contributor metadata files from the host and the registries.
//!
//! Runs the enrichment pass (host profiles, optional ORCID searches) once,
//! then reconciles each target resource from the requested source
//! identifier kinds. The default reconciles by login from the host
//! enumeration.
//!
//! ```bash
//! tributors update allcontrib --thresh 2
//! tributors update all --ctype doc --skip-users somebot,other
//! tributors update codemeta --from-kinds login,email,orcid --interactive
//! ```

use anyhow::Result;
use clap::Args;

use super::common::{FileArgs, ResourceArg, expand_resources};
use crate::core::ResourceKind;
use crate::merge::SourceKind;
use crate::orchestrator::{TributorsClient, UpdateOptions};

/// Command to update one or more contributor metadata files.
#[derive(Args, Debug)]
pub struct UpdateCommand {
    /// Resources to update (`all` = allcontrib, zenodo, and codemeta)
    #[arg(required = true, value_name = "RESOURCE")]
    resources: Vec<ResourceArg>,

    /// The repository address (owner/name), if not exported to
    /// GITHUB_REPOSITORY
    #[arg(long)]
    repo: Option<String>,

    /// Minimum number of contributions required to add a contributor
    #[arg(long, default_value_t = 1)]
    thresh: u64,

    /// Contribution type tag for new contributor-list entries
    #[arg(long, default_value = "code")]
    ctype: String,

    /// Logins to skip, comma separated
    #[arg(long = "skip-users", value_delimiter = ',', value_name = "LOGIN")]
    skip_users: Vec<String>,

    /// Identifier kinds to reconcile from, comma separated
    #[arg(
        long = "from-kinds",
        value_delimiter = ',',
        default_value = "login",
        value_name = "KIND"
    )]
    from_kinds: Vec<SourceKind>,

    /// Resolve ambiguous ORCID searches at the terminal
    #[arg(short, long)]
    interactive: bool,

    #[command(flatten)]
    files: FileArgs,
}

impl UpdateCommand {
    /// Execute the update command.
    pub async fn execute(self, skip_cache: bool) -> Result<()> {
        let resources = expand_resources(
            &self.resources,
            &[
                ResourceKind::AllContrib,
                ResourceKind::Zenodo,
                ResourceKind::CodeMeta,
            ],
        );
        let mut client = TributorsClient::new(skip_cache)?;
        client
            .update(UpdateOptions {
                resources,
                repo: self.repo,
                thresh: self.thresh,
                ctype: self.ctype,
                skip_users: self.skip_users,
                kinds: self.from_kinds,
                interactive: self.interactive,
                files: self.files.into_overrides(),
            })
            .await
    }
}
