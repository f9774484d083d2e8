//! Update the identity cache from existing resource files.
//!
//! The reverse direction of `update`: each named resource is read and its
//! records backfill the `.tributors` cache (name from mailmap by email,
//! name/email/orcid from codemeta, name/affiliation from zenodo by orcid,
//! name/profile from the contributor list by login). With no resources
//! given, every file found in the working directory is read.
//!
//! ```bash
//! tributors update-lookup
//! tributors update-lookup mailmap codemeta
//! ```

use anyhow::Result;
use clap::Args;

use super::common::{FileArgs, ResourceArg, expand_resources};
use crate::core::ResourceKind;
use crate::orchestrator::{LookupOptions, TributorsClient};

/// Command to update the `.tributors` cache from resource files.
#[derive(Args, Debug)]
pub struct UpdateLookupCommand {
    /// Resources to read; omit to auto-detect by file existence
    #[arg(value_name = "RESOURCE")]
    resources: Vec<ResourceArg>,

    #[command(flatten)]
    files: FileArgs,
}

impl UpdateLookupCommand {
    /// Execute the update-lookup command.
    pub fn execute(self, skip_cache: bool) -> Result<()> {
        let resources = expand_resources(
            &self.resources,
            &[
                ResourceKind::AllContrib,
                ResourceKind::Zenodo,
                ResourceKind::CodeMeta,
                ResourceKind::Mailmap,
            ],
        );
        let mut client = TributorsClient::new(skip_cache)?;
        client.update_lookup(&LookupOptions {
            resources,
            files: self.files.into_overrides(),
        })
    }
}
