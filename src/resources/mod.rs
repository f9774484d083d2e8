//! Resource adapters: one per external metadata file format
//!
//! Each adapter knows how to load and save its own file format, which
//! primary-identifier views it can support, and how knowledge flows in both
//! directions: `update` reconciles cache/other-resource knowledge *into*
//! the file (the reconciliation pass), `update_lookup` backfills the cache
//! *from* the file's own records.
//!
//! # Capability Model
//!
//! The [`ResourceAdapter`] trait declares the four lookup views
//! (`email_lookup`, `login_lookup`, `orcid_lookup`, `name_lookup`) with
//! default implementations returning an empty set; each adapter overrides
//! exactly the subset its format can key by. Callers never probe
//! reflectively; an unsupported view is simply empty.
//!
//! | adapter    | login | email | orcid | name |
//! |------------|-------|-------|-------|------|
//! | allcontrib |   ✓   |       |       |  ✓   |
//! | codemeta   |       |   ✓   |   ✓   |  ✓   |
//! | zenodo     |       |       |   ✓   |  ✓   |
//! | mailmap    |       |   ✓   |       |  ✓   |
//!
//! Adapters are synchronous: everything they need from the network (the
//! contributor enumeration, repository metadata, a deposit record) is
//! fetched by the orchestrator and handed in through [`InitContext`] /
//! [`merge::UpdateContext`].

pub mod allcontrib;
pub mod codemeta;
pub mod mailmap;
pub mod zenodo;

use anyhow::Result;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::cache::IdentityCache;
use crate::core::ResourceKind;
use crate::merge::{MergeWarning, UpdateContext};

pub use zenodo::{DepositRecord, fetch_deposit};

/// Inputs for the `init` action, prepared by the orchestrator.
pub struct InitContext<'a> {
    /// The resolved `owner/name` repository address
    pub repo_uid: &'a str,
    /// Overwrite an existing file
    pub force: bool,
    /// The fetched deposit record, present when initializing zenodo
    pub deposit: Option<&'a DepositRecord>,
    /// Repository topic tags, merged into zenodo keywords
    pub topics: &'a [String],
    /// The shared identity cache (already enriched for zenodo init)
    pub cache: &'a IdentityCache,
}

/// One external metadata file format.
pub trait ResourceAdapter {
    /// Which resource this adapter implements.
    fn kind(&self) -> ResourceKind;

    /// The file this adapter reads and writes.
    fn path(&self) -> &Path;

    /// Load and parse the file. Loading is idempotent; a missing required
    /// file is a fatal error carrying a remedial hint.
    fn load(&mut self) -> Result<()>;

    /// Serialize the records back to the file.
    fn save(&self) -> Result<()>;

    /// Create the file (`init` action).
    fn init(&mut self, ctx: &InitContext<'_>) -> Result<()> {
        let _ = ctx;
        anyhow::bail!("{} does not support init", self.kind())
    }

    /// Reconcile cache/other-resource knowledge into the file (`update`).
    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<()> {
        let _ = ctx;
        anyhow::bail!("{} does not support update", self.kind())
    }

    /// Backfill the cache from the file's own records (`update-lookup`).
    /// Adapters whose format cannot be keyed back to a cache entry keep the
    /// default no-op.
    fn update_lookup(&self, cache: &mut IdentityCache) -> Result<Vec<MergeWarning>> {
        let _ = cache;
        Ok(Vec::new())
    }

    /// Email addresses present in the file's records.
    fn email_lookup(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }

    /// Logins present in the file's records.
    fn login_lookup(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }

    /// ORCID iDs present in the file's records.
    fn orcid_lookup(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }

    /// Display names present in the file's records.
    fn name_lookup(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }
}

/// Map a resource kind to its adapter implementation.
///
/// This is the single lookup table from the closed [`ResourceKind`] enum to
/// adapters; [`ResourceKind::GitHub`] is not a file and has no adapter.
///
/// # Errors
/// Fails for [`ResourceKind::GitHub`].
pub fn get_adapter(
    kind: ResourceKind,
    path_override: Option<PathBuf>,
) -> Result<Box<dyn ResourceAdapter>> {
    let path =
        path_override.unwrap_or_else(|| PathBuf::from(kind.default_filename()));
    match kind {
        ResourceKind::AllContrib => Ok(Box::new(allcontrib::AllContribResource::new(path))),
        ResourceKind::Zenodo => Ok(Box::new(zenodo::ZenodoResource::new(path))),
        ResourceKind::CodeMeta => Ok(Box::new(codemeta::CodeMetaResource::new(path))),
        ResourceKind::Mailmap => Ok(Box::new(mailmap::MailmapResource::new(path))),
        ResourceKind::GitHub => {
            anyhow::bail!("github is a contributor source, not a file resource")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_registry_covers_file_kinds() {
        for kind in [
            ResourceKind::AllContrib,
            ResourceKind::Zenodo,
            ResourceKind::CodeMeta,
            ResourceKind::Mailmap,
        ] {
            let adapter = get_adapter(kind, None).unwrap();
            assert_eq!(adapter.kind(), kind);
            assert_eq!(
                adapter.path(),
                Path::new(kind.default_filename())
            );
        }
    }

    #[test]
    fn test_github_has_no_adapter() {
        assert!(get_adapter(ResourceKind::GitHub, None).is_err());
    }

    #[test]
    fn test_path_override() {
        let adapter = get_adapter(
            ResourceKind::CodeMeta,
            Some(PathBuf::from("meta/codemeta.json")),
        )
        .unwrap();
        assert_eq!(adapter.path(), Path::new("meta/codemeta.json"));
    }
}
