//! Shared argument structures for the tributors subcommands.

use clap::{Args, ValueEnum};
use std::path::PathBuf;

use crate::core::ResourceKind;
use crate::orchestrator::FileOverrides;

/// A resource name as typed on the command line; `all` expands to the
/// command's full resource set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResourceArg {
    /// The `.all-contributorsrc` contributor list
    Allcontrib,
    /// The `.zenodo.json` deposit descriptor
    Zenodo,
    /// The `codemeta.json` citation file
    Codemeta,
    /// The `.mailmap` alias file
    Mailmap,
    /// The repository host enumeration
    Github,
    /// Every resource the command supports
    All,
}

impl ResourceArg {
    fn kind(self) -> Option<ResourceKind> {
        match self {
            Self::Allcontrib => Some(ResourceKind::AllContrib),
            Self::Zenodo => Some(ResourceKind::Zenodo),
            Self::Codemeta => Some(ResourceKind::CodeMeta),
            Self::Mailmap => Some(ResourceKind::Mailmap),
            Self::Github => Some(ResourceKind::GitHub),
            Self::All => None,
        }
    }
}

/// Expand `all` and deduplicate, preserving the order given.
pub fn expand_resources(args: &[ResourceArg], all: &[ResourceKind]) -> Vec<ResourceKind> {
    let mut kinds: Vec<ResourceKind> = Vec::new();
    for arg in args {
        match arg.kind() {
            Some(kind) => {
                if !kinds.contains(&kind) {
                    kinds.push(kind);
                }
            }
            None => {
                for kind in all {
                    if !kinds.contains(kind) {
                        kinds.push(*kind);
                    }
                }
            }
        }
    }
    kinds
}

/// Per-resource file path overrides, shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct FileArgs {
    /// Path to the all-contributors file
    #[arg(long = "allcontrib-file", value_name = "PATH")]
    pub allcontrib_file: Option<PathBuf>,

    /// Path to the zenodo deposit file
    #[arg(long = "zenodo-file", value_name = "PATH")]
    pub zenodo_file: Option<PathBuf>,

    /// Path to the codemeta file
    #[arg(long = "codemeta-file", value_name = "PATH")]
    pub codemeta_file: Option<PathBuf>,

    /// Path to the mailmap file
    #[arg(long = "mailmap-file", value_name = "PATH")]
    pub mailmap_file: Option<PathBuf>,
}

impl FileArgs {
    /// Convert into the orchestrator's override set.
    #[must_use]
    pub fn into_overrides(self) -> FileOverrides {
        FileOverrides {
            allcontrib: self.allcontrib_file,
            zenodo: self.zenodo_file,
            codemeta: self.codemeta_file,
            mailmap: self.mailmap_file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_all() {
        let kinds = expand_resources(
            &[ResourceArg::All],
            &[ResourceKind::AllContrib, ResourceKind::Zenodo],
        );
        assert_eq!(kinds, vec![ResourceKind::AllContrib, ResourceKind::Zenodo]);
    }

    #[test]
    fn test_expand_dedupes_preserving_order() {
        let kinds = expand_resources(
            &[ResourceArg::Zenodo, ResourceArg::All, ResourceArg::Zenodo],
            &[ResourceKind::AllContrib, ResourceKind::Zenodo],
        );
        assert_eq!(kinds, vec![ResourceKind::Zenodo, ResourceKind::AllContrib]);
    }
}
