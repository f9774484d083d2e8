//! Resource kind abstractions for tributors
//!
//! This module defines the closed set of metadata resources the tool can act
//! on. Each kind corresponds to one external file format (or, for
//! [`ResourceKind::GitHub`], the repository host itself) and maps to exactly
//! one adapter implementation; unknown names are rejected at the CLI boundary
//! by clap rather than inside core logic.
//!
//! # Resource Kinds
//!
//! - **AllContrib**: the `.all-contributorsrc` contributor list
//! - **Zenodo**: the `.zenodo.json` deposit descriptor
//! - **CodeMeta**: the `codemeta.json` citation file
//! - **Mailmap**: the `.mailmap` alias file (read-only)
//! - **GitHub**: the repository host's contributor enumeration, usable only
//!   as a source of logins, never as a target
//!
//! # Examples
//!
//! ```rust
//! use tributors::core::ResourceKind;
//!
//! let kind: ResourceKind = "zenodo".parse().unwrap();
//! assert_eq!(kind.default_filename(), ".zenodo.json");
//! assert_eq!(kind.to_string(), "zenodo");
//! ```

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of metadata resources tributors understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// The `.all-contributorsrc` contributor list file
    #[value(name = "allcontrib")]
    AllContrib,
    /// The `.zenodo.json` deposit descriptor file
    Zenodo,
    /// The `codemeta.json` citation file
    #[value(name = "codemeta")]
    CodeMeta,
    /// The `.mailmap` alias file (read-only)
    Mailmap,
    /// The repository host contributor enumeration (source only)
    #[value(name = "github")]
    GitHub,
}

impl ResourceKind {
    /// The conventional on-disk filename for this resource.
    ///
    /// [`ResourceKind::GitHub`] has no file; it returns an empty string and
    /// callers never ask for it.
    #[must_use]
    pub const fn default_filename(&self) -> &'static str {
        match self {
            Self::AllContrib => ".all-contributorsrc",
            Self::Zenodo => ".zenodo.json",
            Self::CodeMeta => "codemeta.json",
            Self::Mailmap => ".mailmap",
            Self::GitHub => "",
        }
    }

    /// Kinds that can be initialized with `init`.
    #[must_use]
    pub const fn supports_init(&self) -> bool {
        matches!(self, Self::AllContrib | Self::Zenodo)
    }

    /// Kinds that can be targets of an `update` reconciliation pass.
    ///
    /// Mailmap is read-only and GitHub is not a file, so neither can be
    /// rewritten.
    #[must_use]
    pub const fn supports_update(&self) -> bool {
        matches!(self, Self::AllContrib | Self::Zenodo | Self::CodeMeta)
    }

    /// Kinds that can feed the cache via `update-lookup`.
    #[must_use]
    pub const fn supports_update_lookup(&self) -> bool {
        !matches!(self, Self::GitHub)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AllContrib => "allcontrib",
            Self::Zenodo => "zenodo",
            Self::CodeMeta => "codemeta",
            Self::Mailmap => "mailmap",
            Self::GitHub => "github",
        };
        write!(f, "{name}")
    }
}

impl FromStr for ResourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allcontrib" => Ok(Self::AllContrib),
            "zenodo" => Ok(Self::Zenodo),
            "codemeta" => Ok(Self::CodeMeta),
            "mailmap" => Ok(Self::Mailmap),
            "github" => Ok(Self::GitHub),
            _ => Err(anyhow::anyhow!("Unknown resource kind: {s}")),
        }
    }
}

/// The all-contributors emoji-key contribution vocabulary.
///
/// Contribution tags passed with `--ctype` must be one of these; see
/// <https://allcontributors.org/docs/en/emoji-key>.
pub const CONTRIBUTION_TYPES: &[&str] = &[
    "audio",
    "ally",
    "bug",
    "blog",
    "business",
    "code",
    "content",
    "data",
    "doc",
    "design",
    "example",
    "eventOrganizing",
    "financial",
    "fundingFinding",
    "ideas",
    "infra",
    "maintenance",
    "platform",
    "plugin",
    "projectManagement",
    "question",
    "review",
    "security",
    "tool",
    "translation",
    "test",
    "tutorial",
    "talk",
    "userTesting",
    "video",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_kinds() {
        assert_eq!(
            "allcontrib".parse::<ResourceKind>().unwrap(),
            ResourceKind::AllContrib
        );
        assert_eq!(
            "mailmap".parse::<ResourceKind>().unwrap(),
            ResourceKind::Mailmap
        );
    }

    #[test]
    fn test_parse_unknown_kind_fails() {
        assert!("bitbucket".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        for kind in [
            ResourceKind::AllContrib,
            ResourceKind::Zenodo,
            ResourceKind::CodeMeta,
            ResourceKind::Mailmap,
            ResourceKind::GitHub,
        ] {
            assert_eq!(kind.to_string().parse::<ResourceKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_capability_matrix() {
        assert!(ResourceKind::AllContrib.supports_init());
        assert!(ResourceKind::Zenodo.supports_init());
        assert!(!ResourceKind::CodeMeta.supports_init());
        assert!(!ResourceKind::Mailmap.supports_update());
        assert!(!ResourceKind::GitHub.supports_update_lookup());
        assert!(ResourceKind::Mailmap.supports_update_lookup());
    }

    #[test]
    fn test_contribution_vocabulary() {
        assert!(CONTRIBUTION_TYPES.contains(&"code"));
        assert!(!CONTRIBUTION_TYPES.contains(&"sorcery"));
    }
}
