//! The merge engine: enrichment, source gathering, and merge bookkeeping
//!
//! Two operations drive everything the tool does to the shared cache and
//! the resource files:
//!
//! - the **enrichment pass** ([`update_cache`]) grows the cache from the
//!   host profiles and the ORCID registry, first-known-value-wins per
//!   field, with one sanctioned exception: a name that is unset or exactly
//!   equal to the bare login may be upgraded to the registry's given+family
//!   name after a unique ORCID hit, because the bare-login placeholder is
//!   known-low-quality.
//! - the **reconciliation pass** (each adapter's `update`) merges cache and
//!   other-resource knowledge into one target file, driven by the requested
//!   [`SourceKind`]s collected into a [`SourceIdentifiers`] set.
//!
//! Conflicting matches (an email and an orcid resolving to two different
//! records) are never guessed at: the merge for that person is skipped and
//! a [`MergeWarning`] is surfaced for operator review.

use anyhow::Result;
use clap::ValueEnum;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

use crate::cache::{IdentityCache, IdentityRecord};
use crate::github::{Contributor, ContributorFilter, GitHubRepository, RepoMetadata, UserProfile};
use crate::orcid::{OrcidClient, SearchOutcome};

/// The identifier kinds a reconciliation pass can be driven by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// Host logins from the contributor enumeration (the default)
    Login,
    /// Email addresses from other resource files
    Email,
    /// ORCID iDs from other resource files
    Orcid,
    /// Display names from other resource files
    Name,
}

/// Identifier values gathered for one run: logins from the (filtered) host
/// enumeration, the rest unioned over the other resource files on disk.
///
/// Values are deduplicated; logins keep the host's order, the rest are
/// sorted so appended entries land in a reproducible order.
#[derive(Debug, Clone, Default)]
pub struct SourceIdentifiers {
    /// Host logins passing the inclusion rules, in enumeration order
    pub logins: Vec<String>,
    /// Email addresses, sorted
    pub emails: Vec<String>,
    /// ORCID iDs, sorted
    pub orcids: Vec<String>,
    /// Display names, sorted
    pub names: Vec<String>,
}

/// A skipped merge, kept as a value for operator review rather than only a
/// log line.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeWarning {
    /// The cache key whose merge was skipped
    pub login: String,
    /// The email side of the conflict, when present
    pub email: Option<String>,
    /// The orcid side of the conflict, when present
    pub orcid: Option<String>,
    /// Human-readable description
    pub message: String,
}

impl fmt::Display for MergeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Everything a reconciliation pass needs, threaded by the orchestrator.
///
/// The orchestrator owns the one [`IdentityCache`] and lends it here; no
/// component keeps a second copy.
pub struct UpdateContext<'a> {
    /// The shared identity cache
    pub cache: &'a mut IdentityCache,
    /// The repository, with its contributor enumeration already loaded
    pub repo: &'a GitHubRepository,
    /// Repository metadata, present when a target needs field synthesis
    pub metadata: Option<&'a RepoMetadata>,
    /// Gathered source identifier values
    pub sources: &'a SourceIdentifiers,
    /// Which identifier kinds to reconcile from
    pub kinds: &'a [SourceKind],
    /// The contribution tag for new contributor-list entries
    pub ctype: &'a str,
}

impl UpdateContext<'_> {
    /// Whether `kind` was requested for this pass.
    #[must_use]
    pub fn wants(&self, kind: SourceKind) -> bool {
        self.kinds.contains(&kind)
    }
}

/// The enrichment pass: grow the cache from host profiles and the ORCID
/// registry for every contributor passing the inclusion rules.
///
/// Profiles are pre-fetched once per run by the orchestrator and shared
/// across resources. The ORCID client is optional; without one (or once
/// the operator cancels the batch) entries are seeded from profiles only.
///
/// # Errors
/// Propagates cache access failures; registry search failures are treated
/// as "no match" and never abort the pass.
pub async fn update_cache(
    cache: &mut IdentityCache,
    contributors: &[Contributor],
    profiles: &BTreeMap<String, UserProfile>,
    filter: &ContributorFilter,
    mut orcid: Option<&mut OrcidClient>,
) -> Result<()> {
    for contributor in contributors {
        if !filter.include(contributor) {
            continue;
        }
        let login = contributor.login.as_str();
        let profile = profiles.get(login).cloned().unwrap_or_default();

        cache.upsert(
            login,
            IdentityRecord {
                name: non_empty(profile.name).or_else(|| Some(login.to_string())),
                email: non_empty(profile.email),
                bio: non_empty(profile.bio),
                blog: non_empty(profile.blog),
                ..Default::default()
            },
        );

        let entry = cache.entry_mut(login);
        if entry.orcid.is_some() || (entry.email.is_none() && entry.name.is_none()) {
            continue;
        }

        let Some(client) = orcid.as_deref_mut() else {
            continue;
        };
        if client.is_cancelled() {
            continue;
        }

        match client
            .search(entry.email.as_deref(), entry.name.as_deref())
            .await
        {
            SearchOutcome::Found(candidate) => {
                info!("Found ORCID {} for {login}", candidate.orcid);
                apply_orcid_hit(entry, login, &candidate);
            }
            SearchOutcome::NoMatch => {
                debug!("No unique ORCID match for {login}");
            }
            SearchOutcome::Cancelled => {
                info!("ORCID lookups cancelled, continuing without further searches");
            }
        }
    }
    Ok(())
}

/// Flatten a unique ORCID hit into a cache entry.
///
/// Records the identifier and fills affiliation when unset. The name is
/// the single field permitted to upgrade rather than first-wins: it is
/// replaced by the registry's given+family name only when it was unset or
/// exactly equal to the bare login, because that placeholder is
/// known-low-quality.
pub fn apply_orcid_hit(
    entry: &mut IdentityRecord,
    login: &str,
    candidate: &crate::orcid::OrcidCandidate,
) {
    entry.orcid = Some(candidate.orcid.clone());
    let placeholder = entry.name.is_none() || entry.name.as_deref() == Some(login);
    if placeholder {
        if let Some(full) = candidate.full_name() {
            entry.name = Some(full);
        }
    }
    if entry.affiliation.is_none() {
        entry.affiliation = candidate.affiliation().map(String::from);
    }
}

/// Treat an absent or empty profile field as unknown.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Insert `value` unless already present, preserving insertion order.
pub(crate) fn push_unique(values: &mut Vec<String>, value: &str) {
    if !values.iter().any(|v| v == value) {
        values.push(value.to_string());
    }
}

impl SourceIdentifiers {
    /// Gather values for the requested kinds: logins from the filtered host
    /// enumeration, the rest from the given resource lookup views.
    #[must_use]
    pub fn gather(
        kinds: &[SourceKind],
        contributors: &[Contributor],
        filter: &ContributorFilter,
        others: &[&dyn crate::resources::ResourceAdapter],
    ) -> Self {
        let mut sources = Self::default();

        if kinds.contains(&SourceKind::Login) {
            for contributor in contributors {
                if filter.include(contributor) {
                    push_unique(&mut sources.logins, &contributor.login);
                }
            }
        }

        for adapter in others {
            if kinds.contains(&SourceKind::Email) {
                for email in adapter.email_lookup() {
                    push_unique(&mut sources.emails, &email);
                }
            }
            if kinds.contains(&SourceKind::Orcid) {
                for orcid in adapter.orcid_lookup() {
                    push_unique(&mut sources.orcids, &orcid);
                }
            }
            if kinds.contains(&SourceKind::Name) {
                for name in adapter.name_lookup() {
                    push_unique(&mut sources.names, &name);
                }
            }
        }

        sources.emails.sort();
        sources.orcids.sort();
        sources.names.sort();
        sources
    }
}
