//! The `.all-contributorsrc` adapter
//!
//! The contributor-list file is login-keyed and carries a contribution tag
//! list per entry. It is the only resource with a contribution vocabulary,
//! so the by-name reconciliation stubs here carry the requested tag.
//!
//! `init` writes the standard empty document for the repository; `update`
//! reconciles by login (from the host enumeration) and by name; the
//! cache-backfill direction contributes names and profile URLs for logins
//! already present in the file.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::{InitContext, ResourceAdapter};
use crate::cache::{IdentityCache, IdentityRecord};
use crate::core::{CONTRIBUTION_TYPES, ResourceKind, TributorsError};
use crate::merge::{MergeWarning, SourceKind, UpdateContext};
use crate::utils::{read_json_file, write_json_file};

/// One contributor entry. Published field names are fixed by the
/// all-contributors ecosystem.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllContribEntry {
    /// GitHub login; absent only on name-only stubs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
    /// Display name (bare login when nothing richer is known)
    pub name: String,
    /// Avatar image URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Profile or blog URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    /// Contribution tags from the emoji-key vocabulary
    #[serde(default)]
    pub contributions: Vec<String>,
    /// Fields this tool does not understand, preserved round-trip
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The `.all-contributorsrc` document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllContribFile {
    #[serde(rename = "projectName")]
    pub project_name: String,
    #[serde(rename = "projectOwner")]
    pub project_owner: String,
    #[serde(rename = "repoType")]
    pub repo_type: String,
    #[serde(rename = "repoHost")]
    pub repo_host: String,
    pub files: Vec<String>,
    #[serde(rename = "imageSize")]
    pub image_size: u32,
    pub commit: bool,
    #[serde(rename = "commitConvention")]
    pub commit_convention: String,
    #[serde(default)]
    pub contributors: Vec<AllContribEntry>,
    #[serde(rename = "contributorsPerLine")]
    pub contributors_per_line: u32,
    /// Fields this tool does not understand, preserved round-trip
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AllContribFile {
    /// The standard empty document for `owner/name`.
    #[must_use]
    pub fn template(owner: &str, name: &str) -> Self {
        Self {
            project_name: name.to_string(),
            project_owner: owner.to_string(),
            repo_type: "github".to_string(),
            repo_host: "https://github.com".to_string(),
            files: vec!["README.md".to_string()],
            image_size: 100,
            commit: true,
            commit_convention: "none".to_string(),
            contributors: Vec::new(),
            contributors_per_line: 7,
            extra: serde_json::Map::new(),
        }
    }
}

/// The `.all-contributorsrc` resource.
#[derive(Debug)]
pub struct AllContribResource {
    path: PathBuf,
    data: Option<AllContribFile>,
}

impl AllContribResource {
    /// Create an adapter for `path` (not yet loaded).
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path, data: None }
    }

    /// The loaded document.
    #[must_use]
    pub fn data(&self) -> Option<&AllContribFile> {
        self.data.as_ref()
    }

    fn entries(&self) -> &[AllContribEntry] {
        match &self.data {
            Some(data) => data.contributors.as_slice(),
            None => &[],
        }
    }

    fn position_by_login(&self, login: &str) -> Option<usize> {
        self.entries()
            .iter()
            .position(|e| e.login.as_deref() == Some(login))
    }

    fn reconcile_login(&mut self, ctx: &mut UpdateContext<'_>, login: &str) {
        let cached = ctx.cache.get(login).cloned().unwrap_or_default();
        let contributor = ctx.repo.contributor(login);
        let ctype = ctx.ctype.to_string();

        let position = self.position_by_login(login);
        let Some(data) = self.data.as_mut() else {
            return;
        };

        let entry = match position {
            Some(position) => &mut data.contributors[position],
            None => {
                info!("   Adding {login}");
                data.contributors.push(AllContribEntry {
                    login: Some(login.to_string()),
                    name: cached.name.clone().unwrap_or_else(|| login.to_string()),
                    ..Default::default()
                });
                let last = data.contributors.len() - 1;
                &mut data.contributors[last]
            }
        };

        // Only fill profile and avatar when not set yet.
        if entry.profile.is_none() {
            entry.profile = cached
                .blog
                .clone()
                .or_else(|| contributor.and_then(|c| c.html_url.clone()));
        }
        if entry.avatar_url.is_none() {
            entry.avatar_url = contributor.and_then(|c| c.avatar_url.clone());
        }
        if !entry.contributions.iter().any(|c| c == &ctype) {
            entry.contributions.push(ctype);
        }
    }
}

impl ResourceAdapter for AllContribResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::AllContrib
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&mut self) -> Result<()> {
        if self.data.is_some() {
            return Ok(());
        }
        if !self.path.exists() {
            return Err(TributorsError::FileNotFound {
                path: self.path.display().to_string(),
                hint: "Set --allcontrib-file or run init to create it".to_string(),
            }
            .into());
        }
        self.data = Some(read_json_file(&self.path)?);
        Ok(())
    }

    fn save(&self) -> Result<()> {
        match &self.data {
            Some(data) => write_json_file(&self.path, data),
            None => Ok(()),
        }
    }

    fn init(&mut self, ctx: &InitContext<'_>) -> Result<()> {
        if self.path.exists() && !ctx.force {
            return Err(TributorsError::FileExists {
                path: self.path.display().to_string(),
            }
            .into());
        }
        info!("Generating {} for {}", self.path.display(), ctx.repo_uid);
        let (owner, name) = ctx
            .repo_uid
            .split_once('/')
            .ok_or_else(|| TributorsError::MalformedRepository {
                address: ctx.repo_uid.to_string(),
            })?;
        self.data = Some(AllContribFile::template(owner, name));
        self.save()
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<()> {
        if !CONTRIBUTION_TYPES.contains(&ctx.ctype) {
            return Err(TributorsError::InvalidContributionType {
                ctype: ctx.ctype.to_string(),
            }
            .into());
        }
        info!("Updating {}", self.path.display());

        // Sanity check that the file describes the repository we resolved.
        if let Some(data) = &self.data {
            let file_repo = format!("{}/{}", data.project_owner, data.project_name);
            if file_repo != ctx.repo.uid() {
                warn!(
                    "Found different repository {file_repo} in {}, updating from {}",
                    self.path.display(),
                    ctx.repo.uid()
                );
            }
        }

        if ctx.wants(SourceKind::Login) {
            for login in ctx.sources.logins.clone() {
                self.reconcile_login(ctx, &login);
            }
        }

        if ctx.wants(SourceKind::Name) {
            let known = self.name_lookup();
            let ctype = ctx.ctype.to_string();
            if let Some(data) = self.data.as_mut() {
                for name in &ctx.sources.names {
                    if !known.contains(name) {
                        info!("   Adding name stub {name}");
                        data.contributors.push(AllContribEntry {
                            name: name.clone(),
                            contributions: vec![ctype.clone()],
                            ..Default::default()
                        });
                    }
                }
            }
        }

        Ok(())
    }

    fn update_lookup(&self, cache: &mut IdentityCache) -> Result<Vec<MergeWarning>> {
        info!("Updating cache from {}", self.path.display());
        let mut backfills: Vec<(String, IdentityRecord)> = Vec::new();
        for entry in self.entries() {
            let Some(login) = entry.login.as_deref() else {
                continue;
            };
            backfills.push((
                login.to_string(),
                IdentityRecord {
                    name: Some(entry.name.clone()),
                    blog: entry.profile.clone(),
                    ..Default::default()
                },
            ));
        }
        for (login, partial) in backfills {
            cache.upsert(&login, partial);
        }
        Ok(Vec::new())
    }

    fn login_lookup(&self) -> BTreeSet<String> {
        self.entries()
            .iter()
            .filter_map(|e| e.login.clone())
            .collect()
    }

    fn name_lookup(&self) -> BTreeSet<String> {
        self.entries().iter().map(|e| e.name.clone()).collect()
    }
}
