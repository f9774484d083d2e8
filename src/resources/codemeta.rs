//! The `codemeta.json` adapter
//!
//! Codemeta persons are keyed by email or by ORCID iD (the `@id` URL), so
//! this is the one resource where both identifier kinds can point at
//! existing entries simultaneously, and therefore the one place the
//! conflicting-identity rule fires: when a cache entry's email and orcid
//! match two *different* persons, the merge for that person is skipped
//! with a [`MergeWarning`] rather than guessed at.
//!
//! `init` is not supported; codemeta has good generators already
//! (<https://codemeta.github.io/tools/>). `update` refreshes the document
//! metadata from the repository and reconciles by login, email, orcid, and
//! name.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::info;

use super::ResourceAdapter;
use crate::cache::{IdentityCache, IdentityRecord};
use crate::core::{ResourceKind, TributorsError};
use crate::merge::{MergeWarning, SourceKind, UpdateContext};
use crate::utils::{read_json_file, write_json_file};

const ORCID_URL_PREFIX: &str = "https://orcid.org/";

/// One `@type: Person` entry. Published field names are fixed by the
/// codemeta schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeMetaPerson {
    /// Always "Person"
    #[serde(rename = "@type")]
    pub person_type: String,
    /// Given name(s)
    #[serde(rename = "givenName", skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    /// Family name
    #[serde(rename = "familyName", skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    /// Contact email
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// ORCID iD as a full URL, e.g. `https://orcid.org/0000-0002-1825-0097`
    #[serde(rename = "@id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Fields this tool does not understand, preserved round-trip
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for CodeMetaPerson {
    fn default() -> Self {
        Self {
            person_type: "Person".to_string(),
            given_name: None,
            family_name: None,
            email: None,
            id: None,
            extra: serde_json::Map::new(),
        }
    }
}

impl CodeMetaPerson {
    /// The bare ORCID iD, when `@id` carries the registry URL.
    #[must_use]
    pub fn orcid(&self) -> Option<&str> {
        self.id.as_deref().map(|id| id.rsplit('/').next().unwrap_or(id))
    }

    /// `givenName familyName` joined, when either is present.
    #[must_use]
    pub fn full_name(&self) -> Option<String> {
        match (&self.given_name, &self.family_name) {
            (Some(given), Some(family)) => Some(format!("{given} {family}")),
            (Some(given), None) => Some(given.clone()),
            (None, Some(family)) => Some(family.clone()),
            (None, None) => None,
        }
    }

    /// Build a person from a display name split on the first space.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let mut person = Self::default();
        match name.split_once(' ') {
            Some((given, family)) => {
                person.given_name = Some(given.to_string());
                person.family_name = Some(family.to_string());
            }
            None => person.given_name = Some(name.to_string()),
        }
        person
    }
}

/// The `codemeta.json` document. Codemeta files carry many fields this
/// tool does not touch (`@context`, authors, versions); they ride along in
/// `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeMetaFile {
    #[serde(default)]
    pub contributor: Vec<CodeMetaPerson>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "codeRepository", default, skip_serializing_if = "Option::is_none")]
    pub code_repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "issueTracker", default, skip_serializing_if = "Option::is_none")]
    pub issue_tracker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<serde_json::Value>,
    /// Fields this tool does not understand, preserved round-trip
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The `codemeta.json` resource.
#[derive(Debug)]
pub struct CodeMetaResource {
    path: PathBuf,
    data: Option<CodeMetaFile>,
}

impl CodeMetaResource {
    /// Create an adapter for `path` (not yet loaded).
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path, data: None }
    }

    /// The loaded document.
    #[must_use]
    pub fn data(&self) -> Option<&CodeMetaFile> {
        self.data.as_ref()
    }

    fn persons(&self) -> &[CodeMetaPerson] {
        match &self.data {
            Some(data) => data.contributor.as_slice(),
            None => &[],
        }
    }

    /// email -> contributor index
    fn email_index(&self) -> BTreeMap<String, usize> {
        self.persons()
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.email.clone().map(|email| (email, i)))
            .collect()
    }

    /// orcid -> contributor index
    fn orcid_index(&self) -> BTreeMap<String, usize> {
        self.persons()
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.orcid().map(|orcid| (orcid.to_string(), i)))
            .collect()
    }

    fn person_from_cache(key: &str, record: &IdentityRecord) -> CodeMetaPerson {
        let mut person =
            CodeMetaPerson::from_name(record.name.as_deref().unwrap_or(key));
        person.email = record.email.clone();
        person.id = record
            .orcid
            .as_deref()
            .map(|orcid| format!("{ORCID_URL_PREFIX}{orcid}"));
        person
    }

    /// Refresh document metadata from the repository, filling only what
    /// the file does not already carry (keywords merge and deduplicate).
    fn update_metadata(&mut self, ctx: &UpdateContext<'_>) {
        let Some(metadata) = ctx.metadata else {
            return;
        };
        let Some(data) = self.data.as_mut() else {
            return;
        };
        for topic in &metadata.topics {
            if !data.keywords.iter().any(|k| k == topic) {
                data.keywords.push(topic.clone());
            }
        }
        data.keywords.sort();
        if data.description.is_none() {
            data.description.clone_from(&metadata.description);
        }
        if data.code_repository.is_none() {
            data.code_repository = Some(metadata.html_url.clone());
        }
        if data.name.is_none() {
            data.name = Some(metadata.name.clone());
        }
        if data.issue_tracker.is_none() {
            data.issue_tracker = Some(metadata.issues_url());
        }
        if data.license.is_none() {
            data.license = metadata.license_url().map(serde_json::Value::String);
        }
    }
}

impl ResourceAdapter for CodeMetaResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::CodeMeta
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
                hint: "Codemeta provides generators: https://codemeta.github.io/tools/"
                    .to_string(),
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

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<()> {
        info!("Updating {}", self.path.display());
        self.update_metadata(ctx);

        if ctx.wants(SourceKind::Login) {
            let emails = self.email_index();
            let orcids = self.orcid_index();
            let mut additions = Vec::new();
            for login in &ctx.sources.logins {
                let Some(cached) = ctx.cache.get(login) else {
                    continue;
                };
                let email = cached.email.as_deref();
                let orcid = cached.orcid.as_deref();
                // Only completely new persons are added, and only when at
                // least one stable identifier is known for them.
                if email.is_none() && orcid.is_none() {
                    continue;
                }
                if email.is_some_and(|e| emails.contains_key(e))
                    || orcid.is_some_and(|o| orcids.contains_key(o))
                {
                    continue;
                }
                info!("   Adding {login}");
                additions.push(Self::person_from_cache(login, cached));
            }
            if let Some(data) = self.data.as_mut() {
                data.contributor.extend(additions);
            }
        }

        if ctx.wants(SourceKind::Email) {
            let emails = self.email_index();
            let mut additions = Vec::new();
            for email in &ctx.sources.emails {
                if emails.contains_key(email) {
                    continue;
                }
                info!("   Adding email {email}");
                let person = match ctx.cache.find_by_email(email) {
                    Some((key, record)) => Self::person_from_cache(key, record),
                    None => CodeMetaPerson {
                        email: Some(email.clone()),
                        ..Default::default()
                    },
                };
                additions.push(person);
            }
            if let Some(data) = self.data.as_mut() {
                for person in additions {
                    if !data.contributor.contains(&person) {
                        data.contributor.push(person);
                    }
                }
            }
        }

        if ctx.wants(SourceKind::Orcid) {
            let orcids = self.orcid_index();
            let mut additions = Vec::new();
            for orcid in &ctx.sources.orcids {
                if orcids.contains_key(orcid) {
                    continue;
                }
                info!("   Adding orcid {orcid}");
                let person = match ctx.cache.find_by_orcid(orcid) {
                    Some((key, record)) => Self::person_from_cache(key, record),
                    None => CodeMetaPerson {
                        id: Some(format!("{ORCID_URL_PREFIX}{orcid}")),
                        ..Default::default()
                    },
                };
                additions.push(person);
            }
            if let Some(data) = self.data.as_mut() {
                for person in additions {
                    if !data.contributor.contains(&person) {
                        data.contributor.push(person);
                    }
                }
            }
        }

        if ctx.wants(SourceKind::Name) {
            let known = self.name_lookup();
            if let Some(data) = self.data.as_mut() {
                for name in &ctx.sources.names {
                    if !known.contains(name) {
                        info!("   Adding name stub {name}");
                        data.contributor.push(CodeMetaPerson::from_name(name));
                    }
                }
            }
        }

        Ok(())
    }

    fn update_lookup(&self, cache: &mut IdentityCache) -> Result<Vec<MergeWarning>> {
        info!("Updating cache from {}", self.path.display());
        let emails = self.email_index();
        let orcids = self.orcid_index();
        let mut warnings = Vec::new();
        let mut backfills: Vec<(String, IdentityRecord)> = Vec::new();

        for (login, record) in cache.all() {
            let email_match = record.email.as_deref().and_then(|e| emails.get(e));
            let orcid_match = record.orcid.as_deref().and_then(|o| orcids.get(o));

            let index = match (email_match, orcid_match) {
                // Both identifiers resolve: they must agree on the person.
                (Some(by_email), Some(by_orcid)) => {
                    if by_email != by_orcid {
                        warnings.push(MergeWarning {
                            login: login.clone(),
                            email: record.email.clone(),
                            orcid: record.orcid.clone(),
                            message: format!(
                                "Found email {} and orcid {} in cache from different entries, skipping",
                                record.email.as_deref().unwrap_or("?"),
                                record.orcid.as_deref().unwrap_or("?"),
                            ),
                        });
                        continue;
                    }
                    *by_email
                }
                (None, Some(by_orcid)) => *by_orcid,
                (Some(by_email), None) => *by_email,
                (None, None) => continue,
            };

            let Some(person) = self.persons().get(index) else {
                continue;
            };
            let mut partial = IdentityRecord::default();
            if record.name.is_none() {
                if let Some(name) = person.full_name() {
                    info!("   Updating {login} with name: {name}");
                    partial.name = Some(name);
                }
            }
            if record.email.is_none() {
                if let Some(email) = &person.email {
                    info!("   Updating {login} with email: {email}");
                    partial.email = Some(email.clone());
                }
            }
            if record.orcid.is_none() {
                if let Some(orcid) = person.orcid() {
                    info!("   Updating {login} with orcid: {orcid}");
                    partial.orcid = Some(orcid.to_string());
                }
            }
            if !partial.is_empty() {
                backfills.push((login.clone(), partial));
            }
        }

        for (login, partial) in backfills {
            cache.upsert(&login, partial);
        }
        Ok(warnings)
    }

    fn email_lookup(&self) -> BTreeSet<String> {
        self.email_index().into_keys().collect()
    }

    fn orcid_lookup(&self) -> BTreeSet<String> {
        self.orcid_index().into_keys().collect()
    }

    fn name_lookup(&self) -> BTreeSet<String> {
        self.persons().iter().filter_map(|p| p.full_name()).collect()
    }
}
