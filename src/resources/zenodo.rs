//! The `.zenodo.json` adapter
//!
//! The deposit descriptor carries a `creators` list keyed by nothing more
//! stable than name and (sometimes) ORCID iD. `init` synthesizes the
//! document from a deposit record fetched by DOI plus the already-enriched
//! cache; `update` reconciles by login, by orcid, and by name; the
//! cache-backfill direction matches creators to cache entries by ORCID iD.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use super::{InitContext, ResourceAdapter};
use crate::cache::{IdentityCache, IdentityRecord};
use crate::core::{ResourceKind, TributorsError};
use crate::merge::{MergeWarning, SourceKind, UpdateContext};
use crate::utils::{read_json_file, write_json_file};

const RECORDS_URL: &str = "https://zenodo.org/api/records";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One creator entry. Published field names are fixed by the Zenodo
/// deposit schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZenodoCreator {
    /// Display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// ORCID iD
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orcid: Option<String>,
    /// Institutional affiliation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
    /// Fields this tool does not understand, preserved round-trip
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The `.zenodo.json` document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZenodoFile {
    #[serde(default)]
    pub creators: Vec<ZenodoCreator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_type: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_right: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<serde_json::Value>,
    /// Fields this tool does not understand, preserved round-trip
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A deposit record fetched from the records API, the init-time input.
#[derive(Debug, Clone, Deserialize)]
pub struct DepositRecord {
    /// The record metadata block
    pub metadata: DepositMetadata,
}

/// The metadata block of a deposit record.
#[derive(Debug, Clone, Deserialize)]
pub struct DepositMetadata {
    #[serde(default)]
    pub creators: Vec<ZenodoCreator>,
    #[serde(default)]
    pub resource_type: Option<DepositResourceType>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub access_right: Option<String>,
    #[serde(default)]
    pub license: Option<serde_json::Value>,
}

/// The `resource_type` block of a deposit record.
#[derive(Debug, Clone, Deserialize)]
pub struct DepositResourceType {
    /// The upload type, e.g. "software"
    #[serde(rename = "type")]
    pub kind: String,
}

/// Fetch a deposit record by DOI from the records API.
///
/// The record id is the trailing DOI segment with any `zenodo.` prefix
/// stripped. `ZENODO_TOKEN` is attached when exported.
///
/// # Errors
/// Fatal [`TributorsError::ApiError`] on any non-success response.
pub async fn fetch_deposit(doi: &str) -> Result<DepositRecord> {
    let record = doi
        .rsplit('/')
        .next()
        .unwrap_or(doi)
        .replace("zenodo.", "");
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("tributors/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let mut request = client.get(format!("{RECORDS_URL}/{record}"));
    if let Ok(token) = std::env::var("ZENODO_TOKEN") {
        request = request.query(&[("access_token", token)]);
    }
    let response = request.send().await.map_err(|e| TributorsError::ApiError {
        status: 0,
        reason: e.to_string(),
        what: format!("zenodo {doi}"),
    })?;
    let status = response.status();
    if !status.is_success() {
        return Err(TributorsError::ApiError {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("unknown").to_string(),
            what: format!("zenodo {doi}"),
        }
        .into());
    }
    Ok(response.json().await?)
}

/// Extract a license id from either the string or `{"id": ...}` shape.
fn license_id(value: &serde_json::Value) -> Option<serde_json::Value> {
    match value {
        serde_json::Value::String(_) => Some(value.clone()),
        serde_json::Value::Object(map) => map.get("id").cloned(),
        _ => None,
    }
}

/// The `.zenodo.json` resource.
#[derive(Debug)]
pub struct ZenodoResource {
    path: PathBuf,
    data: Option<ZenodoFile>,
}

impl ZenodoResource {
    /// Create an adapter for `path` (not yet loaded).
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path, data: None }
    }

    /// The loaded document.
    #[must_use]
    pub fn data(&self) -> Option<&ZenodoFile> {
        self.data.as_ref()
    }

    fn creators(&self) -> &[ZenodoCreator] {
        match &self.data {
            Some(data) => data.creators.as_slice(),
            None => &[],
        }
    }

    fn creator_from_cache(key: &str, record: &IdentityRecord) -> ZenodoCreator {
        ZenodoCreator {
            name: Some(record.name.clone().unwrap_or_else(|| key.to_string())),
            orcid: record.orcid.clone(),
            affiliation: record.affiliation.clone().or_else(|| record.bio.clone()),
            ..Default::default()
        }
    }
}

impl ResourceAdapter for ZenodoResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Zenodo
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
                hint: "Set --zenodo-file or run init --doi to create it".to_string(),
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
        let record = ctx.deposit.ok_or(TributorsError::MissingDoi)?;
        info!("Generating {}", self.path.display());

        // Start from the deposit's own creators and add known contributors.
        let mut creators = record.metadata.creators.clone();
        for (key, cached) in ctx.cache.all() {
            creators.push(Self::creator_from_cache(key, cached));
        }

        let mut keywords: Vec<String> = record.metadata.keywords.clone();
        for topic in ctx.topics {
            if !keywords.iter().any(|k| k == topic) {
                keywords.push(topic.clone());
            }
        }
        keywords.sort();

        self.data = Some(ZenodoFile {
            creators,
            upload_type: record.metadata.resource_type.as_ref().map(|r| r.kind.clone()),
            keywords,
            access_right: record.metadata.access_right.clone(),
            license: record.metadata.license.as_ref().and_then(license_id),
            extra: serde_json::Map::new(),
        });
        self.save()
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<()> {
        info!("Updating {}", self.path.display());

        if ctx.wants(SourceKind::Login) {
            let orcids = self.orcid_lookup();
            let names = self.name_lookup();
            let mut additions = Vec::new();
            for login in &ctx.sources.logins {
                let cached = ctx.cache.get(login).cloned().unwrap_or_default();
                let name = cached.name.clone().unwrap_or_else(|| login.clone());
                // Skip when the target already knows this person by orcid
                // or by name.
                if let Some(orcid) = cached.orcid.as_deref() {
                    if orcids.contains(orcid) {
                        continue;
                    }
                }
                if names.contains(&name) {
                    continue;
                }
                info!("   Adding {login}");
                additions.push(Self::creator_from_cache(login, &cached));
            }
            if let Some(data) = self.data.as_mut() {
                data.creators.extend(additions);
            }
        }

        if ctx.wants(SourceKind::Orcid) {
            let known = self.orcid_lookup();
            let mut additions = Vec::new();
            for orcid in &ctx.sources.orcids {
                if known.contains(orcid) {
                    continue;
                }
                info!("   Adding orcid {orcid}");
                let creator = match ctx.cache.find_by_orcid(orcid) {
                    Some((key, record)) => Self::creator_from_cache(key, record),
                    None => ZenodoCreator {
                        orcid: Some(orcid.clone()),
                        ..Default::default()
                    },
                };
                additions.push(creator);
            }
            if let Some(data) = self.data.as_mut() {
                for creator in additions {
                    if !data.creators.contains(&creator) {
                        data.creators.push(creator);
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
                        data.creators.push(ZenodoCreator {
                            name: Some(name.clone()),
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
        // Creators are matched to cache entries by ORCID iD directly.
        let mut backfills: Vec<(String, IdentityRecord)> = Vec::new();
        for creator in self.creators() {
            let Some(orcid) = creator.orcid.as_deref() else {
                continue;
            };
            if let Some((key, _)) = cache.find_by_orcid(orcid) {
                backfills.push((
                    key.to_string(),
                    IdentityRecord {
                        name: creator.name.clone(),
                        affiliation: creator.affiliation.clone(),
                        ..Default::default()
                    },
                ));
            }
        }
        for (key, partial) in backfills {
            cache.upsert(&key, partial);
        }
        Ok(Vec::new())
    }

    fn orcid_lookup(&self) -> BTreeSet<String> {
        self.creators()
            .iter()
            .filter_map(|c| c.orcid.clone())
            .collect()
    }

    fn name_lookup(&self) -> BTreeSet<String> {
        self.creators()
            .iter()
            .filter_map(|c| c.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::GitHubRepository;
    use crate::merge::SourceIdentifiers;
    use tempfile::TempDir;

    fn empty_file(temp: &TempDir) -> ZenodoResource {
        let path = temp.path().join(".zenodo.json");
        std::fs::write(
            &path,
            serde_json::json!({
                "creators": [],
                "upload_type": "software",
                "keywords": ["singularity", "containers"]
            })
            .to_string(),
        )
        .unwrap();
        let mut resource = ZenodoResource::new(path);
        resource.load().unwrap();
        resource
    }

    fn ctx_with<'a>(
        cache: &'a mut IdentityCache,
        repo: &'a GitHubRepository,
        sources: &'a SourceIdentifiers,
        kinds: &'a [SourceKind],
    ) -> UpdateContext<'a> {
        UpdateContext {
            cache,
            repo,
            metadata: None,
            sources,
            kinds,
            ctype: "code",
        }
    }

    #[test]
    fn test_update_by_login_uses_cache_fields() {
        let temp = TempDir::new().unwrap();
        let mut resource = empty_file(&temp);
        let mut cache = IdentityCache::ephemeral();
        cache.upsert(
            "vsoch",
            IdentityRecord {
                name: Some("Vanessa Sochat".to_string()),
                orcid: Some("0000-0002-4387-3819".to_string()),
                affiliation: Some("LLNL".to_string()),
                ..Default::default()
            },
        );
        let repo = GitHubRepository::with_contributors("singularityhub/sregistry", vec![]);
        let sources = SourceIdentifiers {
            logins: vec!["vsoch".to_string(), "manbat".to_string()],
            ..Default::default()
        };

        let mut ctx = ctx_with(&mut cache, &repo, &sources, &[SourceKind::Login]);
        resource.update(&mut ctx).unwrap();

        let creators = &resource.data().unwrap().creators;
        assert_eq!(creators.len(), 2);
        assert_eq!(creators[0].name.as_deref(), Some("Vanessa Sochat"));
        assert_eq!(creators[0].orcid.as_deref(), Some("0000-0002-4387-3819"));
        assert_eq!(creators[0].affiliation.as_deref(), Some("LLNL"));
        assert_eq!(creators[1].name.as_deref(), Some("manbat"));
    }

    #[test]
    fn test_update_by_login_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let mut resource = empty_file(&temp);
        let mut cache = IdentityCache::ephemeral();
        let repo = GitHubRepository::with_contributors("singularityhub/sregistry", vec![]);
        let sources = SourceIdentifiers {
            logins: vec!["vsoch".to_string()],
            ..Default::default()
        };

        for _ in 0..2 {
            let mut ctx = ctx_with(&mut cache, &repo, &sources, &[SourceKind::Login]);
            resource.update(&mut ctx).unwrap();
        }
        assert_eq!(resource.data().unwrap().creators.len(), 1);
    }

    #[test]
    fn test_update_by_orcid_appends_stub() {
        let temp = TempDir::new().unwrap();
        let mut resource = empty_file(&temp);
        let mut cache = IdentityCache::ephemeral();
        let repo = GitHubRepository::with_contributors("singularityhub/sregistry", vec![]);
        let sources = SourceIdentifiers {
            orcids: vec!["0000-0000-0000-0000".to_string()],
            ..Default::default()
        };

        for _ in 0..2 {
            let mut ctx = ctx_with(&mut cache, &repo, &sources, &[SourceKind::Orcid]);
            resource.update(&mut ctx).unwrap();
        }

        let creators = &resource.data().unwrap().creators;
        assert_eq!(creators.len(), 1);
        assert_eq!(creators[0].orcid.as_deref(), Some("0000-0000-0000-0000"));
        assert!(creators[0].name.is_none());
    }

    #[test]
    fn test_update_by_email_is_noop() {
        let temp = TempDir::new().unwrap();
        let mut resource = empty_file(&temp);
        let mut cache = IdentityCache::ephemeral();
        let repo = GitHubRepository::with_contributors("singularityhub/sregistry", vec![]);
        let sources = SourceIdentifiers {
            emails: vec!["poodles@dog.com".to_string()],
            ..Default::default()
        };

        let mut ctx = ctx_with(&mut cache, &repo, &sources, &[SourceKind::Email]);
        resource.update(&mut ctx).unwrap();
        assert!(resource.data().unwrap().creators.is_empty());
    }

    #[test]
    fn test_update_lookup_matches_by_orcid() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".zenodo.json");
        std::fs::write(
            &path,
            serde_json::json!({
                "creators": [
                    {"name": "Halchenko, Yaroslav", "orcid": "0000-0003-3456-2493",
                     "affiliation": "Dartmouth College"}
                ]
            })
            .to_string(),
        )
        .unwrap();
        let mut resource = ZenodoResource::new(path);
        resource.load().unwrap();

        let mut cache = IdentityCache::ephemeral();
        cache.upsert(
            "yarikoptic",
            IdentityRecord {
                orcid: Some("0000-0003-3456-2493".to_string()),
                ..Default::default()
            },
        );
        resource.update_lookup(&mut cache).unwrap();

        let entry = cache.get("yarikoptic").unwrap();
        assert_eq!(entry.name.as_deref(), Some("Halchenko, Yaroslav"));
        assert_eq!(entry.affiliation.as_deref(), Some("Dartmouth College"));
    }

    #[test]
    fn test_license_id_shapes() {
        assert_eq!(
            license_id(&serde_json::json!("MIT")),
            Some(serde_json::json!("MIT"))
        );
        assert_eq!(
            license_id(&serde_json::json!({"id": "mit-license"})),
            Some(serde_json::json!("mit-license"))
        );
        assert_eq!(license_id(&serde_json::json!(42)), None);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let temp = TempDir::new().unwrap();
        let mut resource = ZenodoResource::new(temp.path().join(".zenodo.json"));
        let err = resource.load().unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
