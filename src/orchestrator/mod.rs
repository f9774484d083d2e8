//! The orchestrator: one cache, one run, many resources
//!
//! [`TributorsClient`] owns the single [`IdentityCache`] instance for a run
//! and sequences the `init`, `update`, and `update-lookup` actions across
//! the requested resources, passing a scoped mutable reference to each
//! pass; no component stores a second copy of the cache.
//!
//! All registry I/O happens here: the contributor enumeration and profile
//! fetches are performed once per run and shared across every resource, as
//! are the repository metadata and the ORCID client. The resource adapters
//! themselves stay synchronous.

use anyhow::Result;
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::cache::{CACHE_FILENAME, IdentityCache};
use crate::core::{ResourceKind, TributorsError};
use crate::github::{ContributorFilter, GitHubRepository, RepoMetadata, UserProfile};
use crate::merge::{self, SourceIdentifiers, SourceKind};
use crate::orcid::OrcidClient;
use crate::resources::{self, InitContext, ResourceAdapter};

/// Per-resource file path overrides from the CLI.
#[derive(Debug, Clone, Default)]
pub struct FileOverrides {
    /// `--allcontrib-file`
    pub allcontrib: Option<PathBuf>,
    /// `--zenodo-file`
    pub zenodo: Option<PathBuf>,
    /// `--codemeta-file`
    pub codemeta: Option<PathBuf>,
    /// `--mailmap-file`
    pub mailmap: Option<PathBuf>,
}

impl FileOverrides {
    /// The override for `kind`, when one was given.
    #[must_use]
    pub fn for_kind(&self, kind: ResourceKind) -> Option<PathBuf> {
        match kind {
            ResourceKind::AllContrib => self.allcontrib.clone(),
            ResourceKind::Zenodo => self.zenodo.clone(),
            ResourceKind::CodeMeta => self.codemeta.clone(),
            ResourceKind::Mailmap => self.mailmap.clone(),
            ResourceKind::GitHub => None,
        }
    }

    /// The effective path for `kind`: the override or the default filename.
    #[must_use]
    pub fn path_for(&self, kind: ResourceKind) -> PathBuf {
        self.for_kind(kind)
            .unwrap_or_else(|| PathBuf::from(kind.default_filename()))
    }
}

/// Options for the `init` action.
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Resources to initialize
    pub resources: Vec<ResourceKind>,
    /// Explicit repository address
    pub repo: Option<String>,
    /// Overwrite existing files
    pub force: bool,
    /// Zenodo DOI, required when initializing zenodo
    pub doi: Option<String>,
    /// Per-file path overrides
    pub files: FileOverrides,
}

/// Options for the `update` action.
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    /// Resources to reconcile into
    pub resources: Vec<ResourceKind>,
    /// Explicit repository address
    pub repo: Option<String>,
    /// Minimum contribution count for inclusion
    pub thresh: u64,
    /// Contribution tag for new contributor-list entries
    pub ctype: String,
    /// Logins to skip
    pub skip_users: Vec<String>,
    /// Identifier kinds to reconcile from
    pub kinds: Vec<SourceKind>,
    /// Resolve ambiguous ORCID searches at the terminal
    pub interactive: bool,
    /// Per-file path overrides
    pub files: FileOverrides,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            resources: Vec::new(),
            repo: None,
            thresh: 1,
            ctype: "code".to_string(),
            skip_users: Vec::new(),
            kinds: vec![SourceKind::Login],
            interactive: false,
            files: FileOverrides::default(),
        }
    }
}

/// Options for the `update-lookup` action.
#[derive(Debug, Clone, Default)]
pub struct LookupOptions {
    /// Resources to read; empty means auto-detect by file existence
    pub resources: Vec<ResourceKind>,
    /// Per-file path overrides
    pub files: FileOverrides,
}

/// The handler for one or more contributor metadata actions. Loads the
/// cache once, threads it through every pass, and persists it at the end.
#[derive(Debug)]
pub struct TributorsClient {
    cache: IdentityCache,
}

impl TributorsClient {
    /// Load the cache from the working directory, or start ephemeral under
    /// `--skip-cache`.
    ///
    /// # Errors
    /// Fails when an existing cache file is not valid JSON.
    pub fn new(skip_cache: bool) -> Result<Self> {
        let cache = if skip_cache {
            IdentityCache::ephemeral()
        } else {
            IdentityCache::load(Path::new(CACHE_FILENAME))?
        };
        Ok(Self { cache })
    }

    /// The shared cache (primarily for inspection in tests).
    #[must_use]
    pub fn cache(&self) -> &IdentityCache {
        &self.cache
    }

    /// Initialize one or more resource files.
    ///
    /// # Errors
    /// Fatal on an existing file without `--force`, a missing repository
    /// address, or (for zenodo) a missing DOI or failed record fetch.
    pub async fn init(&mut self, opts: InitOptions) -> Result<()> {
        let mut repo = GitHubRepository::new(opts.repo.as_deref()).await?;

        // Zenodo synthesis needs the deposit record, the repository topics,
        // and an enriched cache; fetch them only when zenodo is requested.
        let wants_zenodo = opts.resources.contains(&ResourceKind::Zenodo);
        let deposit = match &opts.doi {
            Some(doi) if wants_zenodo => Some(resources::fetch_deposit(doi).await?),
            None if wants_zenodo => return Err(TributorsError::MissingDoi.into()),
            _ => None,
        };
        let topics = if wants_zenodo {
            match repo.metadata().await {
                Ok(metadata) => metadata.topics.clone(),
                Err(e) => {
                    warn!("Could not fetch repository topics: {e}");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };
        if wants_zenodo {
            let filter = ContributorFilter {
                thresh: 1,
                skip_users: Vec::new(),
            };
            self.enrich(&mut repo, &filter, None).await?;
        }

        for kind in &opts.resources {
            if *kind == ResourceKind::CodeMeta {
                println!(
                    "Codemeta provides several tools to generate this for you: https://codemeta.github.io/tools/"
                );
                continue;
            }
            if !kind.supports_init() {
                anyhow::bail!("{kind} does not support init");
            }
            let mut adapter = resources::get_adapter(*kind, opts.files.for_kind(*kind))?;
            let ctx = InitContext {
                repo_uid: repo.uid(),
                force: opts.force,
                deposit: deposit.as_ref(),
                topics: &topics,
                cache: &self.cache,
            };
            adapter.init(&ctx)?;
            println!("{} Initialized {}", "✓".green(), adapter.path().display());
        }

        self.cache.save()
    }

    /// Update one or more resource files from the host, the registries,
    /// and each other.
    ///
    /// # Errors
    /// Fatal on a missing required file, a failed mandatory registry call,
    /// or an invalid contribution type.
    pub async fn update(&mut self, opts: UpdateOptions) -> Result<()> {
        // Configuration preconditions fail before any registry work.
        if opts.resources.contains(&ResourceKind::AllContrib)
            && !crate::core::CONTRIBUTION_TYPES.contains(&opts.ctype.as_str())
        {
            return Err(TributorsError::InvalidContributionType {
                ctype: opts.ctype.clone(),
            }
            .into());
        }
        for kind in &opts.resources {
            if !kind.supports_update() {
                anyhow::bail!("{kind} does not support update");
            }
            resources::get_adapter(*kind, opts.files.for_kind(*kind))?.load()?;
        }

        let mut repo = GitHubRepository::new(opts.repo.as_deref()).await?;
        let filter = ContributorFilter {
            thresh: opts.thresh,
            skip_users: opts.skip_users.clone(),
        };

        let mut orcid = OrcidClient::connect(opts.interactive).await?;
        self.enrich(&mut repo, &filter, Some(&mut orcid)).await?;

        let metadata = if opts.resources.contains(&ResourceKind::CodeMeta) {
            match repo.metadata().await {
                Ok(metadata) => Some(metadata.clone()),
                Err(e) => {
                    warn!("Could not fetch repository metadata: {e}");
                    None
                }
            }
        } else {
            None
        };

        self.run_update_passes(&repo, metadata.as_ref(), &filter, &opts)?;
        self.cache.save()
    }

    /// The offline portion of `update`: gather sources, then for each
    /// target backfill the cache from the file and reconcile into it.
    ///
    /// Split from [`update`](Self::update) so the merge behavior can be
    /// driven without any registry access.
    ///
    /// # Errors
    /// Fatal on a missing required file or an invalid contribution type.
    pub fn run_update_passes(
        &mut self,
        repo: &GitHubRepository,
        metadata: Option<&RepoMetadata>,
        filter: &ContributorFilter,
        opts: &UpdateOptions,
    ) -> Result<()> {
        let sources = self.gather_sources(repo, filter, opts);

        for kind in &opts.resources {
            if !kind.supports_update() {
                anyhow::bail!("{kind} does not support update");
            }
            let mut adapter = resources::get_adapter(*kind, opts.files.for_kind(*kind))?;
            adapter.load()?;

            for warning in adapter.update_lookup(&mut self.cache)? {
                warn!("{warning}");
            }

            let mut ctx = merge::UpdateContext {
                cache: &mut self.cache,
                repo,
                metadata,
                sources: &sources,
                kinds: &opts.kinds,
                ctype: &opts.ctype,
            };
            adapter.update(&mut ctx)?;
            adapter.save()?;
            println!("{} Updated {}", "✓".green(), adapter.path().display());
        }
        Ok(())
    }

    /// Update the cache from existing resource files (`update-lookup`).
    ///
    /// With no resources given, every resource whose file exists is read;
    /// finding none is a fatal configuration error.
    ///
    /// # Errors
    /// Fatal when nothing is detected or a named file is missing/invalid.
    pub fn update_lookup(&mut self, opts: &LookupOptions) -> Result<()> {
        let kinds = if opts.resources.is_empty() {
            let detected = self.detect_resources(&opts.files);
            if detected.is_empty() {
                return Err(TributorsError::NoResourcesDetected.into());
            }
            detected
        } else {
            opts.resources.clone()
        };

        for kind in kinds {
            if !kind.supports_update_lookup() {
                anyhow::bail!("{kind} does not support update-lookup");
            }
            let mut adapter = resources::get_adapter(kind, opts.files.for_kind(kind))?;
            adapter.load()?;
            for warning in adapter.update_lookup(&mut self.cache)? {
                warn!("{warning}");
            }
            println!("{} Updated lookup from {}", "✓".green(), adapter.path().display());
        }

        self.cache.save()
    }

    /// Run the enrichment pass: fetch profiles once for every included
    /// login, then grow the cache (with ORCID searches when a client is
    /// given).
    async fn enrich(
        &mut self,
        repo: &mut GitHubRepository,
        filter: &ContributorFilter,
        orcid: Option<&mut OrcidClient>,
    ) -> Result<()> {
        repo.contributors().await?;

        let mut profiles: BTreeMap<String, UserProfile> = BTreeMap::new();
        let logins: Vec<String> = repo
            .loaded_contributors()
            .iter()
            .filter(|c| filter.include(c))
            .map(|c| c.login.clone())
            .collect();
        for login in logins {
            info!("Looking up profile for {login}");
            let profile = repo.get_user(&login).await?;
            profiles.insert(login, profile);
        }

        merge::update_cache(
            &mut self.cache,
            repo.loaded_contributors(),
            &profiles,
            filter,
            orcid,
        )
        .await
    }

    /// Gather the source identifier values for this run from the host
    /// enumeration and from every resource file present on disk.
    fn gather_sources(
        &self,
        repo: &GitHubRepository,
        filter: &ContributorFilter,
        opts: &UpdateOptions,
    ) -> SourceIdentifiers {
        let mut loaded: Vec<Box<dyn ResourceAdapter>> = Vec::new();
        for kind in self.detect_resources(&opts.files) {
            match resources::get_adapter(kind, opts.files.for_kind(kind)) {
                Ok(mut adapter) => match adapter.load() {
                    Ok(()) => loaded.push(adapter),
                    Err(e) => warn!("Skipping {kind} as a source: {e}"),
                },
                Err(e) => warn!("Skipping {kind} as a source: {e}"),
            }
        }
        let views: Vec<&dyn ResourceAdapter> =
            loaded.iter().map(|adapter| adapter.as_ref()).collect();
        SourceIdentifiers::gather(
            &opts.kinds,
            repo.loaded_contributors(),
            filter,
            &views,
        )
    }

    /// The file resources present on disk, honoring path overrides.
    fn detect_resources(&self, files: &FileOverrides) -> Vec<ResourceKind> {
        [
            ResourceKind::AllContrib,
            ResourceKind::Zenodo,
            ResourceKind::CodeMeta,
            ResourceKind::Mailmap,
        ]
        .into_iter()
        .filter(|kind| files.path_for(*kind).exists())
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::IdentityRecord;
    use crate::github::Contributor;
    use tempfile::TempDir;

    fn contributor(login: &str, contributions: u64, kind: &str) -> Contributor {
        Contributor {
            login: login.to_string(),
            contributions,
            kind: kind.to_string(),
            avatar_url: Some(format!("https://avatars.example.com/{login}")),
            html_url: Some(format!("https://github.com/{login}")),
        }
    }

    fn allcontrib_template(temp: &TempDir) -> PathBuf {
        let path = temp.path().join(".all-contributorsrc");
        std::fs::write(
            &path,
            serde_json::json!({
                "projectName": "repo",
                "projectOwner": "owner",
                "repoType": "github",
                "repoHost": "https://github.com",
                "files": ["README.md"],
                "imageSize": 100,
                "commit": true,
                "commitConvention": "none",
                "contributors": [],
                "contributorsPerLine": 7
            })
            .to_string(),
        )
        .unwrap();
        path
    }

    fn update_opts(temp: &TempDir, path: PathBuf) -> UpdateOptions {
        UpdateOptions {
            resources: vec![ResourceKind::AllContrib],
            files: FileOverrides {
                allcontrib: Some(path),
                zenodo: Some(temp.path().join(".zenodo.json")),
                codemeta: Some(temp.path().join("codemeta.json")),
                mailmap: Some(temp.path().join(".mailmap")),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_end_to_end_login_reconciliation() {
        let temp = TempDir::new().unwrap();
        let path = allcontrib_template(&temp);

        let repo = GitHubRepository::with_contributors(
            "owner/repo",
            vec![
                contributor("vsoch", 50, "User"),
                contributor("manbat", 10, "User"),
                contributor("yarikoptic", 5, "User"),
                contributor("dependabot[bot]", 100, "User"),
                contributor("roboto", 100, "Bot"),
                contributor("drive-by", 0, "User"),
            ],
        );
        let filter = ContributorFilter {
            thresh: 1,
            skip_users: Vec::new(),
        };
        let mut client = TributorsClient::new(true).unwrap();
        let opts = update_opts(&temp, path.clone());

        client
            .run_update_passes(&repo, None, &filter, &opts)
            .unwrap();

        let data: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let contributors = data["contributors"].as_array().unwrap();
        assert_eq!(contributors.len(), 3);
        for entry in contributors {
            let login = entry["login"].as_str().unwrap();
            assert!(["vsoch", "manbat", "yarikoptic"].contains(&login));
            // No richer name known: the bare login stands in.
            assert_eq!(entry["name"].as_str().unwrap(), login);
            assert_eq!(entry["contributions"], serde_json::json!(["code"]));
        }

        // A second update from email/orcid sources (none in cache) must
        // leave the file unchanged.
        let first = std::fs::read_to_string(&path).unwrap();
        let opts = UpdateOptions {
            kinds: vec![SourceKind::Email, SourceKind::Orcid],
            ..update_opts(&temp, path.clone())
        };
        client
            .run_update_passes(&repo, None, &filter, &opts)
            .unwrap();
        let second = std::fs::read_to_string(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_update_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let path = allcontrib_template(&temp);
        let repo = GitHubRepository::with_contributors(
            "owner/repo",
            vec![contributor("vsoch", 50, "User")],
        );
        let filter = ContributorFilter::default();
        let mut client = TributorsClient::new(true).unwrap();
        let opts = update_opts(&temp, path.clone());

        client.run_update_passes(&repo, None, &filter, &opts).unwrap();
        let first = std::fs::read_to_string(&path).unwrap();
        client.run_update_passes(&repo, None, &filter, &opts).unwrap();
        let second = std::fs::read_to_string(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_update_missing_file_is_fatal() {
        let temp = TempDir::new().unwrap();
        let repo = GitHubRepository::with_contributors("owner/repo", vec![]);
        let mut client = TributorsClient::new(true).unwrap();
        let opts = update_opts(&temp, temp.path().join(".all-contributorsrc"));

        let err = client
            .run_update_passes(&repo, None, &ContributorFilter::default(), &opts)
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_update_lookup_auto_detect_failure() {
        let temp = TempDir::new().unwrap();
        let mut client = TributorsClient::new(true).unwrap();
        let opts = LookupOptions {
            resources: Vec::new(),
            files: FileOverrides {
                allcontrib: Some(temp.path().join(".all-contributorsrc")),
                zenodo: Some(temp.path().join(".zenodo.json")),
                codemeta: Some(temp.path().join("codemeta.json")),
                mailmap: Some(temp.path().join(".mailmap")),
            },
        };
        let err = client.update_lookup(&opts).unwrap_err();
        assert!(err.to_string().contains("auto-detected"));
    }

    #[test]
    fn test_update_lookup_from_mailmap() {
        let temp = TempDir::new().unwrap();
        let mailmap = temp.path().join(".mailmap");
        std::fs::write(&mailmap, "Vanessa Sochat <vsoch@example.com>\n").unwrap();

        let mut client = TributorsClient::new(true).unwrap();
        client.cache.upsert(
            "vsoch",
            IdentityRecord {
                email: Some("vsoch@example.com".to_string()),
                ..Default::default()
            },
        );
        let opts = LookupOptions {
            resources: vec![ResourceKind::Mailmap],
            files: FileOverrides {
                mailmap: Some(mailmap),
                ..Default::default()
            },
        };
        client.update_lookup(&opts).unwrap();
        assert_eq!(
            client.cache().get("vsoch").unwrap().name.as_deref(),
            Some("Vanessa Sochat")
        );
    }

    #[test]
    fn test_sources_gathered_from_other_resources() {
        let temp = TempDir::new().unwrap();
        let allcontrib = allcontrib_template(&temp);
        let mailmap = temp.path().join(".mailmap");
        std::fs::write(&mailmap, "Neuroimaging Community <committer@example.com>\n")
            .unwrap();
        let codemeta = temp.path().join("codemeta.json");
        std::fs::write(
            &codemeta,
            serde_json::json!({
                "contributor": [
                    {"@type": "Person", "givenName": "Joe", "familyName": "Smith",
                     "email": "joe@example.com"}
                ]
            })
            .to_string(),
        )
        .unwrap();

        let repo = GitHubRepository::with_contributors("owner/repo", vec![]);
        let client = TributorsClient::new(true).unwrap();
        let opts = UpdateOptions {
            kinds: vec![SourceKind::Email, SourceKind::Name],
            ..update_opts(&temp, allcontrib)
        };
        let mut files = opts.files.clone();
        files.mailmap = Some(mailmap);
        files.codemeta = Some(codemeta);
        let opts = UpdateOptions { files, ..opts };

        let sources =
            client.gather_sources(&repo, &ContributorFilter::default(), &opts);
        assert_eq!(
            sources.emails,
            vec!["committer@example.com".to_string(), "joe@example.com".to_string()]
        );
        assert!(sources.names.contains(&"Joe Smith".to_string()));
        assert!(sources.names.contains(&"Neuroimaging Community".to_string()));
        assert!(sources.logins.is_empty());
    }
}
