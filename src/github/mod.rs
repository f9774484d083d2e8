//! GitHub repository and contributor enumeration
//!
//! This module is the host-side identifier registry: it resolves the target
//! repository address, enumerates contributors (with transparent
//! pagination), fetches per-user profiles, and exposes the repository
//! metadata that the codemeta and zenodo adapters synthesize fields from.
//!
//! # Repository Resolution
//!
//! The repository id is resolved in preference order: the explicit
//! `--repo` argument, the `GITHUB_REPOSITORY` environment variable, then
//! the origin remote of the local git checkout. Whatever the source, the
//! address must match `owner/name`; anything else is a fatal configuration
//! error.
//!
//! # Failure Model
//!
//! GitHub is a mandatory registry: any non-success response (or timeout) is
//! fatal, reported with the HTTP status and reason. When no `GITHUB_TOKEN`
//! is exported, the user-facing error suggests setting one to raise the
//! rate limit.

use anyhow::Result;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

use crate::core::TributorsError;

const API_ROOT: &str = "https://api.github.com";
const PAGE_SIZE: usize = 100;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn repository_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?P<owner>[\w.-]+)/(?P<name>[\w.-]+)$").unwrap())
}

/// One entry from the `/repos/{uid}/contributors` endpoint. Read-only.
#[derive(Debug, Clone, Deserialize)]
pub struct Contributor {
    /// The unique account handle
    pub login: String,
    /// Number of contributions to this repository
    pub contributions: u64,
    /// Account kind, `User` or `Bot`
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Avatar image URL
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Profile page URL
    #[serde(default)]
    pub html_url: Option<String>,
}

/// Profile fields from `/users/{login}`, the enrichment inputs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserProfile {
    /// Display name, when the user set one
    #[serde(default)]
    pub name: Option<String>,
    /// Public email, when the user exposed one
    #[serde(default)]
    pub email: Option<String>,
    /// Profile bio text
    #[serde(default)]
    pub bio: Option<String>,
    /// Personal site URL
    #[serde(default)]
    pub blog: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RepoLicense {
    #[serde(default)]
    spdx_id: Option<String>,
}

/// Repository metadata from `/repos/{uid}`, consumed by the codemeta and
/// zenodo adapters when synthesizing document fields.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoMetadata {
    /// Repository short name
    pub name: String,
    /// Repository description
    #[serde(default)]
    pub description: Option<String>,
    /// Web URL of the repository
    pub html_url: String,
    /// Topic tags
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    license: Option<RepoLicense>,
}

impl RepoMetadata {
    /// The issue tracker URL.
    #[must_use]
    pub fn issues_url(&self) -> String {
        format!("{}/issues", self.html_url)
    }

    /// The SPDX license URL, when the repository declares a license.
    #[must_use]
    pub fn license_url(&self) -> Option<String> {
        self.license
            .as_ref()
            .and_then(|l| l.spdx_id.as_deref())
            .map(|id| format!("https://spdx.org/licenses/{id}"))
    }
}

/// Contributor inclusion rules shared by every resource update step.
///
/// A contributor is excluded when its kind is `Bot`, its login carries the
/// `[bot]` marker, its login is in the caller-supplied skip list, or its
/// contribution count is below the threshold. A count exactly equal to the
/// threshold is included.
#[derive(Debug, Clone, Default)]
pub struct ContributorFilter {
    /// Minimum number of contributions required
    pub thresh: u64,
    /// Logins to skip regardless of contributions
    pub skip_users: Vec<String>,
}

impl ContributorFilter {
    /// Apply the inclusion rules to one contributor.
    #[must_use]
    pub fn include(&self, contributor: &Contributor) -> bool {
        if contributor.kind == "Bot" || contributor.login.contains("[bot]") {
            return false;
        }
        if self.skip_users.iter().any(|s| s == &contributor.login) {
            return false;
        }
        contributor.contributions >= self.thresh
    }
}

/// A GitHub repository: resolved address plus lazily-fetched contributor
/// and metadata state shared across resource passes within one run.
#[derive(Debug)]
pub struct GitHubRepository {
    uid: String,
    client: reqwest::Client,
    token: Option<String>,
    contributors: Option<Vec<Contributor>>,
    metadata: Option<RepoMetadata>,
}

impl GitHubRepository {
    /// Resolve the repository address and build a client for it.
    ///
    /// # Errors
    /// [`TributorsError::MissingRepository`] when no address can be
    /// determined, [`TributorsError::MalformedRepository`] when the address
    /// does not match `owner/name`.
    pub async fn new(repo: Option<&str>) -> Result<Self> {
        let uid = resolve_repository(repo).await?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("tributors/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            uid,
            client,
            token: std::env::var("GITHUB_TOKEN").ok(),
            contributors: None,
            metadata: None,
        })
    }

    /// Build a repository with preloaded contributors, for callers that
    /// already have the enumeration (tests, replays).
    #[must_use]
    pub fn with_contributors(uid: &str, contributors: Vec<Contributor>) -> Self {
        Self {
            uid: uid.to_string(),
            client: reqwest::Client::new(),
            token: None,
            contributors: Some(contributors),
            metadata: None,
        }
    }

    /// The `owner/name` address.
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github.mercy-preview+json");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("token {token}"));
        }
        request
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        what: &str,
    ) -> Result<T> {
        let response = self.get(url).send().await.map_err(|e| api_error(e, what))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TributorsError::ApiError {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown").to_string(),
                what: what.to_string(),
            }
            .into());
        }
        Ok(response.json().await?)
    }

    /// The contributor enumeration, fetched once and reused across passes.
    ///
    /// Pagination is transparent: pages of [`PAGE_SIZE`] are requested until
    /// a page returns zero new entries. Order is the host's (contribution
    /// count descending) and is preserved.
    ///
    /// # Errors
    /// Fatal [`TributorsError::ApiError`] on any non-success response.
    pub async fn contributors(&mut self) -> Result<&[Contributor]> {
        if self.contributors.is_none() {
            let mut all: Vec<Contributor> = Vec::new();
            let mut page = 1usize;
            loop {
                let url = format!(
                    "{API_ROOT}/repos/{}/contributors?per_page={PAGE_SIZE}&page={page}",
                    self.uid
                );
                debug!("Fetching contributors page {page} for {}", self.uid);
                let batch: Vec<Contributor> =
                    self.fetch_json(&url, "contributors").await?;
                let before = all.len();
                for contributor in batch {
                    if !all.iter().any(|c| c.login == contributor.login) {
                        all.push(contributor);
                    }
                }
                // A page contributing nothing new terminates pagination.
                if all.len() == before {
                    break;
                }
                page += 1;
            }
            self.contributors = Some(all);
        }
        Ok(self.contributors.as_deref().unwrap_or_default())
    }

    /// The already-fetched enumeration, empty when not yet loaded.
    #[must_use]
    pub fn loaded_contributors(&self) -> &[Contributor] {
        self.contributors.as_deref().unwrap_or_default()
    }

    /// Look up a single contributor record by login from the enumeration.
    #[must_use]
    pub fn contributor(&self, login: &str) -> Option<&Contributor> {
        self.contributors
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|c| c.login == login)
    }

    /// Fetch the profile for one user.
    ///
    /// # Errors
    /// Fatal [`TributorsError::ApiError`] on any non-success response.
    pub async fn get_user(&self, login: &str) -> Result<UserProfile> {
        let url = format!("{API_ROOT}/users/{login}");
        self.fetch_json(&url, &format!("user {login}")).await
    }

    /// Repository metadata, fetched once and reused.
    ///
    /// # Errors
    /// Fatal [`TributorsError::ApiError`] on any non-success response.
    pub async fn metadata(&mut self) -> Result<&RepoMetadata> {
        if self.metadata.is_none() {
            let url = format!("{API_ROOT}/repos/{}", self.uid);
            let metadata: RepoMetadata =
                self.fetch_json(&url, &format!("repository {}", self.uid)).await?;
            self.metadata = Some(metadata);
        }
        match &self.metadata {
            Some(metadata) => Ok(metadata),
            None => Err(TributorsError::ApiError {
                status: 0,
                reason: "metadata unavailable".to_string(),
                what: format!("repository {}", self.uid),
            }
            .into()),
        }
    }
}

fn api_error(error: reqwest::Error, what: &str) -> anyhow::Error {
    TributorsError::ApiError {
        status: error.status().map_or(0, |s| s.as_u16()),
        reason: error.to_string(),
        what: what.to_string(),
    }
    .into()
}

/// Resolve the repository address from the argument, the environment, or
/// the local git origin remote, then validate its shape.
///
/// # Errors
/// [`TributorsError::MissingRepository`] or
/// [`TributorsError::MalformedRepository`].
pub async fn resolve_repository(repo: Option<&str>) -> Result<String> {
    let address = match repo
        .map(String::from)
        .or_else(|| std::env::var("GITHUB_REPOSITORY").ok())
    {
        Some(address) => address,
        None => origin_remote().await?,
    };
    parse_repository(&address)
}

/// Validate and normalize an `owner/name` address.
///
/// # Errors
/// [`TributorsError::MalformedRepository`] when the shape is wrong.
pub fn parse_repository(address: &str) -> Result<String> {
    let captures = repository_regex().captures(address).ok_or_else(|| {
        TributorsError::MalformedRepository {
            address: address.to_string(),
        }
    })?;
    Ok(format!("{}/{}", &captures["owner"], &captures["name"]))
}

async fn origin_remote() -> Result<String> {
    let output = tokio::process::Command::new("git")
        .args(["config", "--get", "remote.origin.url"])
        .output()
        .await
        .map_err(|_| TributorsError::MissingRepository)?;
    if !output.status.success() {
        return Err(TributorsError::MissingRepository.into());
    }
    let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if url.is_empty() {
        return Err(TributorsError::MissingRepository.into());
    }
    // Take the trailing owner/name segments of the remote URL, stripping a
    // .git suffix when present.
    let trimmed = url.trim_end_matches(".git").replace(':', "/");
    let parts: Vec<&str> = trimmed.rsplitn(3, '/').collect();
    if parts.len() < 2 {
        return Err(TributorsError::MissingRepository.into());
    }
    Ok(format!("{}/{}", parts[1], parts[0]))
}
