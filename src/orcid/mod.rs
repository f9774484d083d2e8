//! ORCID researcher-identifier search
//!
//! The optional identifier registry: given what the cache knows about a
//! person (an email, a name, or both), try to resolve their ORCID iD with
//! an ordered sequence of queries from strictest to loosest, stopping at
//! the first query that returns exactly one hit.
//!
//! # Search Tiers
//!
//! 1. by email
//! 2. by exact full name as credit-name or alias
//! 3. by given-name AND family-name, split on the first comma when present
//!    (`Family, Given`) else on the last space
//! 4. tier 3 with the middle name(s) of the given portion dropped
//! 5. all whitespace/comma-separated name parts ANDed together
//!
//! A tier returning zero hits falls through to the next. A tier returning
//! several hits is ambiguous: non-interactively it is logged and treated as
//! no match, and when the ambiguous tier was strict (1 or 2) the remaining
//! looser tiers are abandoned: a strict match existing means looser tiers
//! would be even less reliable. Interactively, the operator picks from up
//! to ten candidates, skips, types a literal iD, or cancels the whole
//! remaining batch.
//!
//! ORCID is an optional registry: request failures are treated as "no
//! match" and never abort the run.

mod prompt;

pub use prompt::PromptChoice;

use anyhow::Result;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};

const SEARCH_URL: &str = "https://pub.orcid.org/v3.0/expanded-search/";
const TOKEN_URL: &str = "https://orcid.org/oauth/token";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum candidates shown to the operator in interactive mode.
pub const MAX_CANDIDATES: usize = 10;

fn orcid_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{4}-\d{4}-\d{3}[\dX]$").unwrap())
}

/// True when `value` matches the canonical `####-####-####-###[#X]` shape.
#[must_use]
pub fn is_valid_orcid(value: &str) -> bool {
    orcid_regex().is_match(value)
}

/// One hit from the expanded search endpoint.
///
/// Hits carry enough to both flatten into an identity record (given and
/// family name, most-recent institution first) and to describe the
/// candidate to an operator (aliases, emails).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrcidCandidate {
    /// The ORCID iD path, e.g. `0000-0003-3456-2493`
    #[serde(rename = "orcid-id")]
    pub orcid: String,
    /// Given name(s)
    #[serde(rename = "given-names", default)]
    pub given_names: Option<String>,
    /// Family name
    #[serde(rename = "family-names", default)]
    pub family_names: Option<String>,
    /// Institutions, most recent employer first
    #[serde(rename = "institution-name", default)]
    pub institutions: Vec<String>,
    /// Known aliases ("also known as")
    #[serde(rename = "other-name", default)]
    pub aliases: Vec<String>,
    /// Public email addresses
    #[serde(rename = "email", default)]
    pub emails: Vec<String>,
}

impl OrcidCandidate {
    /// `given family` when both are known, either alone otherwise.
    #[must_use]
    pub fn full_name(&self) -> Option<String> {
        match (&self.given_names, &self.family_names) {
            (Some(given), Some(family)) => Some(format!("{given} {family}")),
            (Some(given), None) => Some(given.clone()),
            (None, Some(family)) => Some(family.clone()),
            (None, None) => None,
        }
    }

    /// The most recent employer, when any institution is listed.
    #[must_use]
    pub fn affiliation(&self) -> Option<&str> {
        self.institutions.first().map(String::as_str)
    }
}

#[derive(Debug, Deserialize)]
struct ExpandedSearchResponse {
    #[serde(rename = "expanded-result", default)]
    result: Option<Vec<OrcidCandidate>>,
}

/// The outcome of one identifier search.
#[derive(Debug)]
pub enum SearchOutcome {
    /// Exactly one acceptable candidate was resolved
    Found(OrcidCandidate),
    /// No unique match; the enrichment pass continues without an iD
    NoMatch,
    /// The operator cancelled the remaining search batch with `q`
    Cancelled,
}

/// One search tier: the query string and whether the tier is strict.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    /// The Solr query passed as `q`
    pub query: String,
    /// Strict tiers (email, exact full name) abandon the search on ambiguity
    pub strict: bool,
}

/// Build the ordered query tiers for a person, strictest first.
///
/// Tiers that cannot be formed (no email, a single-token name) are simply
/// absent; an empty vector means there is nothing to search with.
#[must_use]
pub fn build_queries(email: Option<&str>, name: Option<&str>) -> Vec<SearchQuery> {
    let mut queries = Vec::new();

    if let Some(email) = email {
        queries.push(SearchQuery {
            query: format!("email:{email}"),
            strict: true,
        });
    }

    if let Some(name) = name {
        queries.push(SearchQuery {
            query: format!("credit-name:\"{name}\" OR other-names:\"{name}\""),
            strict: true,
        });

        if let Some((given, family)) = split_name(name) {
            queries.push(SearchQuery {
                query: format!("given-names:{given} AND family-name:{family}"),
                strict: false,
            });

            let first_given = drop_middle(&given);
            if first_given != given {
                queries.push(SearchQuery {
                    query: format!("given-names:{first_given} AND family-name:{family}"),
                    strict: false,
                });
            }
        }

        let parts: Vec<&str> = name
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() > 1 {
            queries.push(SearchQuery {
                query: parts.join(" AND "),
                strict: false,
            });
        }
    }

    queries
}

/// Split a full name into (given, family): on the first comma when present
/// (`Family, Given`), else on the last space. Single-token names cannot be
/// split.
fn split_name(name: &str) -> Option<(String, String)> {
    if let Some((family, given)) = name.split_once(',') {
        let family = family.trim();
        let given = given.trim();
        if family.is_empty() || given.is_empty() {
            return None;
        }
        return Some((given.to_string(), family.to_string()));
    }
    let (given, family) = name.rsplit_once(' ')?;
    let given = given.trim();
    let family = family.trim();
    if given.is_empty() || family.is_empty() {
        return None;
    }
    Some((given.to_string(), family.to_string()))
}

/// Drop everything after the first token of a given-name portion.
fn drop_middle(given: &str) -> String {
    given
        .split_whitespace()
        .next()
        .unwrap_or(given)
        .to_string()
}

/// Client for the public ORCID search, optionally authenticated.
#[derive(Debug)]
pub struct OrcidClient {
    client: reqwest::Client,
    token: Option<String>,
    interactive: bool,
    cancelled: bool,
}

impl OrcidClient {
    /// Build a search client.
    ///
    /// The bearer token comes from `ORCID_TOKEN` when exported, else from a
    /// client-credentials exchange when `ORCID_ID` and `ORCID_SECRET` are
    /// both set; the public search path needs no token at all.
    pub async fn connect(interactive: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("tributors/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let token = match std::env::var("ORCID_TOKEN") {
            Ok(token) => Some(token),
            Err(_) => exchange_credentials(&client).await,
        };
        Ok(Self {
            client,
            token,
            interactive,
            cancelled: false,
        })
    }

    /// True once the operator has cancelled the batch; callers skip any
    /// further searches for the rest of the run.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Run the tiered search for one person.
    pub async fn search(&mut self, email: Option<&str>, name: Option<&str>) -> SearchOutcome {
        if self.cancelled {
            return SearchOutcome::NoMatch;
        }

        for tier in build_queries(email, name) {
            let candidates = match self.query(&tier.query).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    debug!("ORCID search failed for {:?}: {e}", tier.query);
                    return SearchOutcome::NoMatch;
                }
            };

            match candidates.len() {
                0 => {}
                1 => {
                    let mut candidates = candidates;
                    return match candidates.pop() {
                        Some(candidate) => SearchOutcome::Found(candidate),
                        None => SearchOutcome::NoMatch,
                    };
                }
                n if self.interactive => {
                    match self.resolve_interactively(&tier, &candidates, n) {
                        Some(outcome) => return outcome,
                        None => continue,
                    }
                }
                n => {
                    warn!(
                        "Found {n} ORCID results for {:?}, no unique match",
                        tier.query
                    );
                    if tier.strict {
                        return SearchOutcome::NoMatch;
                    }
                }
            }
        }
        SearchOutcome::NoMatch
    }

    // Returns None when the operator's choice means "try the next tier"
    // (not currently reachable; skip abandons the search entirely).
    fn resolve_interactively(
        &mut self,
        tier: &SearchQuery,
        candidates: &[OrcidCandidate],
        total: usize,
    ) -> Option<SearchOutcome> {
        println!(
            "Found {total} ORCID results for {:?}, choose one:",
            tier.query
        );
        let shown = &candidates[..candidates.len().min(MAX_CANDIDATES)];
        match prompt::choose_candidate(shown) {
            Ok(PromptChoice::Selected(index)) => {
                shown.get(index).cloned().map(SearchOutcome::Found)
            }
            Ok(PromptChoice::Literal(orcid)) => Some(SearchOutcome::Found(OrcidCandidate {
                orcid,
                ..Default::default()
            })),
            Ok(PromptChoice::Skip) => Some(SearchOutcome::NoMatch),
            Ok(PromptChoice::Quit) => {
                self.cancelled = true;
                Some(SearchOutcome::Cancelled)
            }
            Err(e) => {
                warn!("Prompt failed: {e}");
                self.cancelled = true;
                Some(SearchOutcome::Cancelled)
            }
        }
    }

    async fn query(&self, query: &str) -> Result<Vec<OrcidCandidate>> {
        let mut request = self
            .client
            .get(SEARCH_URL)
            .query(&[("q", query), ("rows", "10")])
            .header("Accept", "application/json");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("bearer {token}"));
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            anyhow::bail!("ORCID search returned {}", response.status());
        }
        let body: ExpandedSearchResponse = response.json().await?;
        Ok(body.result.unwrap_or_default())
    }
}

/// Exchange `ORCID_ID`/`ORCID_SECRET` for a read-public token. Any failure
/// just means searching unauthenticated.
async fn exchange_credentials(client: &reqwest::Client) -> Option<String> {
    let id = std::env::var("ORCID_ID").ok()?;
    let secret = std::env::var("ORCID_SECRET").ok()?;

    #[derive(Deserialize)]
    struct TokenResponse {
        access_token: String,
        #[serde(default)]
        refresh_token: Option<String>,
    }

    let response = client
        .post(TOKEN_URL)
        .header("Accept", "application/json")
        .form(&[
            ("client_id", id.as_str()),
            ("client_secret", secret.as_str()),
            ("grant_type", "client_credentials"),
            ("scope", "/read-public"),
        ])
        .send()
        .await
        .ok()?;
    if !response.status().is_success() {
        return None;
    }
    let tokens: TokenResponse = response.json().await.ok()?;

    // Persist the exports so the user can reuse the token headless.
    let path = std::env::temp_dir().join(format!("tributors-orcid-{}.sh", std::process::id()));
    let mut content = format!("export ORCID_TOKEN={}\n", tokens.access_token);
    if let Some(refresh) = &tokens.refresh_token {
        content.push_str(&format!("export ORCID_REFRESH_TOKEN={refresh}\n"));
    }
    if std::fs::write(&path, content).is_ok() {
        println!(
            "Orcid token exports written to {}. In the future export these variables for headless usage.",
            path.display()
        );
    }

    Some(tokens.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orcid_pattern() {
        assert!(is_valid_orcid("0000-0003-3456-2493"));
        assert!(is_valid_orcid("0000-0001-7037-244X"));
        assert!(!is_valid_orcid("0000-0003-3456"));
        assert!(!is_valid_orcid("0000000334562493"));
        assert!(!is_valid_orcid("0000-0003-3456-24930"));
        assert!(!is_valid_orcid("abcd-0003-3456-2493"));
    }

    #[test]
    fn test_email_tier_comes_first_and_is_strict() {
        let queries = build_queries(Some("debian@onerussian.com"), Some("Yaroslav Halchenko"));
        assert_eq!(queries[0].query, "email:debian@onerussian.com");
        assert!(queries[0].strict);
    }

    #[test]
    fn test_exact_name_tier_is_strict() {
        let queries = build_queries(None, Some("Yaroslav Halchenko"));
        assert_eq!(
            queries[0].query,
            "credit-name:\"Yaroslav Halchenko\" OR other-names:\"Yaroslav Halchenko\""
        );
        assert!(queries[0].strict);
        assert!(!queries[1].strict);
    }

    #[test]
    fn test_split_on_last_space() {
        let queries = build_queries(None, Some("Yaroslav Olegovich Halchenko"));
        // Tier 3 keeps the full given portion, tier 4 drops the middle name.
        assert!(queries.iter().any(|q| q.query
            == "given-names:Yaroslav Olegovich AND family-name:Halchenko"));
        assert!(queries
            .iter()
            .any(|q| q.query == "given-names:Yaroslav AND family-name:Halchenko"));
    }

    #[test]
    fn test_split_on_first_comma() {
        let queries = build_queries(None, Some("Halchenko, Yaroslav"));
        assert!(queries
            .iter()
            .any(|q| q.query == "given-names:Yaroslav AND family-name:Halchenko"));
    }

    #[test]
    fn test_all_parts_tier() {
        let queries = build_queries(None, Some("Yaroslav Olegovich Halchenko"));
        assert_eq!(
            queries.last().map(|q| q.query.as_str()),
            Some("Yaroslav AND Olegovich AND Halchenko")
        );
    }

    #[test]
    fn test_single_token_name_has_no_split_tiers() {
        let queries = build_queries(None, Some("vsoch"));
        // Only the exact-name tier can be formed.
        assert_eq!(queries.len(), 1);
        assert!(queries[0].strict);
    }

    #[test]
    fn test_no_identifiers_no_queries() {
        assert!(build_queries(None, None).is_empty());
    }

    #[test]
    fn test_candidate_flattening() {
        let candidate = OrcidCandidate {
            orcid: "0000-0003-3456-2493".to_string(),
            given_names: Some("Yaroslav".to_string()),
            family_names: Some("Halchenko".to_string()),
            institutions: vec!["Dartmouth College".to_string(), "Prior U".to_string()],
            ..Default::default()
        };
        assert_eq!(candidate.full_name().as_deref(), Some("Yaroslav Halchenko"));
        assert_eq!(candidate.affiliation(), Some("Dartmouth College"));
    }
}
