//! The `.mailmap` adapter (read-only)
//!
//! Mailmap has a line-oriented grammar: each line holds one or more
//! `Name <email>` segments. Only the **first non-empty name** on a line is
//! authoritative; every email on the line inherits it, which consolidates
//! aliases like
//!
//! ```text
//! Neuroimaging Community <committer@example.com> <test@example.com>
//! ```
//!
//! into two entries both named "Neuroimaging Community". A line with no
//! name on any segment is a fatal parse error naming the offending line.
//! Blank lines and `#` comments are skipped.
//!
//! The file is never written; mailmap participates only as an identifier
//! source and as a cache-backfill input for `update-lookup`.

use anyhow::Result;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::info;

use super::ResourceAdapter;
use crate::cache::{IdentityCache, IdentityRecord};
use crate::core::{ResourceKind, TributorsError};
use crate::merge::MergeWarning;

/// One resolved mailmap mapping: an email and its authoritative name.
#[derive(Debug, Clone, PartialEq)]
pub struct MailmapEntry {
    /// The authoritative display name for this email
    pub name: String,
    /// The email address
    pub email: String,
}

/// The `.mailmap` resource.
#[derive(Debug)]
pub struct MailmapResource {
    path: PathBuf,
    entries: Vec<MailmapEntry>,
    loaded: bool,
}

impl MailmapResource {
    /// Create an adapter for `path` (not yet loaded).
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            entries: Vec::new(),
            loaded: false,
        }
    }

    /// The parsed entries, line order preserved.
    #[must_use]
    pub fn entries(&self) -> &[MailmapEntry] {
        &self.entries
    }

    /// The authoritative name for `email`, when the file maps it.
    #[must_use]
    pub fn name_for(&self, email: &str) -> Option<&str> {
        // Later lines win, matching how repeated mappings accumulate.
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.email == email)
            .map(|entry| entry.name.as_str())
    }
}

/// Parse one mailmap line into its entries.
///
/// # Errors
/// [`TributorsError::MailmapParseError`] when no segment carries a name or
/// an email bracket is unterminated.
pub fn parse_line(line: &str) -> Result<Vec<MailmapEntry>> {
    let mut names: Vec<&str> = Vec::new();
    let mut emails: Vec<&str> = Vec::new();

    let mut segments = line.split('<');
    names.push(segments.next().unwrap_or("").trim());
    for segment in segments {
        let Some((email, rest)) = segment.split_once('>') else {
            return Err(TributorsError::MailmapParseError {
                line: line.to_string(),
            }
            .into());
        };
        emails.push(email.trim());
        names.push(rest.trim());
    }

    let name = names
        .iter()
        .find(|n| !n.is_empty())
        .ok_or_else(|| TributorsError::MailmapParseError {
            line: line.to_string(),
        })?;

    if emails.is_empty() {
        return Err(TributorsError::MailmapParseError {
            line: line.to_string(),
        }
        .into());
    }

    Ok(emails
        .into_iter()
        .filter(|email| !email.is_empty())
        .map(|email| MailmapEntry {
            name: (*name).to_string(),
            email: email.to_string(),
        })
        .collect())
}

impl ResourceAdapter for MailmapResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Mailmap
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&mut self) -> Result<()> {
        if self.loaded {
            return Ok(());
        }
        if !self.path.exists() {
            return Err(TributorsError::FileNotFound {
                path: self.path.display().to_string(),
                hint: "Set --mailmap-file to point at your mailmap".to_string(),
            }
            .into());
        }
        let content = std::fs::read_to_string(&self.path)?;
        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            self.entries.extend(parse_line(line)?);
        }
        self.loaded = true;
        Ok(())
    }

    // Mailmap is read-only.
    fn save(&self) -> Result<()> {
        Ok(())
    }

    fn update_lookup(&self, cache: &mut IdentityCache) -> Result<Vec<MergeWarning>> {
        info!("Updating cache from {}", self.path.display());
        let mut backfills: Vec<(String, IdentityRecord)> = Vec::new();
        for (login, record) in cache.all() {
            let Some(email) = record.email.as_deref() else {
                continue;
            };
            if record.name.is_none() {
                if let Some(name) = self.name_for(email) {
                    info!("   Updating {login} with name: {name}");
                    backfills.push((
                        login.clone(),
                        IdentityRecord {
                            name: Some(name.to_string()),
                            ..Default::default()
                        },
                    ));
                }
            }
        }
        for (login, partial) in backfills {
            cache.upsert(&login, partial);
        }
        Ok(Vec::new())
    }

    fn email_lookup(&self) -> BTreeSet<String> {
        self.entries.iter().map(|e| e.email.clone()).collect()
    }

    fn name_lookup(&self) -> BTreeSet<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }
}
