//! The persistent identity cache (`.tributors`)
//!
//! The cache is the hub of the system: a flat JSON object mapping a GitHub
//! login (or synthetic key) to an [`IdentityRecord`] holding the partial
//! knowledge accumulated about that person across resources and registries.
//!
//! # Merge Invariant
//!
//! A record is never downgraded: once a field is set it is never cleared or
//! overwritten by a later merge. [`IdentityRecord::merge_missing`] and
//! [`IdentityCache::upsert`] implement first-known-value-wins independently
//! per field. The single sanctioned exception (upgrading a bare-login
//! placeholder name after an ORCID hit) lives in the merge engine, which
//! mutates the field directly.
//!
//! # Lifecycle
//!
//! Loaded once at process start (an absent file yields an empty map),
//! mutated in place across one or more resource passes, persisted once at
//! process end. Under `--skip-cache` the cache is ephemeral: loaded empty
//! and never written.
//!
//! # Examples
//!
//! ```rust
//! use tributors::cache::{IdentityCache, IdentityRecord};
//!
//! let mut cache = IdentityCache::ephemeral();
//! cache.upsert(
//!     "vsoch",
//!     IdentityRecord {
//!         name: Some("Vanessa Sochat".to_string()),
//!         ..Default::default()
//!     },
//! );
//! assert_eq!(cache.get("vsoch").unwrap().name.as_deref(), Some("Vanessa Sochat"));
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::utils::{read_json_file, write_json_file};

/// Default cache filename in the working directory.
pub const CACHE_FILENAME: &str = ".tributors";

/// Partial knowledge about one person, keyed in the cache by login.
///
/// All fields are optional; serialization skips absent fields so cache files
/// stay minimal and stable. Unknown fields present in an existing cache file
/// are carried through the `extra` map untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// Display name, e.g. "Vanessa Sochat"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Contact email
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Institutional affiliation (most recent employer)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
    /// Free-text bio from the host profile
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    /// Personal site or blog URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blog: Option<String>,
    /// ORCID iD, normalized to `####-####-####-###[#X]`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orcid: Option<String>,
    /// Fields this tool does not understand, preserved round-trip
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl IdentityRecord {
    /// Merge fields from `other` that are absent here, never overwriting a
    /// present field. Each field is considered independently.
    pub fn merge_missing(&mut self, other: &IdentityRecord) {
        if self.name.is_none() {
            self.name.clone_from(&other.name);
        }
        if self.email.is_none() {
            self.email.clone_from(&other.email);
        }
        if self.affiliation.is_none() {
            self.affiliation.clone_from(&other.affiliation);
        }
        if self.bio.is_none() {
            self.bio.clone_from(&other.bio);
        }
        if self.blog.is_none() {
            self.blog.clone_from(&other.blog);
        }
        if self.orcid.is_none() {
            self.orcid.clone_from(&other.orcid);
        }
        for (key, value) in &other.extra {
            self.extra
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }

    /// True when no field carries a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.affiliation.is_none()
            && self.bio.is_none()
            && self.blog.is_none()
            && self.orcid.is_none()
            && self.extra.is_empty()
    }
}

/// The shared `.tributors` cache: login -> [`IdentityRecord`].
///
/// Keys are kept sorted (a `BTreeMap`) so the persisted file is byte-stable
/// across runs regardless of discovery order.
#[derive(Debug)]
pub struct IdentityCache {
    path: PathBuf,
    entries: BTreeMap<String, IdentityRecord>,
    skip_cache: bool,
}

impl IdentityCache {
    /// Load the cache from `path`, or start empty when the file is absent.
    ///
    /// # Errors
    /// Fails when the file exists but is not valid JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let entries = if path.exists() {
            read_json_file(path)?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            entries,
            skip_cache: false,
        })
    }

    /// An in-memory cache that is never persisted (`--skip-cache`).
    #[must_use]
    pub fn ephemeral() -> Self {
        Self {
            path: PathBuf::from(CACHE_FILENAME),
            entries: BTreeMap::new(),
            skip_cache: true,
        }
    }

    /// Persist the cache unless running ephemeral.
    ///
    /// # Errors
    /// Fails when the file cannot be written.
    pub fn save(&self) -> Result<()> {
        if self.skip_cache {
            return Ok(());
        }
        debug!("Saving cache to {}", self.path.display());
        write_json_file(&self.path, &self.entries)
    }

    /// Look up one record.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&IdentityRecord> {
        self.entries.get(key)
    }

    /// Mutable access to one record, creating an empty one when absent.
    pub fn entry_mut(&mut self, key: &str) -> &mut IdentityRecord {
        self.entries.entry(key.to_string()).or_default()
    }

    /// Merge `partial` into the record for `key`, first-known-value-wins
    /// per field. Creates the record when absent.
    pub fn upsert(&mut self, key: &str, partial: IdentityRecord) {
        self.entries
            .entry(key.to_string())
            .or_default()
            .merge_missing(&partial);
    }

    /// All records, keyed by login.
    #[must_use]
    pub fn all(&self) -> &BTreeMap<String, IdentityRecord> {
        &self.entries
    }

    /// Find the record whose orcid equals `orcid`, with its key.
    ///
    /// The cache is indexed by the identifier value directly; a record's own
    /// fields are never used as keys back into the cache.
    #[must_use]
    pub fn find_by_orcid(&self, orcid: &str) -> Option<(&str, &IdentityRecord)> {
        self.entries
            .iter()
            .find(|(_, record)| record.orcid.as_deref() == Some(orcid))
            .map(|(key, record)| (key.as_str(), record))
    }

    /// Find the record whose email equals `email`, with its key.
    #[must_use]
    pub fn find_by_email(&self, email: &str) -> Option<(&str, &IdentityRecord)> {
        self.entries
            .iter()
            .find(|(_, record)| record.email.as_deref() == Some(email))
            .map(|(key, record)| (key.as_str(), record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(name: Option<&str>, email: Option<&str>) -> IdentityRecord {
        IdentityRecord {
            name: name.map(String::from),
            email: email.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_upsert_never_overwrites() {
        let mut cache = IdentityCache::ephemeral();
        cache.upsert("vsoch", record(Some("Vanessa Sochat"), None));
        cache.upsert("vsoch", record(Some("Someone Else"), Some("v@example.com")));

        let entry = cache.get("vsoch").unwrap();
        assert_eq!(entry.name.as_deref(), Some("Vanessa Sochat"));
        assert_eq!(entry.email.as_deref(), Some("v@example.com"));
    }

    #[test]
    fn test_fields_merge_independently() {
        let mut first = record(Some("A"), None);
        let second = IdentityRecord {
            email: Some("a@example.com".to_string()),
            orcid: Some("0000-0001-2345-6789".to_string()),
            ..Default::default()
        };
        first.merge_missing(&second);
        assert_eq!(first.name.as_deref(), Some("A"));
        assert_eq!(first.email.as_deref(), Some("a@example.com"));
        assert_eq!(first.orcid.as_deref(), Some("0000-0001-2345-6789"));
    }

    #[test]
    fn test_load_save_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CACHE_FILENAME);

        let mut cache = IdentityCache::load(&path).unwrap();
        cache.upsert("manbat", record(Some("Man Bat"), Some("manbat@example.com")));
        cache.save().unwrap();

        let reloaded = IdentityCache::load(&path).unwrap();
        assert_eq!(
            reloaded.get("manbat").unwrap().email.as_deref(),
            Some("manbat@example.com")
        );
    }

    #[test]
    fn test_unknown_fields_survive_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CACHE_FILENAME);
        std::fs::write(
            &path,
            r#"{"vsoch": {"name": "Vanessa Sochat", "twitter": "@vsoch"}}"#,
        )
        .unwrap();

        let cache = IdentityCache::load(&path).unwrap();
        cache.save().unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("twitter"));
    }

    #[test]
    fn test_ephemeral_never_writes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CACHE_FILENAME);

        let mut cache = IdentityCache {
            path: path.clone(),
            entries: BTreeMap::new(),
            skip_cache: true,
        };
        cache.upsert("vsoch", record(Some("Vanessa Sochat"), None));
        cache.save().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_find_by_identifier() {
        let mut cache = IdentityCache::ephemeral();
        cache.upsert(
            "yarikoptic",
            IdentityRecord {
                orcid: Some("0000-0003-3456-2493".to_string()),
                email: Some("debian@onerussian.com".to_string()),
                ..Default::default()
            },
        );

        let (key, _) = cache.find_by_orcid("0000-0003-3456-2493").unwrap();
        assert_eq!(key, "yarikoptic");
        let (key, _) = cache.find_by_email("debian@onerussian.com").unwrap();
        assert_eq!(key, "yarikoptic");
        assert!(cache.find_by_orcid("0000-0000-0000-0000").is_none());
    }
}
