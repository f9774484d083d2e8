//! Tributors - contributor metadata reconciliation
//!
//! Tributors keeps a repository's contributor metadata files in agreement:
//! the all-contributors list (`.all-contributorsrc`), the Zenodo deposit
//! descriptor (`.zenodo.json`), the codemeta citation file
//! (`codemeta.json`), and the git `.mailmap`, joined through a persistent
//! local identity cache (`.tributors`) keyed by GitHub login.
//!
//! # Architecture Overview
//!
//! The system is built around a cross-resource identity resolution and
//! merge engine:
//!
//! - Identity is matched only on exact equality of a small set of
//!   identifier fields (login, email, normalized ORCID iD, exact name);
//!   no fuzzy matching, no ML disambiguation.
//! - Knowledge merges are first-known-value-wins per field; a populated
//!   cache field is never overwritten by a later pass, with one sanctioned
//!   exception for upgrading a bare-login placeholder name after a unique
//!   ORCID hit.
//! - When two identifiers resolve to different people, the merge is
//!   skipped with a warning; the engine never guesses.
//!
//! # Core Modules
//!
//! - [`cache`] - the persistent `.tributors` identity cache
//! - [`cli`] - command-line interface (`init`, `update`, `update-lookup`)
//! - [`core`] - error taxonomy and the closed resource-kind enum
//! - [`github`] - host contributor enumeration and inclusion rules
//! - [`merge`] - the enrichment pass and reconciliation plumbing
//! - [`orcid`] - tiered researcher-identifier search
//! - [`orchestrator`] - sequences actions, owns the cache for a run
//! - [`resources`] - one adapter per metadata file format
//! - [`utils`] - shared JSON file helpers
//!
//! # Example Workflow
//!
//! ```bash
//! # 1. Create the contributor list for a repository
//! tributors init allcontrib --repo owner/name
//!
//! # 2. Reconcile it against the GitHub contributor enumeration
//! tributors update allcontrib
//!
//! # 3. Share knowledge with the other metadata files
//! tributors update all
//!
//! # 4. Backfill the cache from hand-curated files
//! tributors update-lookup
//! ```

pub mod cache;
pub mod cli;
pub mod core;
pub mod github;
pub mod merge;
pub mod orchestrator;
pub mod orcid;
pub mod resources;
pub mod utils;
