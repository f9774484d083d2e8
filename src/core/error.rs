//! Error handling for tributors
//!
//! This module provides the error types and user-friendly error reporting for
//! the tributors CLI. The error system is designed around two core principles:
//! 1. **Strongly-typed errors** for precise error handling in code
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! The error system consists of two main types:
//! - [`TributorsError`] - Enumerated error types for all failure cases
//! - [`ErrorContext`] - Wrapper that adds user-friendly messages and suggestions
//!
//! # Error Categories
//!
//! - **Configuration**: [`TributorsError::MissingRepository`],
//!   [`TributorsError::MalformedRepository`], [`TributorsError::FileExists`],
//!   [`TributorsError::FileNotFound`], [`TributorsError::InvalidContributionType`]
//!   (fatal, never retried, reported with a remedial hint).
//! - **Upstream requests**: [`TributorsError::ApiError`] for non-success
//!   responses from a mandatory registry (GitHub, Zenodo). Failures against
//!   the optional ORCID search are treated as "no match" and never surface
//!   through this type.
//! - **Parsing**: [`TributorsError::MailmapParseError`] and
//!   [`TributorsError::JsonParseError`], fatal for that file's load.
//! - **Operator cancellation**: [`TributorsError::Cancelled`], a distinct
//!   signal, not a generic failure; it aborts only the remaining lookup batch.
//!
//! Use [`user_friendly_error`] to convert any error into a displayable format
//! with contextual suggestions.

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for tributors operations
///
/// Each variant represents a specific failure mode and carries the details
/// (paths, addresses, HTTP statuses) needed to report it precisely.
#[derive(Error, Debug)]
pub enum TributorsError {
    /// No repository identifier could be resolved from the argument, the
    /// `GITHUB_REPOSITORY` environment variable, or the local git remote.
    #[error("A repository is required and could not be determined")]
    MissingRepository,

    /// The repository address does not match the `owner/name` shape.
    #[error("Malformed repository address: {address}")]
    MalformedRepository {
        /// The address that failed validation
        address: String,
    },

    /// A target file already exists and `--force` was not given.
    #[error("{path} exists, set --force to overwrite")]
    FileExists {
        /// The file that already exists
        path: String,
    },

    /// A required resource file is absent.
    #[error("{path} does not exist")]
    FileNotFound {
        /// The missing file
        path: String,
        /// How to create it (e.g. "run init", "set --codemeta-file")
        hint: String,
    },

    /// The requested all-contributors contribution type is not in the
    /// published emoji-key vocabulary.
    #[error("Invalid contribution type {ctype}")]
    InvalidContributionType {
        /// The rejected type tag
        ctype: String,
    },

    /// Zenodo init needs a DOI to fetch the deposit record from.
    #[error("A Zenodo DOI is required, provide it with --doi")]
    MissingDoi,

    /// update-lookup was invoked with no resources and none were detected.
    #[error("No resources auto-detected, specify one or more instead")]
    NoResourcesDetected,

    /// A mandatory registry returned a non-success response (or timed out).
    #[error("Response {status}: {reason}, cannot retrieve {what}")]
    ApiError {
        /// HTTP status code, 0 when the request never completed
        status: u16,
        /// Status reason or transport error text
        reason: String,
        /// What was being fetched (repository, user, deposit record)
        what: String,
    },

    /// A `.mailmap` line with no resolvable name on any segment.
    #[error("Malformed mailmap line, no name found: {line:?}")]
    MailmapParseError {
        /// The offending line, verbatim
        line: String,
    },

    /// An identifier entered by the operator does not match the canonical
    /// ORCID pattern `####-####-####-###[#X]`.
    #[error("{value} is not a valid ORCID identifier")]
    InvalidOrcid {
        /// The rejected identifier
        value: String,
    },

    /// The operator aborted the remaining lookup batch with `q`.
    #[error("Lookup batch cancelled by operator")]
    Cancelled,

    /// A resource or cache file failed to parse as JSON.
    #[error("Failed to parse {path}: {reason}")]
    JsonParseError {
        /// The file that failed to parse
        path: String,
        /// The underlying parser message
        reason: String,
    },

    /// I/O errors from file operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Transport-level HTTP errors (connection, timeout)
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Generic errors that don't fit other categories
    #[error("{message}")]
    Other {
        /// The full error message, including the cause chain
        message: String,
    },
}

/// User-friendly error wrapper with actionable suggestions
///
/// Wraps a [`TributorsError`] with an optional suggestion and details that
/// are rendered in color on the terminal.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying tributors error
    pub error: TributorsError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no additional suggestions or details.
    #[must_use]
    pub const fn new(error: TributorsError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add an actionable suggestion, displayed in green.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add background details, displayed in yellow.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error, details, and suggestion to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into a user-friendly [`ErrorContext`] with suggestions
///
/// Downcasts to [`TributorsError`] when possible and attaches a remedial
/// suggestion per variant; any other error is passed through with generic
/// formatting.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let error = match error.downcast::<TributorsError>() {
        Ok(err) => return create_error_context(err),
        Err(other) => other,
    };

    // Generic error - include the full error chain for better diagnostics
    let mut message = error.to_string();

    let chain: Vec<String> = error
        .chain()
        .skip(1)
        .map(std::string::ToString::to_string)
        .collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(TributorsError::Other { message })
}

fn create_error_context(error: TributorsError) -> ErrorContext {
    let suggestion: Option<String> = match &error {
        TributorsError::MissingRepository => Some(
            "Pass --repo owner/name, export GITHUB_REPOSITORY, or run from a checkout with a GitHub origin remote"
                .to_string(),
        ),

        TributorsError::MalformedRepository { .. } => {
            Some("The repository must be addressed as owner/name".to_string())
        }

        TributorsError::FileExists { .. } => {
            Some("Use --force to overwrite the existing file".to_string())
        }

        TributorsError::FileNotFound { hint, .. } => Some(hint.clone()),

        TributorsError::InvalidContributionType { .. } => Some(
            "See https://allcontributors.org/docs/en/emoji-key for valid types".to_string(),
        ),

        TributorsError::ApiError { .. } if std::env::var("GITHUB_TOKEN").is_err() => {
            Some("Export GITHUB_TOKEN to raise the API rate limit".to_string())
        }

        TributorsError::MailmapParseError { .. } => {
            Some("Each mailmap line needs at least one Name <email> segment".to_string())
        }

        TributorsError::InvalidOrcid { .. } => {
            Some("ORCID identifiers look like 0000-0002-1825-0097".to_string())
        }

        _ => None,
    };

    let mut ctx = ErrorContext::new(error);
    ctx.suggestion = suggestion;
    ctx
}
