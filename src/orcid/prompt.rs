//! Interactive candidate selection for ambiguous ORCID searches.
//!
//! When a search tier returns several hits and the operator asked for
//! interactive mode, the candidates are listed with name, iD, institution,
//! aliases and email, and the operator answers with:
//!
//! - a number to select that candidate
//! - `s` / `skip` to abandon this identifier's search
//! - `e` / `enter` to type a literal iD
//! - `q` to cancel the entire remaining batch of searches
//!
//! The prompt blocks on operator input with no timeout; cancellation is a
//! distinct signal, not an error.

use anyhow::Result;
use colored::Colorize;
use dialoguer::{Input, theme::ColorfulTheme};

use super::OrcidCandidate;
use crate::core::TributorsError;

/// What the operator decided for one ambiguous search.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptChoice {
    /// Index into the displayed candidate list
    Selected(usize),
    /// A literal iD typed by the operator, already validated
    Literal(String),
    /// Abandon this identifier's search
    Skip,
    /// Cancel the whole remaining batch
    Quit,
}

/// Display `candidates` and block until the operator chooses.
///
/// # Errors
/// Fails with [`TributorsError::Cancelled`] when the input stream closes.
pub fn choose_candidate(candidates: &[OrcidCandidate]) -> Result<PromptChoice> {
    for (i, candidate) in candidates.iter().enumerate() {
        describe(i, candidate);
    }

    let theme = ColorfulTheme::default();
    loop {
        let answer: String = Input::with_theme(&theme)
            .with_prompt("Number to select, [s]kip, [e]nter an iD, [q]uit")
            .allow_empty(true)
            .interact_text()
            .map_err(|_| TributorsError::Cancelled)?;
        let answer = answer.trim().to_lowercase();

        match answer.as_str() {
            "s" | "skip" => return Ok(PromptChoice::Skip),
            "q" | "quit" => return Ok(PromptChoice::Quit),
            "e" | "enter" => {
                let literal: String = Input::with_theme(&theme)
                    .with_prompt("ORCID iD (e.g. 0000-0002-1825-0097)")
                    .interact_text()
                    .map_err(|_| TributorsError::Cancelled)?;
                let literal = literal.trim().to_string();
                if super::is_valid_orcid(&literal) {
                    return Ok(PromptChoice::Literal(literal));
                }
                eprintln!(
                    "{}: {}",
                    "error".red().bold(),
                    TributorsError::InvalidOrcid { value: literal }
                );
            }
            other => match other.parse::<usize>() {
                Ok(n) if n >= 1 && n <= candidates.len() => {
                    return Ok(PromptChoice::Selected(n - 1));
                }
                _ => eprintln!(
                    "{}: choose 1-{}, s, e, or q",
                    "error".red().bold(),
                    candidates.len()
                ),
            },
        }
    }
}

fn describe(index: usize, candidate: &OrcidCandidate) {
    let name = candidate
        .full_name()
        .unwrap_or_else(|| "(no name)".to_string());
    println!(
        "  {}. {} {}",
        index + 1,
        name.bold(),
        format!("https://orcid.org/{}", candidate.orcid).dimmed()
    );
    if let Some(institution) = candidate.affiliation() {
        println!("     institution: {institution}");
    }
    if !candidate.aliases.is_empty() {
        println!("     aliases: {}", candidate.aliases.join(", "));
    }
    if !candidate.emails.is_empty() {
        println!("     email: {}", candidate.emails.join(", "));
    }
}
