//! Core types and functionality for tributors
//!
//! This module forms the foundation of the crate's type system:
//!
//! - [`error`] - the [`TributorsError`] taxonomy, the [`ErrorContext`]
//!   wrapper with user-facing suggestions, and [`user_friendly_error`]
//! - [`resource`] - the closed [`ResourceKind`] enum mapping resource names
//!   to adapters, and the all-contributors contribution vocabulary
//!
//! Every operation that can fail returns a [`Result`] carrying meaningful
//! error information; user-facing errors include a remedial suggestion.

pub mod error;
pub mod resource;

pub use error::{ErrorContext, TributorsError, user_friendly_error};
pub use resource::{CONTRIBUTION_TYPES, ResourceKind};
