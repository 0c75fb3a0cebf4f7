//! Candidate generation and scoring for a single identifier.
//!
//! This module provides:
//! - The renamer turning a scope into ranked candidate names (`IdentifierRenamer`)
//! - Name priors conditioned on the scope (`GrammarPrior`, `TypePrior`)
//! - The registry of scoring strategies (`ScoringStrategy`)

/// Context extraction, candidate pool and cross-entropy scoring.
pub mod renamer;

/// Conditional name distributions used as priors.
pub mod prior;

/// Strategy enum and the resources it is built from.
pub mod strategy;

pub use prior::{ConditionalDistribution, GrammarPrior, NamePrior, TypePrior};
pub use renamer::{IdentifierRenamer, Renaming, ScoringMode};
pub use strategy::{RenamerResources, ScoringStrategy};
