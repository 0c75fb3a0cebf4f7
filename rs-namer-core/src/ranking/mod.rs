//! Unit-level aggregation of identifier rankings.
//!
//! This module provides:
//! - Per-occurrence suggestions and their unit aggregate (`Suggestion`, `SnippetSuggestions`)
//! - Thresholding, confidence gaps and unit triage (`SnippetScorer`)
//! - Junk-name perturbation and rank statistics (`RankStats`)

/// Suggestion value objects.
pub mod suggestion;

/// The snippet scorer.
pub mod snippet;

/// Perturbation experiments.
pub mod perturbation;

pub use perturbation::{RankStats, evaluate_perturbations, perturb_scope, sample_junk_name};
pub use snippet::{RankedUnit, SnippetScorer, most_unnatural};
pub use suggestion::{SnippetSuggestions, Suggestion};
