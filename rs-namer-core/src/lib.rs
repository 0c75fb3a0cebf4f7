//! Identifier naturalness ranking.
//!
//! This crate learns how code is usually written and flags names that do
//! not fit. It provides:
//! - A smoothed n-gram language model over code tokens, trained in parallel
//! - Candidate name generation by wildcard substitution
//! - Cross-entropy ranking of candidates, with optional name priors
//! - Snippet-level aggregation and thresholding for triage
//!
//! Parsing and scope extraction are pluggable through the `Tokenizer` and
//! `ScopeExtractor` traits; simple implementations for C-like code are
//! included.

/// Error type shared by the crate.
pub mod error;

/// Configuration structures with their defaults and validation.
pub mod config;

/// Tokens and the tokenizer interface.
pub mod token;

/// Scope descriptors and the scope extractor interface.
pub mod scope;

/// The n-gram language model.
pub mod model;

/// Candidate generation and scoring for one identifier.
pub mod renaming;

/// Snippet aggregation, triage and perturbation experiments.
pub mod ranking;

/// Corpus loading and model blob persistence.
pub mod io;

/// Chunked worker pool.
///
/// Not exposed
pub(crate) mod parallel;

pub use error::{NamerError, NamerResult};
