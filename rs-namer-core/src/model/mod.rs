//! N-gram language model over code tokens.
//!
//! This module provides:
//! - Token n-grams with wildcard substitution (`NGram`, `ContextSet`)
//! - The training vocabulary with its UNK symbol (`Vocabulary`)
//! - A mergeable count store (`CountTrie`)
//! - The smoothed, trainable model (`NGramLanguageModel`)
//! - Global/local mixing (`InterpolatedLanguageModel`)

/// Token n-grams, the wildcard placeholder and context sets.
pub mod ngram;

/// Vocabulary of a trained model.
///
/// Tokens below the frequency cutoff collapse to `UNK_SYMBOL`.
pub mod vocabulary;

/// Prefix-tree count store.
///
/// Supports insertion, lookup, continuation listing, merging
/// and pruning of rare n-grams.
pub mod trie;

/// The `LanguageModel` trait and the backoff-smoothed n-gram model.
///
/// Handles parallel training, probability queries,
/// filler discovery and binary serialization.
pub mod language_model;

/// Interpolation between a global and a local model.
pub mod interpolated;

pub use language_model::{CorpusUnit, LanguageModel, NGramLanguageModel, SkippedUnit, TrainingOutcome};
pub use ngram::{ContextSet, NGram, UNK_SYMBOL, WILDCARD_TOKEN};
