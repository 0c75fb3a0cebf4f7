//! Error types shared by every module of the crate.

use thiserror::Error;

/// Main error type for naming operations.
///
/// Configuration errors are raised eagerly when a model, renamer or scorer
/// is constructed. Per-query errors are usually recovered by the caller
/// (the offending candidate or occurrence is skipped and logged).
#[derive(Error, Debug)]
pub enum NamerError {
	/// Invalid configuration value
	#[error("Configuration error: {0}")]
	Config(String),

	/// Training was requested on a corpus without any unit
	#[error("Training corpus is empty")]
	EmptyCorpus,

	/// A unit or snippet could not be tokenized
	#[error("Tokenization error: {0}")]
	Tokenize(String),

	/// A context n-gram does not contain the wildcard token
	#[error("N-gram has no wildcard token: {0}")]
	MissingWildcard(String),

	/// The model returned a probability outside (0, 1]
	#[error("Invalid probability {probability} for n-gram {ngram}")]
	InvalidProbability { ngram: String, probability: f64 },

	/// Neither the current name nor UNK is part of a ranking
	#[error("No score available for current name '{0}'")]
	MissingCurrentName(String),

	/// The scope extractor failed on a unit
	#[error("Scope extraction error: {0}")]
	ScopeExtraction(String),

	/// IO error
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	/// Model blob (de)serialization error
	#[error("Serialization error: {0}")]
	Serialization(#[from] postcard::Error),
}

/// Result type for naming operations
pub type NamerResult<T> = Result<T, NamerError>;

impl NamerError {
	/// Create a configuration error
	pub fn config(msg: impl Into<String>) -> Self {
		Self::Config(msg.into())
	}

	/// Create a tokenization error
	pub fn tokenize(msg: impl Into<String>) -> Self {
		Self::Tokenize(msg.into())
	}
}
