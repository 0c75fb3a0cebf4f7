use serde::{Deserialize, Serialize};

use crate::error::{NamerError, NamerResult};
use crate::scope::ScopeKind;

/// Work chunks per CPU core used by parallel loops.
pub const DEFAULT_CHUNK_FACTOR: usize = 8;

/// Parameters used to train an n-gram language model.
///
/// # Responsibilities
/// - Hold the model order, the vocabulary and n-gram cutoffs
/// - Hold the backoff discount used by the smoothed probability
/// - Reject invalid combinations before any training starts
///
/// # Invariants (checked by `validate`)
/// - `order >= 1`
/// - `0.0 < backoff_factor < 1.0`
/// - `chunk_factor >= 1`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
	/// Maximum n-gram length (the N of the model).
	pub order: usize,

	/// Tokens seen at most this many times collapse to UNK.
	pub vocabulary_cutoff: u64,

	/// N-grams (length >= 2) seen at most this many times are pruned.
	/// `0` keeps everything.
	pub ngram_cutoff: u64,

	/// Discount applied each time the model backs off to a shorter n-gram.
	pub backoff_factor: f64,

	/// Only count windows that contain at least one identifier token.
	pub identifier_neighbors_only: bool,

	/// Number of work chunks per CPU used during parallel training.
	pub chunk_factor: usize,
}

impl Default for ModelConfig {
	fn default() -> Self {
		Self {
			order: 5,
			vocabulary_cutoff: 1,
			ngram_cutoff: 0,
			backoff_factor: 0.4,
			identifier_neighbors_only: false,
			chunk_factor: DEFAULT_CHUNK_FACTOR,
		}
	}
}

impl ModelConfig {
	/// Checks every field.
	///
	/// # Errors
	/// Returns `NamerError::Config` describing the first invalid field.
	pub fn validate(&self) -> NamerResult<()> {
		if self.order == 0 {
			return Err(NamerError::config("n-gram order must be >= 1"));
		}
		if !(self.backoff_factor > 0.0 && self.backoff_factor < 1.0) {
			return Err(NamerError::config(format!(
				"backoff factor must be in (0, 1), got {}",
				self.backoff_factor
			)));
		}
		if self.chunk_factor == 0 {
			return Err(NamerError::config("chunk factor must be >= 1"));
		}
		Ok(())
	}
}

/// Parameters of the candidate generator and scorer.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct RenamerConfig {
	/// Maximum number of filler names kept in a candidate pool (the K).
	/// The current name and UNK are added on top of it.
	pub max_candidates: usize,

	/// Finite penalty (in bits) added when a prior gives a known name a
	/// zero probability.
	pub prior_penalty: f64,
}

impl Default for RenamerConfig {
	fn default() -> Self {
		Self { max_candidates: 1000, prior_penalty: 6.0 }
	}
}

impl RenamerConfig {
	/// # Errors
	/// Returns an error if `max_candidates` is zero or the penalty is not a
	/// finite, non-negative number.
	pub fn validate(&self) -> NamerResult<()> {
		if self.max_candidates == 0 {
			return Err(NamerError::config("max_candidates must be >= 1"));
		}
		if !self.prior_penalty.is_finite() || self.prior_penalty < 0.0 {
			return Err(NamerError::config(format!(
				"prior penalty must be finite and >= 0, got {}",
				self.prior_penalty
			)));
		}
		Ok(())
	}
}

/// Thresholds deciding which suggestions are worth reporting.
///
/// One threshold exists per identifier kind: a candidate whose score is
/// above the threshold of its kind is never reported.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ThresholdConfig {
	/// Threshold for variables.
	pub variable: f64,

	/// Threshold for method names.
	pub method: f64,

	/// Threshold for type names.
	pub type_name: f64,

	/// Maximum number of renamings (UNK included) kept per suggestion.
	pub max_rank: usize,

	/// Suggestions whose confidence gap is not above this floor are left
	/// out of a snippet score.
	pub reporting_floor: f64,

	/// Treat UNK as equivalent to the current name when computing gaps.
	pub use_unk: bool,
}

impl Default for ThresholdConfig {
	fn default() -> Self {
		Self {
			variable: 6.0,
			method: 1.0,
			type_name: 1.0,
			max_rank: 5,
			reporting_floor: 0.0,
			use_unk: true,
		}
	}
}

impl ThresholdConfig {
	/// Returns the threshold matching an identifier kind.
	pub fn threshold_for(&self, kind: ScopeKind) -> f64 {
		match kind {
			ScopeKind::Method => self.method,
			ScopeKind::Type => self.type_name,
			ScopeKind::Variable => self.variable,
		}
	}

	/// # Errors
	/// Returns an error if a threshold is not finite or `max_rank` is zero.
	pub fn validate(&self) -> NamerResult<()> {
		for (name, value) in [
			("variable", self.variable),
			("method", self.method),
			("type_name", self.type_name),
			("reporting_floor", self.reporting_floor),
		] {
			if !value.is_finite() {
				return Err(NamerError::config(format!("{name} threshold must be finite")));
			}
		}
		if self.max_rank == 0 {
			return Err(NamerError::config("max_rank must be >= 1"));
		}
		Ok(())
	}
}
