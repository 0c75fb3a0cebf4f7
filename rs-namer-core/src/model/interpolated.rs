use std::collections::BTreeMap;
use std::sync::Arc;

use super::language_model::{LanguageModel, NGramLanguageModel};
use super::ngram::{ContextSet, NGram};
use crate::error::{NamerError, NamerResult};

/// Default weight of the global model.
pub const DEFAULT_LAMBDA: f64 = 0.2;

/// Mixes a large, shared global model with a model trained on the local
/// project.
///
/// `p = lambda * global(last global.order tokens) + (1 - lambda) * local(ngram)`
///
/// Candidate discovery and the UNK test use the local model only: names are
/// proposed from the project, the global model only reshapes their scores.
#[derive(Clone, Debug)]
pub struct InterpolatedLanguageModel {
	global: Arc<NGramLanguageModel>,
	local: Arc<NGramLanguageModel>,
	lambda: f64,
}

impl InterpolatedLanguageModel {
	/// # Errors
	/// Returns `NamerError::Config` if `lambda` is outside `[0, 1]`.
	pub fn new(global: Arc<NGramLanguageModel>, local: Arc<NGramLanguageModel>, lambda: f64) -> NamerResult<Self> {
		if !(0.0..=1.0).contains(&lambda) {
			return Err(NamerError::config(format!("interpolation weight must be in [0, 1], got {lambda}")));
		}
		Ok(Self { global, local, lambda })
	}

	pub fn lambda(&self) -> f64 {
		self.lambda
	}

	pub fn global(&self) -> &NGramLanguageModel {
		&self.global
	}

	pub fn local(&self) -> &NGramLanguageModel {
		&self.local
	}
}

impl LanguageModel for InterpolatedLanguageModel {
	fn order(&self) -> usize {
		self.local.order()
	}

	fn probability(&self, ngram: &NGram) -> f64 {
		let global = self.global.probability(&ngram.suffix(self.global.order()));
		self.lambda * global + (1.0 - self.lambda) * self.local.probability(ngram)
	}

	fn alternative_fillers(&self, contexts: &ContextSet, wildcard: &str) -> BTreeMap<String, u64> {
		self.local.alternative_fillers(contexts, wildcard)
	}

	fn is_unknown(&self, token: &str) -> bool {
		self.local.is_unknown(token)
	}
}
