use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use log::info;

use super::prior::{GrammarPrior, TypePrior};
use super::renamer::{IdentifierRenamer, ScoringMode};
use crate::config::RenamerConfig;
use crate::error::{NamerError, NamerResult};
use crate::model::interpolated::{DEFAULT_LAMBDA, InterpolatedLanguageModel};
use crate::model::{LanguageModel, NGramLanguageModel};
use crate::token::Tokenizer;

/// Penalty used by strategies relying on a single prior.
pub const SINGLE_PRIOR_PENALTY: f64 = 100.0;

/// Penalty used when several priors are combined.
pub const COMBINED_PRIOR_PENALTY: f64 = 6.0;

/// The fixed set of scoring strategies.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScoringStrategy {
	/// N-gram cross-entropy only.
	Base,
	/// Adds the syntactic-position prior.
	GrammarPrior,
	/// Adds the inferred-type prior.
	TypePrior,
	/// Adds any combination of both priors.
	AllPriors { use_grammar: bool, use_types: bool },
	/// Mixes a global model into the local one.
	Interpolated { lambda: f64 },
	/// Token-level ranking (unnormalised scores).
	Formatting,
}

impl ScoringStrategy {
	/// Prior penalty this strategy uses unless the configuration overrides
	/// it.
	pub fn default_penalty(&self) -> f64 {
		match self {
			Self::GrammarPrior | Self::TypePrior => SINGLE_PRIOR_PENALTY,
			_ => COMBINED_PRIOR_PENALTY,
		}
	}

	/// Builds a renamer from explicit resources.
	///
	/// # Errors
	/// Returns `NamerError::Config` when a resource the strategy needs is
	/// missing, or when the configuration is invalid.
	pub fn build(&self, resources: &RenamerResources, config: RenamerConfig) -> NamerResult<IdentifierRenamer> {
		info!("Building {self} renamer");
		let model: Arc<dyn LanguageModel> = match self {
			Self::Interpolated { lambda } => {
				let global = resources
					.global_model
					.clone()
					.ok_or_else(|| NamerError::config("interpolated strategy needs a global model"))?;
				Arc::new(InterpolatedLanguageModel::new(global, resources.model.clone(), *lambda)?)
			}
			_ => resources.model.clone(),
		};
		let renamer = IdentifierRenamer::new(model, resources.tokenizer.clone(), config)?;

		Ok(match self {
			Self::Base | Self::Interpolated { .. } => renamer,
			Self::Formatting => renamer.with_mode(ScoringMode::Formatting),
			Self::GrammarPrior => renamer.with_prior(resources.require_grammar()?),
			Self::TypePrior => renamer.with_prior(resources.require_types()?),
			Self::AllPriors { use_grammar, use_types } => {
				let mut renamer = renamer;
				if *use_types {
					renamer = renamer.with_prior(resources.require_types()?);
				}
				if *use_grammar {
					renamer = renamer.with_prior(resources.require_grammar()?);
				}
				renamer
			}
		})
	}

	/// Builds a renamer with the configuration, using this strategy's
	/// penalty.
	pub fn build_default(&self, resources: &RenamerResources) -> NamerResult<IdentifierRenamer> {
		let config = RenamerConfig { prior_penalty: self.default_penalty(), ..RenamerConfig::default() };
		self.build(resources, config)
	}
}

impl fmt::Display for ScoringStrategy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Base => f.write_str("base"),
			Self::GrammarPrior => f.write_str("grammar"),
			Self::TypePrior => f.write_str("types"),
			Self::AllPriors { .. } => f.write_str("all-priors"),
			Self::Interpolated { .. } => f.write_str("interpolated"),
			Self::Formatting => f.write_str("formatting"),
		}
	}
}

impl FromStr for ScoringStrategy {
	type Err = NamerError;

	/// Parses a strategy name. `all-priors` enables both priors and
	/// `interpolated` uses the default weight.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"base" => Ok(Self::Base),
			"grammar" => Ok(Self::GrammarPrior),
			"types" => Ok(Self::TypePrior),
			"all-priors" => Ok(Self::AllPriors { use_grammar: true, use_types: true }),
			"interpolated" => Ok(Self::Interpolated { lambda: DEFAULT_LAMBDA }),
			"formatting" => Ok(Self::Formatting),
			other => Err(NamerError::config(format!("unknown scoring strategy '{other}'"))),
		}
	}
}

/// Everything a strategy may need to build a renamer.
#[derive(Clone)]
pub struct RenamerResources {
	pub model: Arc<NGramLanguageModel>,
	/// Shared global model for interpolation.
	pub global_model: Option<Arc<NGramLanguageModel>>,
	pub grammar_prior: Option<Arc<GrammarPrior>>,
	pub type_prior: Option<Arc<TypePrior>>,
	pub tokenizer: Arc<dyn Tokenizer>,
}

impl RenamerResources {
	pub fn new(model: Arc<NGramLanguageModel>, tokenizer: Arc<dyn Tokenizer>) -> Self {
		Self { model, global_model: None, grammar_prior: None, type_prior: None, tokenizer }
	}

	pub fn with_global_model(mut self, global_model: Arc<NGramLanguageModel>) -> Self {
		self.global_model = Some(global_model);
		self
	}

	pub fn with_grammar_prior(mut self, prior: Arc<GrammarPrior>) -> Self {
		self.grammar_prior = Some(prior);
		self
	}

	pub fn with_type_prior(mut self, prior: Arc<TypePrior>) -> Self {
		self.type_prior = Some(prior);
		self
	}

	fn require_grammar(&self) -> NamerResult<Arc<GrammarPrior>> {
		self.grammar_prior.clone().ok_or_else(|| NamerError::config("strategy needs a grammar prior"))
	}

	fn require_types(&self) -> NamerResult<Arc<TypePrior>> {
		self.type_prior.clone().ok_or_else(|| NamerError::config("strategy needs a type prior"))
	}
}
