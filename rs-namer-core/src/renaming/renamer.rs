use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use log::{debug, warn};

use super::prior::NamePrior;
use crate::config::RenamerConfig;
use crate::error::{NamerError, NamerResult};
use crate::model::{ContextSet, LanguageModel, NGram, UNK_SYMBOL, WILDCARD_TOKEN};
use crate::scope::Scope;
use crate::token::Tokenizer;

/// A scored candidate name.
///
/// Renamings are ordered by ascending score (lower is more natural), ties
/// broken by name. Equality follows the same key.
#[derive(Clone, Debug)]
pub struct Renaming {
	pub name: String,
	/// Average cross-entropy (bits per context n-gram), priors included.
	pub score: f64,
	/// Approximate number of occurrences the score was computed on.
	pub contexts: usize,
	pub scope: Option<Arc<Scope>>,
}

impl Renaming {
	pub fn new(name: impl Into<String>, score: f64, contexts: usize, scope: Option<Arc<Scope>>) -> Self {
		Self { name: name.into(), score, contexts, scope }
	}

	pub fn is_unk(&self) -> bool {
		self.name == UNK_SYMBOL
	}
}

impl PartialEq for Renaming {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}

impl Eq for Renaming {}

impl PartialOrd for Renaming {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for Renaming {
	fn cmp(&self, other: &Self) -> Ordering {
		self.score.total_cmp(&other.score).then_with(|| self.name.cmp(&other.name))
	}
}

impl fmt::Display for Renaming {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{:.3}", self.name, self.score)
	}
}

/// How candidate scores are normalised.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScoringMode {
	/// `(priors - sum(log2(p) * w)) / sum(w)`
	CrossEntropy,
	/// `-sum(log2(p) * w)`, no priors, no normalisation. Used to rank the
	/// token filling one position (e.g. whitespace).
	Formatting,
}

/// Proposes and ranks alternative names for an identifier.
///
/// # Responsibilities
/// - Turn a snippet and a target identifier into wildcard contexts
/// - Build a bounded candidate pool from the model fillers
/// - Score every candidate by cross-entropy, adding name priors
///
/// # Invariants
/// - The model and priors are only read: one renamer can serve any number
///   of threads
/// - Every unfiltered ranking contains the current name and UNK unless a
///   candidate failed to score
pub struct IdentifierRenamer {
	model: Arc<dyn LanguageModel>,
	tokenizer: Arc<dyn Tokenizer>,
	priors: Vec<Arc<dyn NamePrior>>,
	config: RenamerConfig,
	mode: ScoringMode,
}

impl fmt::Debug for IdentifierRenamer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("IdentifierRenamer")
			.field("order", &self.model.order())
			.field("priors", &self.priors.len())
			.field("config", &self.config)
			.field("mode", &self.mode)
			.finish()
	}
}

impl IdentifierRenamer {
	/// Creates a renamer scoring with the model alone.
	///
	/// # Errors
	/// Returns an error if the configuration is invalid.
	pub fn new(
		model: Arc<dyn LanguageModel>,
		tokenizer: Arc<dyn Tokenizer>,
		config: RenamerConfig,
	) -> NamerResult<Self> {
		config.validate()?;
		Ok(Self { model, tokenizer, priors: Vec::new(), config, mode: ScoringMode::CrossEntropy })
	}

	/// Adds a name prior.
	pub fn with_prior(mut self, prior: Arc<dyn NamePrior>) -> Self {
		self.priors.push(prior);
		self
	}

	pub fn with_mode(mut self, mode: ScoringMode) -> Self {
		self.mode = mode;
		self
	}

	pub fn model(&self) -> &Arc<dyn LanguageModel> {
		&self.model
	}

	pub fn tokenizer(&self) -> &Arc<dyn Tokenizer> {
		&self.tokenizer
	}

	pub fn config(&self) -> &RenamerConfig {
		&self.config
	}

	pub fn mode(&self) -> ScoringMode {
		self.mode
	}

	/// Ranks the candidate names of `identifier` in `scope`.
	///
	/// Never fails: a snippet that cannot be tokenized gives an empty
	/// ranking ("no opinion"). An identifier absent from the snippet is
	/// scored on unigram probabilities only.
	pub fn rank(&self, scope: &Scope, identifier: &str) -> BTreeSet<Renaming> {
		self.rank_shared(&Arc::new(scope.clone()), identifier)
	}

	/// Same as `rank`, for a scope already shared by the caller.
	pub fn rank_shared(&self, scope: &Arc<Scope>, identifier: &str) -> BTreeSet<Renaming> {
		let contexts = match self.snippet_contexts(&scope.snippet, identifier) {
			Ok(contexts) => contexts,
			Err(e) => {
				warn!("Cannot rank '{identifier}': {e}");
				return BTreeSet::new();
			}
		};
		if contexts.is_empty() {
			debug!("'{identifier}' does not occur in its scope");
		}
		let candidates = self.candidate_pool(&contexts, identifier);
		self.score_candidates(&contexts, &candidates, Some(scope))
	}

	/// Ranks the names for an identifier whose occurrences are already
	/// known (token positions in an already tokenized unit).
	pub fn rank_at(&self, tokens: &[String], positions: &BTreeSet<usize>, current: &str) -> BTreeSet<Renaming> {
		let mut renamed = tokens.to_vec();
		for position in positions {
			if let Some(token) = renamed.get_mut(*position) {
				*token = WILDCARD_TOKEN.to_owned();
			}
		}
		let contexts = self.contexts_at(&renamed, positions);
		let candidates = self.candidate_pool(&contexts, current);
		self.score_candidates(&contexts, &candidates, None)
	}

	/// Ranks the tokens that could fill position `index` of `tokens`.
	///
	/// The candidates are the tokens seen in the same left contexts during
	/// training, the actual token and UNK.
	pub fn rank_token_at(&self, tokens: &[String], index: usize) -> BTreeSet<Renaming> {
		let Some(current) = tokens.get(index) else {
			return BTreeSet::new();
		};
		let contexts = self.formatting_contexts(index, tokens);
		let candidates = self.candidate_pool(&contexts, current);
		self.score_candidates(&contexts, &candidates, None)
	}

	/// Builds the wildcard contexts of `target` in a snippet.
	///
	/// Occurrences are tokens equal to the target or embedding it wrapped
	/// (`%target%`); the target text is replaced by the wildcard in them.
	///
	/// # Errors
	/// Returns the tokenizer error if the snippet cannot be tokenized.
	pub fn snippet_contexts(&self, snippet: &str, target: &str) -> NamerResult<ContextSet> {
		let mut tokens = self.tokenizer.token_texts(snippet)?;
		let wrapped = format!("%{target}%");
		let mut positions = BTreeSet::new();
		for (i, token) in tokens.iter_mut().enumerate() {
			if token == target || token.contains(&wrapped) {
				positions.insert(i);
				*token = token.replace(target, WILDCARD_TOKEN);
			}
		}
		Ok(self.contexts_at(&tokens, &positions))
	}

	/// Every window of length <= N containing one of `positions`.
	///
	/// For an occurrence at `p`, the windows end at `p..p+N`; a window ending
	/// past the last token is clipped there, keeping the shorter trailing
	/// context. Windows shared by several occurrences are counted once per
	/// occurrence.
	pub fn contexts_at(&self, tokens: &[String], positions: &BTreeSet<usize>) -> ContextSet {
		let order = self.model.order();
		let mut contexts = ContextSet::new();
		if tokens.is_empty() {
			return contexts;
		}
		let last = tokens.len() - 1;
		for &position in positions.iter().filter(|p| **p <= last) {
			for i in 0..order {
				let end = position + i;
				let start = (end + 1).saturating_sub(order);
				let ngram = NGram::window(tokens, start, end.min(last));
				*contexts.entry(ngram).or_insert(0) += 1;
			}
		}
		contexts
	}

	/// The windows around a single position, for token-level ranking.
	///
	/// Windows end at every position from `index` to `index + N - 1` that
	/// exists in `tokens`; no trailing window is clipped.
	pub fn formatting_contexts(&self, index: usize, tokens: &[String]) -> ContextSet {
		let order = self.model.order();
		let mut contexts = ContextSet::new();
		if index >= tokens.len() {
			return contexts;
		}
		let mut renamed = tokens.to_vec();
		renamed[index] = WILDCARD_TOKEN.to_owned();
		let last_end = (index + order - 1).min(tokens.len() - 1);
		for end in index..=last_end {
			let start = (end + 1).saturating_sub(order);
			*contexts.entry(NGram::window(&renamed, start, end)).or_insert(0) += 1;
		}
		contexts
	}

	/// Builds the candidate pool: the `max_candidates` most frequent
	/// fillers, the current name and UNK.
	///
	/// Fillers are ordered by frequency, then by name, so the cut is
	/// deterministic.
	pub fn candidate_pool(&self, contexts: &ContextSet, current: &str) -> BTreeSet<String> {
		let fillers: BTreeMap<String, u64> = self.model.alternative_fillers(contexts, WILDCARD_TOKEN);
		let mut ranked: Vec<(&String, &u64)> = fillers
			.iter()
			.filter(|(name, _)| name.as_str() != current && name.as_str() != UNK_SYMBOL)
			.collect();
		ranked.sort_by(|(a_name, a_count), (b_name, b_count)| b_count.cmp(a_count).then_with(|| a_name.cmp(b_name)));

		let mut pool: BTreeSet<String> = ranked
			.into_iter()
			.take(self.config.max_candidates)
			.map(|(name, _)| name.clone())
			.collect();
		pool.insert(current.to_owned());
		pool.insert(UNK_SYMBOL.to_owned());
		pool
	}

	/// Scores every candidate on the contexts.
	///
	/// With no context at all, the lone wildcard is used so candidates are
	/// ranked on their unigram probability. A candidate whose score cannot
	/// be computed is logged and left out.
	pub fn score_candidates(
		&self,
		contexts: &ContextSet,
		candidates: &BTreeSet<String>,
		scope: Option<&Arc<Scope>>,
	) -> BTreeSet<Renaming> {
		let unigram_context;
		let contexts = if contexts.is_empty() {
			unigram_context = ContextSet::from([(NGram::single(WILDCARD_TOKEN), 1)]);
			&unigram_context
		} else {
			contexts
		};

		let total_weight: u64 = contexts.values().sum();
		let occurrences = (total_weight as usize / self.model.order()).max(1);

		let mut renamings = BTreeSet::new();
		for name in candidates {
			let log_likelihood = match self.log_likelihood(contexts, name) {
				Ok(value) => value,
				Err(e) => {
					warn!("Skipping candidate '{name}': {e}");
					continue;
				}
			};
			let renaming = match self.mode {
				ScoringMode::CrossEntropy => {
					let prior = scope.map_or(0.0, |scope| self.prior_cost(name, scope));
					Renaming::new(name, (prior - log_likelihood) / total_weight as f64, occurrences, scope.cloned())
				}
				ScoringMode::Formatting => Renaming::new(name, -log_likelihood, 1, scope.cloned()),
			};
			renamings.insert(renaming);
		}
		renamings
	}

	/// `sum(log2(p(context with name)) * weight)` over the contexts.
	fn log_likelihood(&self, contexts: &ContextSet, name: &str) -> NamerResult<f64> {
		let mut sum = 0.0;
		for (ngram, weight) in contexts {
			let substituted = ngram.substitute(name)?;
			let probability = self.model.probability(&substituted);
			if !probability.is_finite() || probability <= 0.0 {
				return Err(NamerError::InvalidProbability { ngram: substituted.to_string(), probability });
			}
			sum += probability.log2() * *weight as f64;
		}
		Ok(sum)
	}

	/// Cost (in bits) of the name under every prior.
	///
	/// A prior giving zero probability costs the configured penalty, except
	/// for names the model does not know at all.
	fn prior_cost(&self, name: &str, scope: &Scope) -> f64 {
		self.priors
			.iter()
			.map(|prior| {
				let probability = prior.probability(name, scope);
				if probability > 0.0 {
					-probability.log2()
				} else if self.is_true_unk(name) {
					0.0
				} else {
					self.config.prior_penalty
				}
			})
			.sum()
	}

	/// Returns `true` if the model maps the name to UNK.
	pub fn is_true_unk(&self, name: &str) -> bool {
		self.model.is_unknown(name)
	}
}
