use std::collections::{BTreeMap, HashMap};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::ngram::{ContextSet, NGram, fill_of};
use super::trie::CountTrie;
use super::vocabulary::{TokenId, UNK_ID, Vocabulary};
use crate::config::ModelConfig;
use crate::error::{NamerError, NamerResult};
use crate::parallel::map_chunks;
use crate::token::Tokenizer;

/// Read-only queries answered by a trained language model.
///
/// Implementations are immutable after construction, so any number of
/// scoring threads may share one model without locking.
pub trait LanguageModel: Send + Sync {
	/// Maximum n-gram length of the model.
	fn order(&self) -> usize;

	/// Smoothed probability of the last token of `ngram` given the others.
	/// Always in `(0, 1]`.
	fn probability(&self, ngram: &NGram) -> f64;

	/// Every token observed at the wildcard position of the contexts during
	/// training, weighted by frequency.
	fn alternative_fillers(&self, contexts: &ContextSet, wildcard: &str) -> BTreeMap<String, u64>;

	/// Returns `true` if the token collapsed to UNK.
	fn is_unknown(&self, token: &str) -> bool;
}

/// A unit of the training corpus (typically the content of one file).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorpusUnit {
	pub name: String,
	pub source: String,
}

impl CorpusUnit {
	pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
		Self { name: name.into(), source: source.into() }
	}
}

/// A unit left out of training because it could not be tokenized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedUnit {
	pub name: String,
	pub reason: String,
}

/// Result of a training run: the model and the units it had to skip.
#[derive(Debug)]
pub struct TrainingOutcome {
	pub model: NGramLanguageModel,
	pub skipped: Vec<SkippedUnit>,
}

/// Tokens of one unit plus which of them are identifiers.
struct TokenizedUnit {
	tokens: Vec<String>,
	identifiers: Vec<bool>,
}

/// Output of one tokenizing worker.
#[derive(Default)]
struct TokenizedChunk {
	units: Vec<TokenizedUnit>,
	token_counts: HashMap<String, u64>,
	skipped: Vec<SkippedUnit>,
}

/// Backoff-smoothed n-gram language model over code tokens.
///
/// # Responsibilities
/// - Train from a corpus of units (parallel count aggregation + merge)
/// - Answer smoothed probability queries (stupid backoff)
/// - List the tokens that filled a context during training
/// - Serialize to an opaque binary blob
///
/// # Invariants
/// - `order >= 1` and `0 < backoff_factor < 1`
/// - Every probability is strictly positive (unigrams are add-one smoothed
///   over the vocabulary, UNK included)
/// - Immutable once trained: retraining builds a new instance
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NGramLanguageModel {
	order: usize,
	backoff_factor: f64,
	vocabulary: Vocabulary,
	trie: CountTrie,
}

impl NGramLanguageModel {
	/// Creates the UNK-only model: every query falls back to the UNK
	/// unigram.
	///
	/// # Errors
	/// Returns an error if the configuration is invalid.
	pub fn empty(config: &ModelConfig) -> NamerResult<Self> {
		config.validate()?;
		Ok(Self {
			order: config.order,
			backoff_factor: config.backoff_factor,
			vocabulary: Vocabulary::unk_only(),
			trie: CountTrie::new(),
		})
	}

	/// Trains a model on a corpus.
	///
	/// # Behavior
	/// - Validates the configuration and rejects an empty corpus.
	/// - Tokenizes the units in parallel; units failing to tokenize are
	///   skipped, logged and reported in `TrainingOutcome::skipped`.
	/// - Builds the vocabulary from the merged token counts.
	/// - Counts, in parallel, the window starting at every position (length
	///   `min(order, remaining)`) into partial tries, then merges them.
	/// - Prunes n-grams seen at most `ngram_cutoff` times.
	///
	/// # Notes
	/// - Counting is a pure aggregation: the trained model is the same
	///   whatever the unit order or the number of workers.
	/// - If every unit fails, the UNK-only model is returned.
	///
	/// # Errors
	/// `NamerError::Config` or `NamerError::EmptyCorpus`.
	pub fn train<T: Tokenizer + ?Sized>(
		config: &ModelConfig,
		tokenizer: &T,
		units: &[CorpusUnit],
	) -> NamerResult<TrainingOutcome> {
		config.validate()?;
		if units.is_empty() {
			return Err(NamerError::EmptyCorpus);
		}

		info!("Tokenizing {} units...", units.len());
		let mut token_counts: HashMap<String, u64> = HashMap::new();
		let mut tokenized = Vec::with_capacity(units.len());
		let mut skipped = Vec::new();
		for chunk in map_chunks(units, config.chunk_factor, |chunk| Self::tokenize_chunk(tokenizer, chunk)) {
			for (token, count) in chunk.token_counts {
				*token_counts.entry(token).or_insert(0) += count;
			}
			tokenized.extend(chunk.units);
			skipped.extend(chunk.skipped);
		}

		let vocabulary = Vocabulary::build(&token_counts, config.vocabulary_cutoff);
		info!("Vocabulary built ({} symbols). Counting n-grams", vocabulary.len());

		let mut trie = CountTrie::new();
		for partial in map_chunks(&tokenized, config.chunk_factor, |chunk| {
			Self::count_chunk(chunk, &vocabulary, config)
		}) {
			trie.merge(&partial);
		}

		let pruned = trie.cutoff_rare(config.ngram_cutoff);
		if pruned > 0 {
			debug!("Pruned {pruned} rare n-grams");
		}
		info!("Model trained: {} n-grams, {} tokens, {} units skipped", trie.len(), trie.total(), skipped.len());

		let model = Self {
			order: config.order,
			backoff_factor: config.backoff_factor,
			vocabulary,
			trie,
		};
		Ok(TrainingOutcome { model, skipped })
	}

	fn tokenize_chunk<T: Tokenizer + ?Sized>(tokenizer: &T, units: &[CorpusUnit]) -> TokenizedChunk {
		let mut chunk = TokenizedChunk::default();
		for unit in units {
			match tokenizer.tokenize(&unit.source) {
				Ok(tokens) => {
					let mut tokenized = TokenizedUnit {
						tokens: Vec::with_capacity(tokens.len()),
						identifiers: Vec::with_capacity(tokens.len()),
					};
					for token in tokens {
						*chunk.token_counts.entry(token.text.clone()).or_insert(0) += 1;
						tokenized.identifiers.push(tokenizer.is_identifier(&token));
						tokenized.tokens.push(token.text);
					}
					chunk.units.push(tokenized);
				}
				Err(e) => {
					warn!("Skipping unit {}: {}", unit.name, e);
					chunk.skipped.push(SkippedUnit { name: unit.name.clone(), reason: e.to_string() });
				}
			}
		}
		chunk
	}

	fn count_chunk(units: &[TokenizedUnit], vocabulary: &Vocabulary, config: &ModelConfig) -> CountTrie {
		let mut trie = CountTrie::new();
		for unit in units {
			let ids: Vec<TokenId> = unit.tokens.iter().map(|t| vocabulary.id_of(t)).collect();
			for start in 0..ids.len() {
				let end = (start + config.order).min(ids.len());
				if config.identifier_neighbors_only && !unit.identifiers[start..end].iter().any(|is_id| *is_id) {
					continue;
				}
				trie.add(&ids[start..end]);
			}
		}
		trie
	}

	/// Probability of a sequence of vocabulary ids.
	fn backoff_probability(&self, ids: &[TokenId]) -> f64 {
		match ids {
			[] => 1.0,
			[id] => self.unigram_probability(*id),
			_ => {
				let count = self.trie.count(ids);
				if count > 0 {
					count as f64 / self.trie.count(&ids[..ids.len() - 1]) as f64
				} else {
					self.backoff_factor * self.backoff_probability(&ids[1..])
				}
			}
		}
	}

	/// Add-one smoothed unigram probability; sums to 1 over the vocabulary.
	fn unigram_probability(&self, id: TokenId) -> f64 {
		let count = self.trie.count(&[id]);
		(count + 1) as f64 / (self.trie.total() + self.vocabulary.len() as u64) as f64
	}

	pub fn backoff_factor(&self) -> f64 {
		self.backoff_factor
	}

	pub fn vocabulary(&self) -> &Vocabulary {
		&self.vocabulary
	}

	/// Raw training count of an n-gram (tokens mapped through the
	/// vocabulary).
	pub fn count(&self, ngram: &NGram) -> u64 {
		let ids: Vec<TokenId> = ngram.tokens().iter().map(|t| self.vocabulary.id_of(t)).collect();
		self.trie.count(&ids)
	}

	/// Serializes the model into a compact binary blob.
	pub fn to_bytes(&self) -> NamerResult<Vec<u8>> {
		Ok(postcard::to_stdvec(self)?)
	}

	/// Restores a model from a blob produced by `to_bytes`.
	pub fn from_bytes(bytes: &[u8]) -> NamerResult<Self> {
		Ok(postcard::from_bytes(bytes)?)
	}
}

impl LanguageModel for NGramLanguageModel {
	fn order(&self) -> usize {
		self.order
	}

	fn probability(&self, ngram: &NGram) -> f64 {
		let ids: Vec<TokenId> = ngram
			.suffix(self.order)
			.tokens()
			.iter()
			.map(|t| self.vocabulary.id_of(t))
			.collect();
		self.backoff_probability(&ids)
	}

	/// Looks up the left context of the wildcard in the trie and keeps the
	/// continuations carrying the wildcard's wrapping.
	///
	/// Contexts starting with the wildcard have no left context and are
	/// skipped, so the whole vocabulary is never scanned.
	fn alternative_fillers(&self, contexts: &ContextSet, wildcard: &str) -> BTreeMap<String, u64> {
		let mut fillers = BTreeMap::new();
		for (ngram, weight) in contexts {
			let Some(position) = ngram.tokens().iter().position(|t| t.contains(wildcard)) else {
				continue;
			};
			if position == 0 {
				continue;
			}
			let template = &ngram.tokens()[position];
			let first = position.saturating_sub(self.order - 1);
			let prefix: Vec<TokenId> = ngram.tokens()[first..position]
				.iter()
				.map(|t| self.vocabulary.id_of(t))
				.collect();

			for (id, count) in self.trie.continuations(&prefix) {
				if id == UNK_ID {
					continue;
				}
				let Some(token) = self.vocabulary.token(id) else {
					continue;
				};
				if let Some(name) = fill_of(template, token) {
					*fillers.entry(name.to_owned()).or_insert(0) += count * weight;
				}
			}
		}
		fillers
	}

	fn is_unknown(&self, token: &str) -> bool {
		self.vocabulary.is_unknown(token)
	}
}
