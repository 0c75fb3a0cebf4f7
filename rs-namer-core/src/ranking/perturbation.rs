use std::collections::BTreeSet;
use std::fmt;

use log::warn;
use rand::Rng;
use rand::seq::IteratorRandom;

use super::snippet::SnippetScorer;
use super::suggestion::Suggestion;
use crate::error::NamerResult;
use crate::parallel::map_chunks;
use crate::scope::Scope;
use crate::token::Tokenizer;

/// Number of ranks tracked by `RankStats`.
pub const RANK_SIZE: usize = 20;

/// Fallback junk name when every generated name is taken.
pub const JUNK_NAME: &str = "mblamblambla";

/// Number of distinct `junkN` names to sample from.
const JUNK_POOL_SIZE: usize = 1000;

/// Where injected names land in suggestion rankings.
///
/// Each worker fills its own accumulator; accumulators are merged once all
/// workers are done.
#[derive(Clone, Debug, PartialEq)]
pub struct RankStats {
	/// `hits[k]`: rankings where the target was within the top `k + 1`.
	hits: [u64; RANK_SIZE],
	total: u64,
	reciprocal_rank_sum: f64,
}

impl Default for RankStats {
	fn default() -> Self {
		Self { hits: [0; RANK_SIZE], total: 0, reciprocal_rank_sum: 0.0 }
	}
}

impl RankStats {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records one ranking with the 1-based `rank` of the target, `None` if
	/// it was not ranked.
	pub fn record(&mut self, rank: Option<usize>) {
		self.total += 1;
		let Some(rank) = rank.filter(|r| *r >= 1) else {
			return;
		};
		self.reciprocal_rank_sum += 1.0 / rank as f64;
		for hit in self.hits.iter_mut().skip(rank - 1) {
			*hit += 1;
		}
	}

	/// Records where `target` appears in a list of suggestions.
	///
	/// A list with a single suggestion says nothing about the ranking and is
	/// ignored.
	pub fn record_suggestions(&mut self, suggestions: &[Suggestion], target: &str) {
		if suggestions.len() == 1 {
			return;
		}
		self.record(suggestions.iter().position(|s| s.identifier == target).map(|p| p + 1));
	}

	pub fn merge(&mut self, other: &Self) {
		for (hit, other_hit) in self.hits.iter_mut().zip(other.hits.iter()) {
			*hit += other_hit;
		}
		self.total += other.total;
		self.reciprocal_rank_sum += other.reciprocal_rank_sum;
	}

	pub fn total(&self) -> u64 {
		self.total
	}

	/// Fraction of rankings with the target in the top `k` (`1..=RANK_SIZE`).
	pub fn hit_rate(&self, k: usize) -> f64 {
		if self.total == 0 || k == 0 {
			return 0.0;
		}
		self.hits[k.min(RANK_SIZE) - 1] as f64 / self.total as f64
	}

	pub fn mean_reciprocal_rank(&self) -> f64 {
		if self.total == 0 {
			return 0.0;
		}
		self.reciprocal_rank_sum / self.total as f64
	}
}

impl fmt::Display for RankStats {
	/// Comma separated hit rates for every rank, then the MRR.
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for k in 1..=RANK_SIZE {
			write!(f, "{},", self.hit_rate(k))?;
		}
		write!(f, "{}", self.mean_reciprocal_rank())
	}
}

/// Picks a random `junkN` name that is not in `used`.
///
/// Falls back to `JUNK_NAME` when every generated name is taken.
pub fn sample_junk_name<R: Rng + ?Sized>(rng: &mut R, used: &BTreeSet<String>) -> String {
	(1..=JUNK_POOL_SIZE)
		.map(|n| format!("junk{n}"))
		.filter(|name| !used.contains(name))
		.choose(rng)
		.unwrap_or_else(|| JUNK_NAME.to_owned())
}

/// Renames `from` to `to` in the snippet of a scope.
///
/// The snippet is re-emitted as space separated tokens.
///
/// # Errors
/// Returns the tokenizer error if the snippet cannot be tokenized.
pub fn perturb_scope(tokenizer: &dyn Tokenizer, scope: &Scope, from: &str, to: &str) -> NamerResult<Scope> {
	let wrapped = format!("%{from}%");
	let tokens: Vec<String> = tokenizer
		.token_texts(&scope.snippet)?
		.into_iter()
		.map(|token| {
			if token == from {
				to.to_owned()
			} else if token.contains(&wrapped) {
				token.replace(&wrapped, &format!("%{to}%"))
			} else {
				token
			}
		})
		.collect();
	Ok(scope.with_snippet(tokens.join(" ")))
}

/// Injects `junk` in place of every occurrence, in turn, and records how
/// high the junk name ranks among the suggestions of its scope.
///
/// Occurrences are processed in parallel with one `RankStats` per worker.
pub fn evaluate_perturbations(scorer: &SnippetScorer, occurrences: &[(Scope, String)], junk: &str) -> RankStats {
	let tokenizer = scorer.renamer().tokenizer();
	let partials = map_chunks(occurrences, scorer.chunk_factor(), |chunk| {
		let mut stats = RankStats::new();
		for (scope, name) in chunk {
			let perturbed = match perturb_scope(tokenizer.as_ref(), scope, name, junk) {
				Ok(perturbed) => perturbed,
				Err(e) => {
					warn!("Cannot perturb '{name}': {e}");
					continue;
				}
			};
			let group: Vec<(Scope, String)> = occurrences
				.iter()
				.filter(|(other, _)| other == scope)
				.map(|(_, other_name)| {
					let renamed = if other_name == name { junk.to_owned() } else { other_name.clone() };
					(perturbed.clone(), renamed)
				})
				.collect();
			stats.record_suggestions(&scorer.suggestions_in_thread(&group), junk);
		}
		stats
	});

	let mut stats = RankStats::new();
	for partial in &partials {
		stats.merge(partial);
	}
	stats
}
