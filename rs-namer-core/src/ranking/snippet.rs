use std::collections::BTreeSet;
use std::sync::Arc;

use log::{info, warn};

use super::suggestion::{SnippetSuggestions, Suggestion};
use crate::config::{DEFAULT_CHUNK_FACTOR, ThresholdConfig};
use crate::error::{NamerError, NamerResult};
use crate::model::{CorpusUnit, UNK_SYMBOL};
use crate::parallel::map_chunks;
use crate::renaming::{IdentifierRenamer, Renaming};
use crate::scope::{Scope, ScopeExtractor};

/// Score of a whole unit, for triage.
#[derive(Clone, Debug, PartialEq)]
pub struct RankedUnit {
	pub name: String,
	pub suggestions: SnippetSuggestions,
}

/// Aggregates per-identifier rankings into unit-level naturalness scores.
///
/// # Responsibilities
/// - Rank every identifier occurrence of a unit (in parallel)
/// - Compute confidence gaps and apply per-kind thresholds
/// - Sum the reported gaps into a unit score
/// - Rank units against each other
///
/// # Notes
/// - Each occurrence gets exactly one attempt; failures are logged and the
///   occurrence is left out of the result.
pub struct SnippetScorer {
	renamer: Arc<IdentifierRenamer>,
	extractor: Arc<dyn ScopeExtractor>,
	thresholds: ThresholdConfig,
	chunk_factor: usize,
}

impl SnippetScorer {
	/// # Errors
	/// Returns an error if the thresholds are invalid.
	pub fn new(
		renamer: Arc<IdentifierRenamer>,
		extractor: Arc<dyn ScopeExtractor>,
		thresholds: ThresholdConfig,
	) -> NamerResult<Self> {
		thresholds.validate()?;
		Ok(Self { renamer, extractor, thresholds, chunk_factor: DEFAULT_CHUNK_FACTOR })
	}

	/// Sets the number of work chunks per CPU core.
	pub fn with_chunk_factor(mut self, chunk_factor: usize) -> Self {
		self.chunk_factor = chunk_factor.max(1);
		self
	}

	pub fn renamer(&self) -> &IdentifierRenamer {
		&self.renamer
	}

	pub fn thresholds(&self) -> &ThresholdConfig {
		&self.thresholds
	}

	pub fn chunk_factor(&self) -> usize {
		self.chunk_factor
	}

	/// Ranks every occurrence, most suspicious first.
	///
	/// Renamings are not filtered; the gap compares the current name (or
	/// UNK) with the top renaming.
	pub fn rank_suggestions(&self, occurrences: &[(Scope, String)]) -> Vec<Suggestion> {
		let mut suggestions: Vec<Suggestion> = map_chunks(occurrences, self.chunk_factor, |chunk| {
			chunk.iter().filter_map(|(scope, name)| self.suggest(scope, name)).collect::<Vec<_>>()
		})
		.into_iter()
		.flatten()
		.collect();
		suggestions.sort();
		suggestions
	}

	/// Scores a set of occurrences.
	///
	/// With `filter`, every ranking is first cut with `apply_threshold` for
	/// the kind of its scope. Only suggestions whose gap exceeds the
	/// reporting floor are kept and summed.
	pub fn score_occurrences(&self, occurrences: &[(Scope, String)], filter: bool) -> SnippetSuggestions {
		self.aggregate(self.rank_suggestions(occurrences), filter)
	}

	/// Extracts the occurrences of a unit and scores them, filtered.
	///
	/// # Errors
	/// Returns the scope extractor error.
	pub fn score_unit(&self, unit: &str) -> NamerResult<SnippetSuggestions> {
		let occurrences = self.extractor.extract(unit)?;
		Ok(self.score_occurrences(&occurrences, true))
	}

	/// Scores every unit in parallel, highest score first.
	///
	/// Units failing extraction are logged and skipped.
	pub fn rank_units(&self, units: &[CorpusUnit]) -> Vec<RankedUnit> {
		let mut ranked: Vec<RankedUnit> = map_chunks(units, self.chunk_factor, |chunk| {
			let mut ranked = Vec::with_capacity(chunk.len());
			for unit in chunk {
				match self.extractor.extract(&unit.source) {
					Ok(occurrences) => {
						let suggestions = self.suggestions_in_thread(&occurrences);
						ranked.push(RankedUnit { name: unit.name.clone(), suggestions: self.aggregate(suggestions, true) });
					}
					Err(e) => warn!("Skipping unit {}: {}", unit.name, e),
				}
			}
			ranked
		})
		.into_iter()
		.flatten()
		.collect();

		ranked.sort_by(|a, b| b.suggestions.score.total_cmp(&a.suggestions.score).then_with(|| a.name.cmp(&b.name)));
		info!("Ranked {} of {} units", ranked.len(), units.len());
		ranked
	}

	/// Keeps the renamings worth reporting.
	///
	/// Walks the ranking in ascending order and stops at the first score
	/// above `threshold` or after `max_rank` renamings, UNK included. UNK
	/// is always part of the result: if it was cut, it is added back with
	/// `threshold` as score and nothing is kept after it.
	///
	/// Applying the filter twice gives the same set.
	pub fn apply_threshold(renamings: &BTreeSet<Renaming>, threshold: f64, max_rank: usize) -> BTreeSet<Renaming> {
		let mut filtered: BTreeSet<Renaming> = renamings
			.iter()
			.take_while(|r| r.score <= threshold)
			.take(max_rank)
			.cloned()
			.collect();

		if !filtered.iter().any(Renaming::is_unk) {
			let scope = renamings.first().and_then(|r| r.scope.clone());
			let unk = Renaming::new(UNK_SYMBOL, threshold, 0, scope);
			// Ties at the threshold ordered after UNK
			filtered.split_off(&unk);
			filtered.insert(unk);
		}
		filtered
	}

	/// Score of the current name minus score of the top renaming.
	///
	/// The current name is the first renaming named `current` or, with
	/// `use_unk`, UNK. Returns `None` if neither is ranked.
	pub fn confidence_gap(renamings: &BTreeSet<Renaming>, current: &str, use_unk: bool) -> Option<f64> {
		let top = renamings.first()?.score;
		renamings
			.iter()
			.find(|r| r.name == current || (use_unk && r.is_unk()))
			.map(|r| r.score - top)
	}

	/// Sequential `rank_suggestions`, for callers already running on a
	/// worker thread.
	pub(crate) fn suggestions_in_thread(&self, occurrences: &[(Scope, String)]) -> Vec<Suggestion> {
		let mut suggestions: Vec<Suggestion> =
			occurrences.iter().filter_map(|(scope, name)| self.suggest(scope, name)).collect();
		suggestions.sort();
		suggestions
	}

	/// Ranks one occurrence. `None` (with a warning) if it cannot be scored.
	fn suggest(&self, scope: &Scope, name: &str) -> Option<Suggestion> {
		let scope = Arc::new(scope.clone());
		let renamings = self.renamer.rank_shared(&scope, name);
		if renamings.is_empty() {
			warn!("No candidate for '{name}', skipping");
			return None;
		}
		match Self::confidence_gap(&renamings, name, self.thresholds.use_unk) {
			Some(gap) => Some(Suggestion::new(name, scope, renamings, gap)),
			None => {
				warn!("Skipping '{}': {}", name, NamerError::MissingCurrentName(name.to_owned()));
				None
			}
		}
	}

	/// Filters (optionally) and keeps the suggestions above the reporting
	/// floor.
	fn aggregate(&self, suggestions: Vec<Suggestion>, filter: bool) -> SnippetSuggestions {
		let mut reported = Vec::new();
		let mut score = 0.0;
		for suggestion in suggestions {
			let (renamings, gap) = if filter {
				let threshold = self.thresholds.threshold_for(suggestion.scope.kind);
				let renamings = Self::apply_threshold(&suggestion.renamings, threshold, self.thresholds.max_rank);
				let top = renamings.first().map_or(threshold, |r| r.score);
				let gap = Self::confidence_gap(&renamings, &suggestion.identifier, self.thresholds.use_unk)
					.unwrap_or(threshold - top);
				(renamings, gap)
			} else {
				(suggestion.renamings, suggestion.confidence_gap)
			};

			if gap > self.thresholds.reporting_floor {
				score += gap;
				reported.push(Suggestion::new(suggestion.identifier, suggestion.scope, renamings, gap));
			}
		}
		reported.sort();
		SnippetSuggestions { suggestions: reported, score }
	}
}

/// The first `fraction` (in `[0, 1]`) of ranked units, rounded up.
pub fn most_unnatural(ranked: &[RankedUnit], fraction: f64) -> &[RankedUnit] {
	let fraction = fraction.clamp(0.0, 1.0);
	let count = ((ranked.len() as f64) * fraction).ceil() as usize;
	&ranked[..count.min(ranked.len())]
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::{ModelConfig, RenamerConfig};
	use crate::model::NGramLanguageModel;
	use crate::renaming::renamer::tests::rejecting_renamer;
	use crate::scope::{FlatScopeExtractor, ScopeKind};
	use crate::token::CodeTokenizer;

	fn ranking(entries: &[(&str, f64)]) -> BTreeSet<Renaming> {
		entries.iter().map(|(n, s)| Renaming::new(*n, *s, 1, None)).collect()
	}

	fn names(renamings: &BTreeSet<Renaming>) -> Vec<&str> {
		renamings.iter().map(|r| r.name.as_str()).collect()
	}

	fn scorer(sources: &[&str], thresholds: ThresholdConfig) -> SnippetScorer {
		let config = ModelConfig { order: 3, vocabulary_cutoff: 0, ..ModelConfig::default() };
		let units: Vec<CorpusUnit> = sources.iter().map(|s| CorpusUnit::new("unit", *s)).collect();
		let model = NGramLanguageModel::train(&config, &CodeTokenizer, &units).unwrap().model;
		let renamer = IdentifierRenamer::new(Arc::new(model), Arc::new(CodeTokenizer), RenamerConfig::default()).unwrap();
		let extractor = FlatScopeExtractor::new(CodeTokenizer, ScopeKind::Variable);
		SnippetScorer::new(Arc::new(renamer), Arc::new(extractor), thresholds).unwrap().with_chunk_factor(2)
	}

	#[test]
	fn test_threshold_cuts_and_adds_unk() {
		let filtered = SnippetScorer::apply_threshold(&ranking(&[("a", 0.5), ("b", 1.0), ("c", 7.0), (UNK_SYMBOL, 9.0)]), 6.0, 5);
		assert_eq!(names(&filtered), vec!["a", "b", UNK_SYMBOL]);
		assert_eq!(filtered.last().unwrap().score, 6.0);
	}

	#[test]
	fn test_threshold_caps_rank() {
		let filtered = SnippetScorer::apply_threshold(
			&ranking(&[("a", 0.1), ("b", 0.2), (UNK_SYMBOL, 0.3), ("c", 0.4), ("d", 0.5)]),
			6.0,
			2,
		);
		assert_eq!(names(&filtered), vec!["a", "b", UNK_SYMBOL]);
		assert_eq!(filtered.last().unwrap().score, 6.0);
	}

	#[test]
	fn test_threshold_cap_counts_unk() {
		let filtered = SnippetScorer::apply_threshold(
			&ranking(&[("a", 0.1), (UNK_SYMBOL, 0.2), ("b", 0.3), ("c", 0.4)]),
			6.0,
			2,
		);
		assert_eq!(names(&filtered), vec!["a", UNK_SYMBOL]);
		assert_eq!(filtered.last().unwrap().score, 0.2);
	}

	#[test]
	fn test_truncated_unk_widens_gap() {
		let original = ranking(&[("a", 0.1), ("b", 0.2), ("c", 0.3), ("d", 0.4), (UNK_SYMBOL, 0.5), ("x", 0.6)]);
		let filtered = SnippetScorer::apply_threshold(&original, 6.0, 2);
		assert_eq!(names(&filtered), vec!["a", "b", UNK_SYMBOL]);
		let gap = SnippetScorer::confidence_gap(&filtered, "x", true).unwrap();
		assert!((gap - 5.9).abs() < 1e-12);
	}

	#[test]
	fn test_threshold_ties_after_forced_unk() {
		let original = ranking(&[("a", 1.0), ("zed", 6.0), (UNK_SYMBOL, 7.0)]);
		let once = SnippetScorer::apply_threshold(&original, 6.0, 2);
		assert_eq!(names(&once), vec!["a", UNK_SYMBOL]);
		assert_eq!(names(&SnippetScorer::apply_threshold(&once, 6.0, 2)), names(&once));
	}

	#[test]
	fn test_threshold_is_idempotent() {
		let original = ranking(&[("a", 0.5), ("b", 1.0), ("c", 2.0), ("d", 3.0), ("e", 7.0), (UNK_SYMBOL, 8.0)]);
		let once = SnippetScorer::apply_threshold(&original, 6.0, 3);
		let twice = SnippetScorer::apply_threshold(&once, 6.0, 3);
		assert_eq!(names(&once), names(&twice));
		assert_eq!(once.iter().map(|r| r.score).collect::<Vec<_>>(), twice.iter().map(|r| r.score).collect::<Vec<_>>());
	}

	#[test]
	fn test_threshold_on_empty_ranking() {
		let filtered = SnippetScorer::apply_threshold(&BTreeSet::new(), 1.0, 5);
		assert_eq!(names(&filtered), vec![UNK_SYMBOL]);
	}

	#[test]
	fn test_confidence_gap() {
		let renamings = ranking(&[("count", 1.0), ("cnt", 3.0), (UNK_SYMBOL, 4.0)]);
		assert_eq!(SnippetScorer::confidence_gap(&renamings, "cnt", true), Some(2.0));
		assert_eq!(SnippetScorer::confidence_gap(&renamings, "count", true), Some(0.0));
		assert_eq!(SnippetScorer::confidence_gap(&renamings, "other", true), Some(3.0));
		assert_eq!(SnippetScorer::confidence_gap(&renamings, "other", false), None);
		assert_eq!(SnippetScorer::confidence_gap(&BTreeSet::new(), "x", true), None);
	}

	#[test]
	fn test_default_chunk_factor_matches_training() {
		let scorer = scorer(&["int a ;"], ThresholdConfig::default());
		assert_eq!(scorer.chunk_factor(), 2);
		let renamer = Arc::new(rejecting_renamer(vec![], "x"));
		let extractor = Arc::new(FlatScopeExtractor::new(CodeTokenizer, ScopeKind::Variable));
		let default = SnippetScorer::new(renamer, extractor, ThresholdConfig::default()).unwrap();
		assert_eq!(default.chunk_factor(), ModelConfig::default().chunk_factor);
	}

	#[test]
	fn test_occurrence_without_current_score_is_dropped() {
		let renamer = Arc::new(rejecting_renamer(vec!["good"], "x"));
		let extractor = Arc::new(FlatScopeExtractor::new(CodeTokenizer, ScopeKind::Variable));
		let occurrences = vec![
			(Scope::new("int x ;", ScopeKind::Variable), "x".to_owned()),
			(Scope::new("int y ;", ScopeKind::Variable), "y".to_owned()),
		];

		let strict = ThresholdConfig { use_unk: false, ..ThresholdConfig::default() };
		let scorer = SnippetScorer::new(renamer.clone(), extractor.clone(), strict).unwrap();
		let suggestions = scorer.rank_suggestions(&occurrences);
		assert_eq!(suggestions.len(), 1);
		assert_eq!(suggestions[0].identifier, "y");

		let lenient = SnippetScorer::new(renamer, extractor, ThresholdConfig::default()).unwrap();
		assert_eq!(lenient.rank_suggestions(&occurrences).len(), 2);
	}

	#[test]
	fn test_score_unit_reports_suspicious_names() {
		let mut corpus = vec!["int count = 0; count = count + 1;"; 20];
		corpus.push("int cnt = 0; cnt = cnt + 1;");
		let scorer = scorer(&corpus, ThresholdConfig::default());

		let scored = scorer.score_unit("int cnt = 0; cnt = cnt + 1;").unwrap();
		assert!(scored.score > 0.0);
		assert_eq!(scored.suggestions[0].identifier, "cnt");
		assert!(scored.suggestions.iter().all(|s| s.confidence_gap > 0.0));
		let total: f64 = scored.suggestions.iter().map(|s| s.confidence_gap).sum();
		assert!((scored.score - total).abs() < 1e-9);
	}

	#[test]
	fn test_rank_units_orders_by_score() {
		let mut corpus = vec!["int count = 0; count = count + 1;"; 20];
		corpus.push("int cnt = 0; cnt = cnt + 1;");
		let scorer = scorer(&corpus, ThresholdConfig::default());

		let units = vec![
			CorpusUnit::new("natural", "int count = 0; count = count + 1;"),
			CorpusUnit::new("odd", "int cnt = 0; cnt = cnt + 1;"),
			CorpusUnit::new("broken", "int \"x"),
		];
		let ranked = scorer.rank_units(&units);
		assert_eq!(ranked.len(), 2);
		assert_eq!(ranked[0].name, "odd");
		assert!(ranked[0].suggestions.score >= ranked[1].suggestions.score);
		assert_eq!(most_unnatural(&ranked, 0.5).len(), 1);
		assert_eq!(most_unnatural(&ranked, 0.0).len(), 0);
		assert_eq!(most_unnatural(&ranked, 2.0).len(), 2);
	}
}
