use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::model::UNK_SYMBOL;
use crate::renaming::Renaming;
use crate::scope::Scope;

/// Ranked renamings of one identifier occurrence.
///
/// Suggestions are ordered by decreasing confidence gap (most suspicious
/// name first), then identifier, then scope. Equality follows the same key.
#[derive(Clone, Debug)]
pub struct Suggestion {
	pub identifier: String,
	pub scope: Arc<Scope>,
	pub renamings: BTreeSet<Renaming>,
	/// Score of the current name minus score of the top renaming (>= 0).
	pub confidence_gap: f64,
}

impl Suggestion {
	pub fn new(identifier: impl Into<String>, scope: Arc<Scope>, renamings: BTreeSet<Renaming>, confidence_gap: f64) -> Self {
		Self { identifier: identifier.into(), scope, renamings, confidence_gap }
	}

	/// The most natural renaming.
	pub fn top(&self) -> Option<&Renaming> {
		self.renamings.first()
	}

	/// Probability mass of keeping the name, reading `2^-score` as an
	/// unnormalised likelihood: the current name and UNK over all renamings.
	///
	/// Returns `0` for an empty ranking.
	pub fn prob_not_rename(&self) -> f64 {
		let total: f64 = self.renamings.iter().map(|r| (-r.score).exp2()).sum();
		if total <= 0.0 {
			return 0.0;
		}
		self.renamings
			.iter()
			.filter(|r| r.name == self.identifier || r.name == UNK_SYMBOL)
			.map(|r| (-r.score).exp2() / total)
			.sum()
	}
}

impl PartialEq for Suggestion {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}

impl Eq for Suggestion {}

impl PartialOrd for Suggestion {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for Suggestion {
	fn cmp(&self, other: &Self) -> Ordering {
		other
			.confidence_gap
			.total_cmp(&self.confidence_gap)
			.then_with(|| self.identifier.cmp(&other.identifier))
			.then_with(|| self.scope.cmp(&other.scope))
	}
}

impl fmt::Display for Suggestion {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}({:.3})", self.identifier, self.confidence_gap)
	}
}

/// All reported suggestions of a code unit with its aggregate score.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SnippetSuggestions {
	pub suggestions: Vec<Suggestion>,
	/// Sum of the confidence gaps of the reported suggestions.
	pub score: f64,
}

impl SnippetSuggestions {
	/// `log2` of the probability that no identifier of the unit needs a
	/// new name, assuming occurrences are independent.
	///
	/// `-inf` if one suggestion leaves no mass to the current name.
	pub fn log_prob_not_renaming(&self) -> f64 {
		self.suggestions.iter().map(|s| s.prob_not_rename().log2()).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.suggestions.is_empty()
	}
}

impl fmt::Display for SnippetSuggestions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let names: Vec<String> = self.suggestions.iter().map(ToString::to_string).collect();
		write!(f, "[{}] score:{:.3}", names.join(", "), self.score)
	}
}
