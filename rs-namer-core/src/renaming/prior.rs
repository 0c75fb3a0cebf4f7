use std::collections::HashMap;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::model::CorpusUnit;
use crate::parallel::map_chunks;
use crate::scope::{Scope, ScopeExtractor};

/// Probability of a candidate name given the scope it would live in.
///
/// Priors are queried additively during scoring: a candidate pays
/// `-log2(p)` for every enabled prior.
pub trait NamePrior: Send + Sync {
	/// Returns a probability in `[0, 1]`.
	fn probability(&self, name: &str, scope: &Scope) -> f64;
}

/// Discrete conditional distribution `P(element | given)` estimated by
/// maximum likelihood from counts.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ConditionalDistribution {
	counts: HashMap<String, HashMap<String, u64>>,
	totals: HashMap<String, u64>,
}

impl ConditionalDistribution {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records one observation of `element` under `given`.
	pub fn add(&mut self, element: &str, given: &str) {
		self.add_count(element, given, 1);
	}

	pub fn add_count(&mut self, element: &str, given: &str, count: u64) {
		*self
			.counts
			.entry(given.to_owned())
			.or_default()
			.entry(element.to_owned())
			.or_insert(0) += count;
		*self.totals.entry(given.to_owned()).or_insert(0) += count;
	}

	/// Maximum likelihood estimate; `0` if `given` was never observed.
	pub fn probability(&self, element: &str, given: &str) -> f64 {
		let Some(total) = self.totals.get(given).copied().filter(|t| *t > 0) else {
			return 0.0;
		};
		let count = self.counts.get(given).and_then(|c| c.get(element)).copied().unwrap_or(0);
		count as f64 / total as f64
	}

	/// The most frequent element under `given` (ties broken by name).
	pub fn most_likely(&self, given: &str) -> Option<&str> {
		self.counts
			.get(given)?
			.iter()
			.max_by(|(a_name, a_count), (b_name, b_count)| a_count.cmp(b_count).then_with(|| b_name.cmp(a_name)))
			.map(|(name, _)| name.as_str())
	}

	/// Sums the counts of `other` into this distribution.
	pub fn merge(&mut self, other: &Self) {
		for (given, elements) in &other.counts {
			for (element, count) in elements {
				self.add_count(element, given, *count);
			}
		}
	}
}

/// Names conditioned on their syntactic position:
/// `P(name | category) * P(name | parent_category)`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct GrammarPrior {
	by_category: ConditionalDistribution,
	by_parent_category: ConditionalDistribution,
}

impl GrammarPrior {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn observe(&mut self, scope: &Scope, name: &str) {
		self.by_category.add(name, &scope.category);
		self.by_parent_category.add(name, &scope.parent_category);
	}

	pub fn merge(&mut self, other: &Self) {
		self.by_category.merge(&other.by_category);
		self.by_parent_category.merge(&other.by_parent_category);
	}

	/// Builds the prior from the occurrences a scope extractor finds in a
	/// corpus. Units failing extraction are logged and skipped.
	pub fn build<E: ScopeExtractor + ?Sized>(extractor: &E, units: &[CorpusUnit], chunk_factor: usize) -> Self {
		let mut prior = Self::new();
		for partial in map_chunks(units, chunk_factor, |chunk| {
			let mut partial = Self::new();
			for (scope, name) in extract_all(extractor, chunk) {
				partial.observe(&scope, &name);
			}
			partial
		}) {
			prior.merge(&partial);
		}
		prior
	}
}

impl NamePrior for GrammarPrior {
	fn probability(&self, name: &str, scope: &Scope) -> f64 {
		self.by_category.probability(name, &scope.category)
			* self.by_parent_category.probability(name, &scope.parent_category)
	}
}

/// Names conditioned on the inferred type of the identifier.
///
/// Scopes without a type are not constrained (probability 1).
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct TypePrior {
	by_type: ConditionalDistribution,
}

impl TypePrior {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn observe(&mut self, scope: &Scope, name: &str) {
		if let Some(inferred_type) = &scope.inferred_type {
			self.by_type.add(name, inferred_type);
		}
	}

	pub fn merge(&mut self, other: &Self) {
		self.by_type.merge(&other.by_type);
	}

	/// Most common name for a type.
	pub fn most_likely_name(&self, inferred_type: &str) -> Option<&str> {
		self.by_type.most_likely(inferred_type)
	}

	pub fn build<E: ScopeExtractor + ?Sized>(extractor: &E, units: &[CorpusUnit], chunk_factor: usize) -> Self {
		let mut prior = Self::new();
		for partial in map_chunks(units, chunk_factor, |chunk| {
			let mut partial = Self::new();
			for (scope, name) in extract_all(extractor, chunk) {
				partial.observe(&scope, &name);
			}
			partial
		}) {
			prior.merge(&partial);
		}
		prior
	}
}

impl NamePrior for TypePrior {
	fn probability(&self, name: &str, scope: &Scope) -> f64 {
		match &scope.inferred_type {
			Some(inferred_type) => self.by_type.probability(name, inferred_type),
			None => 1.0,
		}
	}
}

fn extract_all<E: ScopeExtractor + ?Sized>(extractor: &E, units: &[CorpusUnit]) -> Vec<(Scope, String)> {
	let mut occurrences = Vec::new();
	for unit in units {
		match extractor.extract(&unit.source) {
			Ok(found) => occurrences.extend(found),
			Err(e) => warn!("Skipping unit {} while building prior: {}", unit.name, e),
		}
	}
	occurrences
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::scope::{FlatScopeExtractor, ScopeKind};
	use crate::token::CodeTokenizer;

	#[test]
	fn test_conditional_distribution() {
		let mut distribution = ConditionalDistribution::new();
		distribution.add("i", "int");
		distribution.add("i", "int");
		distribution.add("count", "int");
		assert!((distribution.probability("i", "int") - 2.0 / 3.0).abs() < 1e-12);
		assert_eq!(distribution.probability("name", "int"), 0.0);
		assert_eq!(distribution.probability("i", "String"), 0.0);
		assert_eq!(distribution.most_likely("int"), Some("i"));
		assert_eq!(distribution.most_likely("String"), None);
	}

	#[test]
	fn test_merge_adds_counts() {
		let mut a = ConditionalDistribution::new();
		a.add("i", "int");
		let mut b = ConditionalDistribution::new();
		b.add("j", "int");
		a.merge(&b);
		assert_eq!(a.probability("j", "int"), 0.5);
	}

	#[test]
	fn test_grammar_prior() {
		let mut prior = GrammarPrior::new();
		let parameter = Scope::new("", ScopeKind::Variable).with_categories("parameter", "method");
		let field = Scope::new("", ScopeKind::Variable).with_categories("field", "class");
		prior.observe(&parameter, "value");
		prior.observe(&parameter, "index");
		prior.observe(&field, "value");

		assert_eq!(prior.probability("value", &parameter), 0.25);
		assert_eq!(prior.probability("index", &field), 0.0);
	}

	#[test]
	fn test_grammar_prior_multiplies_both_factors() {
		let mut prior = GrammarPrior::new();
		let method_parameter = Scope::new("", ScopeKind::Variable).with_categories("parameter", "method");
		let lambda_parameter = Scope::new("", ScopeKind::Variable).with_categories("parameter", "lambda");
		prior.observe(&method_parameter, "value");
		prior.observe(&method_parameter, "index");
		prior.observe(&lambda_parameter, "value");

		// P(value | parameter) = 2/3, P(value | method) = 1/2
		assert!((prior.probability("value", &method_parameter) - 1.0 / 3.0).abs() < 1e-12);
		// P(value | lambda) = 1
		assert!((prior.probability("value", &lambda_parameter) - 2.0 / 3.0).abs() < 1e-12);
		assert!((prior.probability("index", &method_parameter) - 1.0 / 6.0).abs() < 1e-12);
		assert_eq!(prior.probability("index", &lambda_parameter), 0.0);
	}

	#[test]
	fn test_type_prior() {
		let mut prior = TypePrior::new();
		let int_scope = Scope::new("", ScopeKind::Variable).with_type("int");
		prior.observe(&int_scope, "i");
		prior.observe(&int_scope, "i");
		prior.observe(&int_scope, "n");

		assert!((prior.probability("i", &int_scope) - 2.0 / 3.0).abs() < 1e-12);
		assert_eq!(prior.probability("anything", &Scope::new("", ScopeKind::Variable)), 1.0);
		assert_eq!(prior.most_likely_name("int"), Some("i"));
	}

	#[test]
	fn test_build_from_units() {
		let extractor = FlatScopeExtractor::new(CodeTokenizer, ScopeKind::Variable);
		let units = vec![CorpusUnit::new("a", "x = y;"), CorpusUnit::new("b", "x = 1;"), CorpusUnit::new("c", "\"broken")];
		let prior = GrammarPrior::build(&extractor, &units, 2);
		let scope = Scope::new("", ScopeKind::Variable).with_categories("unit", "");
		assert!((prior.probability("x", &scope) - (2.0f64 / 3.0).powi(2)).abs() < 1e-12);
	}
}
