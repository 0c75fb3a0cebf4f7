use std::collections::BTreeMap;
use std::fmt;

use crate::error::{NamerError, NamerResult};

/// Placeholder standing for the identifier under evaluation.
pub const WILDCARD_TOKEN: &str = "%WC%";

/// Reserved symbol for every token outside the trained vocabulary.
pub const UNK_SYMBOL: &str = "UNK_SYMBOL";

/// Multiset of context n-grams. The value is the number of times the
/// n-gram was produced (its weight).
///
/// Ordered so that iterating (and summing floating point scores) is
/// deterministic.
pub type ContextSet = BTreeMap<NGram, u64>;

/// Ordered, immutable sequence of tokens.
///
/// # Invariants
/// - An n-gram is never empty
/// - Tokens are stored verbatim; the wildcard may appear alone
///   (`%WC%`) or embedded in a wrapped token (`var%%WC%%`)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NGram {
	tokens: Vec<String>,
}

impl NGram {
	/// Creates an n-gram from a token list.
	///
	/// Returns `None` if the list is empty.
	pub fn new(tokens: Vec<String>) -> Option<Self> {
		if tokens.is_empty() {
			return None;
		}
		Some(Self { tokens })
	}

	/// One-token n-gram.
	pub fn single(token: impl Into<String>) -> Self {
		Self { tokens: vec![token.into()] }
	}

	/// Builds the window `tokens[start..=end]`.
	///
	/// # Panics
	/// Panics if the range is out of bounds; callers compute windows inside
	/// the token list.
	pub(crate) fn window(tokens: &[String], start: usize, end: usize) -> Self {
		Self { tokens: tokens[start..=end].to_vec() }
	}

	pub fn len(&self) -> usize {
		self.tokens.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tokens.is_empty()
	}

	pub fn tokens(&self) -> &[String] {
		&self.tokens
	}

	/// Position of the first token containing the wildcard.
	pub fn wildcard_position(&self) -> Option<usize> {
		self.tokens.iter().position(|t| t.contains(WILDCARD_TOKEN))
	}

	/// Replaces the wildcard with `name` in every token containing it.
	///
	/// Wrapped tokens keep their wrapping: `var%%WC%%` becomes `var%name%`.
	///
	/// # Errors
	/// Returns `NamerError::MissingWildcard` if no token contains the
	/// wildcard.
	pub fn substitute(&self, name: &str) -> NamerResult<NGram> {
		if self.wildcard_position().is_none() {
			return Err(NamerError::MissingWildcard(self.to_string()));
		}
		let tokens = self
			.tokens
			.iter()
			.map(|t| if t.contains(WILDCARD_TOKEN) { t.replace(WILDCARD_TOKEN, name) } else { t.clone() })
			.collect();
		Ok(NGram { tokens })
	}

	/// Keeps only the last `n` tokens (n-grams used for probability queries
	/// never exceed the model order).
	pub fn suffix(&self, n: usize) -> NGram {
		let n = n.clamp(1, self.tokens.len());
		NGram { tokens: self.tokens[self.tokens.len() - n..].to_vec() }
	}
}

impl fmt::Display for NGram {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "[{}]", self.tokens.join(" "))
	}
}

#[cfg(test)]
impl From<&[&str]> for NGram {
	fn from(tokens: &[&str]) -> Self {
		assert!(!tokens.is_empty(), "an n-gram needs at least one token");
		Self { tokens: tokens.iter().map(|t| (*t).to_owned()).collect() }
	}
}

/// Extracts the name a token carries in place of the wildcard of `template`.
///
/// - `template == "%WC%"`: every token matches and is returned as-is
/// - `template == "var%%WC%%"`: `var%count%` yields `count`
///
/// Returns `None` when the token does not have the template's wrapping.
pub(crate) fn fill_of<'a>(template: &str, token: &'a str) -> Option<&'a str> {
	let (before, after) = template.split_once(WILDCARD_TOKEN)?;
	let inner = token.strip_prefix(before)?.strip_suffix(after)?;
	if inner.is_empty() {
		return None;
	}
	Some(inner)
}
