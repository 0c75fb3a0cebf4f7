//! Scopes: bounded snippets of code in which an identifier is ranked.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{NamerError, NamerResult};
use crate::token::Tokenizer;

/// Kind of identifier a scope was extracted for.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScopeKind {
	Variable,
	Method,
	Type,
}

impl FromStr for ScopeKind {
	type Err = NamerError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"variable" | "var" => Ok(ScopeKind::Variable),
			"method" => Ok(ScopeKind::Method),
			"type" | "typename" => Ok(ScopeKind::Type),
			other => Err(NamerError::config(format!("unknown scope kind '{other}'"))),
		}
	}
}

impl fmt::Display for ScopeKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			ScopeKind::Variable => "variable",
			ScopeKind::Method => "method",
			ScopeKind::Type => "type",
		};
		f.write_str(name)
	}
}

/// Fixed-shape descriptor of a bounded snippet of code.
///
/// Supplied by a scope extractor and treated as read-only input.
/// `category` is the syntactic role of the snippet and `parent_category` the
/// role of its enclosing construct (for a Java AST these would be node type
/// names, but no language-specific meaning is assumed here).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Scope {
	pub snippet: String,
	pub category: String,
	pub parent_category: String,
	pub kind: ScopeKind,
	/// Inferred type of the identifier, if the extractor knows it.
	pub inferred_type: Option<String>,
}

impl Scope {
	pub fn new(snippet: impl Into<String>, kind: ScopeKind) -> Self {
		Self {
			snippet: snippet.into(),
			category: String::new(),
			parent_category: String::new(),
			kind,
			inferred_type: None,
		}
	}

	pub fn with_categories(mut self, category: impl Into<String>, parent_category: impl Into<String>) -> Self {
		self.category = category.into();
		self.parent_category = parent_category.into();
		self
	}

	pub fn with_type(mut self, inferred_type: impl Into<String>) -> Self {
		self.inferred_type = Some(inferred_type.into());
		self
	}

	/// Returns a copy of this scope with another snippet.
	pub fn with_snippet(&self, snippet: impl Into<String>) -> Self {
		Self { snippet: snippet.into(), ..self.clone() }
	}

	/// Two scopes share a syntactic context when their categories and kind
	/// are equal. The snippet text is ignored.
	pub fn same_context(&self, other: &Scope) -> bool {
		self.kind == other.kind
			&& self.category == other.category
			&& self.parent_category == other.parent_category
	}
}

/// Extracts identifier occurrences, grouped by scope, from a code unit.
pub trait ScopeExtractor: Send + Sync {
	/// Returns every `(scope, identifier name)` pair of the unit.
	///
	/// # Errors
	/// Returns `NamerError::ScopeExtraction` (or `Tokenize`) when the unit
	/// cannot be analysed.
	fn extract(&self, unit: &str) -> NamerResult<Vec<(Scope, String)>>;
}

/// Minimal extractor treating a whole unit as a single variable scope.
///
/// Every distinct identifier token of the unit is one occurrence. Names are
/// returned sorted.
pub struct FlatScopeExtractor<T: Tokenizer> {
	tokenizer: T,
	kind: ScopeKind,
}

impl<T: Tokenizer> FlatScopeExtractor<T> {
	pub fn new(tokenizer: T, kind: ScopeKind) -> Self {
		Self { tokenizer, kind }
	}
}

impl<T: Tokenizer> ScopeExtractor for FlatScopeExtractor<T> {
	fn extract(&self, unit: &str) -> NamerResult<Vec<(Scope, String)>> {
		let tokens = self.tokenizer.tokenize(unit)?;
		let names: BTreeSet<String> = tokens
			.iter()
			.filter(|t| self.tokenizer.is_identifier(t))
			.map(|t| t.text.clone())
			.collect();

		let scope = Scope::new(unit, self.kind).with_categories("unit", "");
		Ok(names.into_iter().map(|name| (scope.clone(), name)).collect())
	}
}
