use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::ngram::UNK_SYMBOL;

/// Numeric id of a vocabulary token.
pub type TokenId = u32;

/// Id reserved for `UNK_SYMBOL`.
pub const UNK_ID: TokenId = 0;

/// Set of tokens known to a language model.
///
/// # Invariants
/// - `UNK_SYMBOL` always has id `UNK_ID`
/// - Ids are dense: `tokens[id]` is the token of `id`
/// - Immutable once built
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Vocabulary {
	ids: HashMap<String, TokenId>,
	tokens: Vec<String>,
}

impl Vocabulary {
	/// Vocabulary containing only UNK.
	pub fn unk_only() -> Self {
		Self {
			ids: HashMap::from([(UNK_SYMBOL.to_owned(), UNK_ID)]),
			tokens: vec![UNK_SYMBOL.to_owned()],
		}
	}

	/// Builds a vocabulary from token counts.
	///
	/// Tokens seen more than `cutoff` times are kept. Ids are assigned in
	/// lexicographic token order, so the same counts always give the same
	/// vocabulary whatever order they were accumulated in.
	pub fn build(counts: &HashMap<String, u64>, cutoff: u64) -> Self {
		let mut kept: Vec<&String> = counts
			.iter()
			.filter(|(token, count)| **count > cutoff && token.as_str() != UNK_SYMBOL)
			.map(|(token, _)| token)
			.collect();
		kept.sort();

		let mut vocabulary = Self::unk_only();
		for token in kept {
			let id = vocabulary.tokens.len() as TokenId;
			vocabulary.ids.insert(token.clone(), id);
			vocabulary.tokens.push(token.clone());
		}
		vocabulary
	}

	/// Id of a token, `UNK_ID` if the token is unknown.
	pub fn id_of(&self, token: &str) -> TokenId {
		self.ids.get(token).copied().unwrap_or(UNK_ID)
	}

	/// Token of an id.
	pub fn token(&self, id: TokenId) -> Option<&str> {
		self.tokens.get(id as usize).map(String::as_str)
	}

	/// Returns `true` if the token collapses to UNK.
	pub fn is_unknown(&self, token: &str) -> bool {
		self.id_of(token) == UNK_ID
	}

	/// Number of symbols, UNK included.
	pub fn len(&self) -> usize {
		self.tokens.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tokens.is_empty()
	}
}
