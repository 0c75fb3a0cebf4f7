use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::vocabulary::TokenId;

/// A node of the count trie.
///
/// Conceptually a prefix of token ids: `count` is the number of training
/// windows starting with that prefix and `children` are the observed
/// continuations.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
struct TrieNode {
	count: u64,
	children: HashMap<TokenId, TrieNode>,
}

impl TrieNode {
	/// Sums `other` into this node, recursively.
	fn merge(&mut self, other: &Self) {
		self.count += other.count;
		for (id, child) in &other.children {
			self.children.entry(*id).or_default().merge(child);
		}
	}

	/// Removes every child whose count is `<= threshold` (with its whole
	/// subtree, whose counts can only be smaller).
	fn prune(&mut self, threshold: u64) -> usize {
		let before = self.children.len();
		self.children.retain(|_, child| child.count > threshold);
		let mut removed = before - self.children.len();
		for child in self.children.values_mut() {
			removed += child.prune(threshold);
		}
		removed
	}

	fn size(&self) -> usize {
		self.children.values().map(|c| 1 + c.size()).sum()
	}
}

/// Count store mapping n-gram prefixes (length 1..N) to occurrence counts.
///
/// # Responsibilities
/// - Accumulate window counts during training
/// - Answer count lookups for any prefix
/// - List the continuations of a prefix (candidate discovery)
/// - Merge with another trie (parallel training)
/// - Prune rare n-grams
///
/// # Invariants
/// - The root count is the number of inserted windows (= training tokens)
/// - A node's count is >= the count of each of its children
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct CountTrie {
	root: TrieNode,
}

impl CountTrie {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records one occurrence of `window`, incrementing every prefix of it.
	///
	/// Inserting the window starting at each position of a unit gives exact
	/// counts for all n-grams up to the window length.
	pub fn add(&mut self, window: &[TokenId]) {
		let mut node = &mut self.root;
		node.count += 1;
		for id in window {
			node = node.children.entry(*id).or_default();
			node.count += 1;
		}
	}

	/// Count of an n-gram; the empty n-gram counts every window.
	pub fn count(&self, ngram: &[TokenId]) -> u64 {
		self.node(ngram).map_or(0, |node| node.count)
	}

	/// Total number of windows (training tokens).
	pub fn total(&self) -> u64 {
		self.root.count
	}

	/// Every continuation of `prefix` with its count.
	pub fn continuations(&self, prefix: &[TokenId]) -> impl Iterator<Item = (TokenId, u64)> + '_ {
		self.node(prefix)
			.into_iter()
			.flat_map(|node| node.children.iter().map(|(id, child)| (*id, child.count)))
	}

	/// Merges another trie into this one by elementwise count addition.
	///
	/// Merging is commutative and associative, so partial tries built by
	/// parallel workers can be folded in any order.
	pub fn merge(&mut self, other: &Self) {
		self.root.merge(&other.root);
	}

	/// Prunes n-grams of length >= 2 whose count is `<= threshold`.
	///
	/// Unigram counts are kept so that every vocabulary token keeps its
	/// frequency. Returns the number of removed nodes.
	pub fn cutoff_rare(&mut self, threshold: u64) -> usize {
		if threshold == 0 {
			return 0;
		}
		self.root.children.values_mut().map(|unigram| unigram.prune(threshold)).sum()
	}

	/// Number of stored n-grams (all lengths).
	pub fn len(&self) -> usize {
		self.root.size()
	}

	pub fn is_empty(&self) -> bool {
		self.root.children.is_empty()
	}

	fn node(&self, ngram: &[TokenId]) -> Option<&TrieNode> {
		let mut node = &self.root;
		for id in ngram {
			node = node.children.get(id)?;
		}
		Some(node)
	}
}
