use std::cmp::Reverse;

use super::scorer::ScoredCandidate;

/// How many scored candidates one scan reconciles.
pub const DEFAULT_TOP_K: usize = 5;

/// Which end of the ranking a scan reconciles first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionOrder {
	/// Highest match count first.
	#[default]
	StrongestFirst,
	/// Lowest match count first.
	WeakestFirst,
}

pub const DEFAULT_SELECTION_ORDER: SelectionOrder = SelectionOrder::StrongestFirst;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionPolicy {
	pub order: SelectionOrder,
	pub top_k: usize,
	/// Also reconcile existing clones whose overlap dropped to zero when they
	/// fall outside the top k, so they get deleted.
	pub retire_decayed: bool,
}

impl Default for SelectionPolicy {
	fn default() -> Self {
		Self {
			order: DEFAULT_SELECTION_ORDER,
			top_k: DEFAULT_TOP_K,
			retire_decayed: true,
		}
	}
}

impl SelectionPolicy {
	/// Ranks the scored pool and returns the candidates to reconcile. Ties are
	/// broken by user id so a scan is deterministic.
	pub fn select(&self, mut scored: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
		match self.order {
			SelectionOrder::StrongestFirst => scored.sort_by_key(|c| (Reverse(c.score.count()), c.user_id)),
			SelectionOrder::WeakestFirst => scored.sort_by_key(|c| (c.score.count(), c.user_id)),
		}

		let rest = scored.split_off(self.top_k.min(scored.len()));

		if self.retire_decayed {
			scored.extend(rest.into_iter().filter(|c| c.previously_matched && c.score.is_zero()));
		}

		scored
	}
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeSet;

	use ulid::Ulid;

	use super::{SelectionOrder, SelectionPolicy};
	use crate::engine::scorer::{Score, ScoredCandidate};

	fn candidate(count: usize, previously_matched: bool) -> ScoredCandidate {
		ScoredCandidate {
			user_id: Ulid::new(),
			score: Score {
				shared: (0..count).map(|_| Ulid::new()).collect::<BTreeSet<_>>(),
			},
			previously_matched,
		}
	}

	fn counts(selected: &[ScoredCandidate]) -> Vec<usize> {
		selected.iter().map(|c| c.score.count()).collect()
	}

	#[test]
	fn test_strongest_first() {
		let policy = SelectionPolicy {
			top_k: 2,
			..Default::default()
		};

		let selected = policy.select(vec![candidate(1, false), candidate(3, false), candidate(2, false)]);
		assert_eq!(counts(&selected), vec![3, 2]);
	}

	#[test]
	fn test_weakest_first() {
		let policy = SelectionPolicy {
			order: SelectionOrder::WeakestFirst,
			top_k: 2,
			retire_decayed: false,
		};

		let selected = policy.select(vec![candidate(1, false), candidate(3, false), candidate(2, false)]);
		assert_eq!(counts(&selected), vec![1, 2]);
	}

	#[test]
	fn test_retires_decayed_outside_top_k() {
		let policy = SelectionPolicy {
			top_k: 1,
			..Default::default()
		};

		let decayed = candidate(0, true);
		let stranger = candidate(0, false);
		let selected = policy.select(vec![candidate(2, false), candidate(1, true), decayed.clone(), stranger]);

		assert_eq!(counts(&selected), vec![2, 0]);
		assert_eq!(selected[1].user_id, decayed.user_id);
	}

	#[test]
	fn test_keeps_decayed_when_disabled() {
		let policy = SelectionPolicy {
			top_k: 1,
			retire_decayed: false,
			..Default::default()
		};

		let selected = policy.select(vec![candidate(2, false), candidate(0, true)]);
		assert_eq!(counts(&selected), vec![2]);
	}

	#[test]
	fn test_top_k_larger_than_pool() {
		let selected = SelectionPolicy::default().select(vec![candidate(1, false)]);
		assert_eq!(selected.len(), 1);
		assert!(SelectionPolicy::default().select(vec![]).is_empty());
	}
}
