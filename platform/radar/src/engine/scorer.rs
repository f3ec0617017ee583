use std::collections::BTreeSet;

use ulid::Ulid;

/// The overlap between two channel sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Score {
	pub shared: BTreeSet<Ulid>,
}

impl Score {
	pub fn count(&self) -> usize {
		self.shared.len()
	}

	pub fn is_zero(&self) -> bool {
		self.shared.is_empty()
	}
}

/// Intersects two channel sets by channel identity.
pub fn score(mine: &BTreeSet<Ulid>, theirs: &BTreeSet<Ulid>) -> Score {
	Score {
		shared: mine.intersection(theirs).copied().collect(),
	}
}

/// A member of the candidate pool after scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredCandidate {
	pub user_id: Ulid,
	pub score: Score,
	/// The scanning user already has a clone with this candidate.
	pub previously_matched: bool,
}
