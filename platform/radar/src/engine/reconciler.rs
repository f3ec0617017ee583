use ulid::Ulid;

use super::scorer::ScoredCandidate;
use crate::database::PairKey;
use crate::store::ClonePatch;

/// Turns the selected candidates of a scan into per-pair decisions: a
/// positive score upserts the pair, a zero score deletes it. Deleting a pair
/// that was never stored is a no-op, so a zero record is never created.
pub fn plan(user_id: Ulid, selected: &[ScoredCandidate]) -> Vec<ClonePatch> {
	selected
		.iter()
		.filter(|candidate| candidate.user_id != user_id)
		.map(|candidate| {
			let key = PairKey::new(user_id, candidate.user_id);

			if candidate.score.is_zero() {
				ClonePatch::Delete { key }
			} else {
				ClonePatch::Upsert {
					key,
					participants: PairKey::order(user_id, candidate.user_id),
					shared: candidate.score.shared.clone(),
				}
			}
		})
		.collect()
}
