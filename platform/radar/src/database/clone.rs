use std::fmt;

use chrono::{DateTime, Utc};
use ulid::Ulid;

use super::{ChannelSummary, UserSummary};

/// Order independent identifier of an unordered user pair.
///
/// The two ids are sorted and joined with [`PairKey::SEPARATOR`]. Ulids sort
/// the same way as their canonical string form, so the key is also the
/// lexical ordering of the two ids.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct PairKey(String);

impl PairKey {
	pub const SEPARATOR: char = ':';

	pub fn new(a: Ulid, b: Ulid) -> Self {
		let (low, high) = Self::order(a, b);
		Self(format!("{low}{}{high}", Self::SEPARATOR))
	}

	/// Sorts a pair into the order used by the key.
	pub fn order(a: Ulid, b: Ulid) -> (Ulid, Ulid) {
		if a <= b { (a, b) } else { (b, a) }
	}

	/// Parses a stored key back into its two participants.
	pub fn participants(&self) -> Option<(Ulid, Ulid)> {
		let (low, high) = self.0.split_once(Self::SEPARATOR)?;
		Some((Ulid::from_string(low).ok()?, Ulid::from_string(high).ok()?))
	}

	pub fn contains(&self, user_id: Ulid) -> bool {
		self.participants().is_some_and(|(a, b)| a == user_id || b == user_id)
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

}

/// Wraps a key read back from storage.
impl From<String> for PairKey {
	fn from(value: String) -> Self {
		Self(value)
	}
}

impl fmt::Display for PairKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// The persisted symmetric match between two users.
#[derive(Debug, Clone, PartialEq, Eq, postgres_from_row::FromRow)]
pub struct CloneRecord {
	#[from_row(from = "String")]
	pub pair_key: PairKey,
	/// The lower of the two participant ids
	pub user_a: Ulid,
	/// The higher of the two participant ids
	pub user_b: Ulid,
	/// Always equal to the length of `shared_channel_ids`, never zero
	pub match_count: i32,
	/// Channels collected by both participants, sorted
	pub shared_channel_ids: Vec<Ulid>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl CloneRecord {
	/// The participant that is not `user_id`.
	pub fn other(&self, user_id: Ulid) -> Ulid {
		if self.user_a == user_id { self.user_b } else { self.user_a }
	}

	pub fn involves(&self, user_id: Ulid) -> bool {
		self.user_a == user_id || self.user_b == user_id
	}
}

/// A clone as seen by one of its participants.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MyClone {
	pub pair_key: PairKey,
	pub other: UserSummary,
	pub match_count: i32,
	pub shared_channels: Vec<ChannelSummary>,
	pub updated_at: DateTime<Utc>,
}

/// A leaderboard entry of the recent scans listing.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RecentScan {
	pub pair_key: PairKey,
	/// Ordered by display name
	pub participants: Vec<UserSummary>,
	pub match_count: i32,
	pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
	use ulid::Ulid;

	use super::{CloneRecord, PairKey};

	#[test]
	fn test_pair_key_is_order_independent() {
		let a = Ulid::new();
		let b = Ulid::new();

		assert_eq!(PairKey::new(a, b), PairKey::new(b, a));
		assert_eq!(PairKey::new(a, b).participants(), Some(PairKey::order(a, b)));
	}

	#[test]
	fn test_pair_key_matches_lexical_order() {
		let a = Ulid::from_string("01HQ0000000000000000000000").unwrap();
		let b = Ulid::from_string("01HZ0000000000000000000000").unwrap();

		let mut strings = [b.to_string(), a.to_string()];
		strings.sort();

		assert_eq!(PairKey::new(b, a).as_str(), strings.join(":"));
	}

	#[test]
	fn test_pair_key_contains() {
		let a = Ulid::new();
		let b = Ulid::new();
		let key = PairKey::new(a, b);

		assert!(key.contains(a));
		assert!(key.contains(b));
		assert!(!key.contains(Ulid::new()));
	}

	#[test]
	fn test_pair_key_from_stored_column() {
		fn decodes_rows<T: postgres_from_row::FromRow>() {}
		decodes_rows::<CloneRecord>();

		let key = PairKey::new(Ulid::new(), Ulid::new());
		let stored = PairKey::from(key.as_str().to_owned());

		assert_eq!(stored, key);
		assert_eq!(stored.participants(), key.participants());
	}
}
