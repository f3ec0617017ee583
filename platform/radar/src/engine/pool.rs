use std::collections::BTreeSet;

use ulid::Ulid;

use crate::store::{RadarStore, StoreError};

/// The users worth scoring in one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidatePool {
	candidates: BTreeSet<Ulid>,
	/// Partners of clones that already exist, a subset of `candidates`.
	partners: BTreeSet<Ulid>,
}

impl CandidatePool {
	/// Unions the fans of the user's channels with the partners of the user's
	/// existing clones, without the user itself. Partners are included so a
	/// clone whose overlap dropped to zero can be retired.
	pub fn build(user_id: Ulid, fans: impl IntoIterator<Item = Ulid>, partners: impl IntoIterator<Item = Ulid>) -> Self {
		let partners: BTreeSet<Ulid> = partners.into_iter().filter(|id| *id != user_id).collect();

		let candidates = fans
			.into_iter()
			.filter(|id| *id != user_id)
			.chain(partners.iter().copied())
			.collect();

		Self { candidates, partners }
	}

	/// Reads the fans of every channel in `channels` and the user's clone
	/// partners from the store.
	pub async fn gather(store: &dyn RadarStore, user_id: Ulid, channels: &BTreeSet<Ulid>) -> Result<Self, StoreError> {
		let mut fans = BTreeSet::new();
		for channel_id in channels {
			fans.extend(store.list_fans(*channel_id).await?);
		}

		let partners = store.clone_partners(user_id).await?;

		Ok(Self::build(user_id, fans, partners))
	}

	pub fn is_partner(&self, user_id: &Ulid) -> bool {
		self.partners.contains(user_id)
	}

	pub fn len(&self) -> usize {
		self.candidates.len()
	}

	pub fn is_empty(&self) -> bool {
		self.candidates.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &Ulid> {
		self.candidates.iter()
	}

	pub fn to_vec(&self) -> Vec<Ulid> {
		self.candidates.iter().copied().collect()
	}
}
