use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use ulid::Ulid;

use super::{ClonePatch, CollectOutcome, CommitReceipt, RadarStore, ScanCommit, StoreError};
use crate::database::{Channel, CloneRecord, MyClone, NewChannel, PairKey, PopularChannel, RecentScan, User, UserSummary};
use crate::listing;

#[derive(Debug, Default)]
struct State {
	users: HashMap<Ulid, User>,
	channels: HashMap<Ulid, Channel>,
	channel_by_external_id: HashMap<String, Ulid>,
	/// user -> collected channels
	collections: HashMap<Ulid, BTreeSet<Ulid>>,
	/// channel -> users who collected it, kept in step with `collections`
	fans: HashMap<Ulid, BTreeSet<Ulid>>,
	clones: BTreeMap<PairKey, CloneRecord>,
}

impl State {
	fn user_summary(&self, user_id: Ulid) -> Option<UserSummary> {
		self.users.get(&user_id).map(User::summary)
	}

	/// Checks a whole commit without touching anything, so applying it
	/// afterwards cannot fail half way.
	fn validate(&self, commit: &ScanCommit) -> Result<(), StoreError> {
		let user = self
			.users
			.get(&commit.user_id)
			.ok_or(StoreError::UnknownUser(commit.user_id))?;

		if user.last_scan_at != commit.expected_last_scan {
			return Err(StoreError::ScanConflict(commit.user_id));
		}

		commit.validate()?;

		for patch in &commit.patches {
			if let ClonePatch::Upsert { participants, shared, .. } = patch {
				for user_id in [participants.0, participants.1] {
					if !self.users.contains_key(&user_id) {
						return Err(StoreError::UnknownUser(user_id));
					}
				}

				if let Some(channel_id) = shared.iter().find(|id| !self.channels.contains_key(*id)) {
					return Err(StoreError::UnknownChannel(*channel_id));
				}
			}
		}

		Ok(())
	}

	fn apply(&mut self, commit: &ScanCommit) -> CommitReceipt {
		let mut receipt = CommitReceipt::default();

		for patch in &commit.patches {
			match patch {
				ClonePatch::Upsert {
					key,
					participants,
					shared,
				} => match self.clones.get_mut(key) {
					Some(record) => {
						record.match_count = shared.len() as i32;
						record.shared_channel_ids = shared.iter().copied().collect();
						record.updated_at = commit.scanned_at;
						receipt.updated += 1;
					}
					None => {
						self.clones.insert(
							key.clone(),
							CloneRecord {
								pair_key: key.clone(),
								user_a: participants.0,
								user_b: participants.1,
								match_count: shared.len() as i32,
								shared_channel_ids: shared.iter().copied().collect(),
								created_at: commit.scanned_at,
								updated_at: commit.scanned_at,
							},
						);
						receipt.inserted += 1;
					}
				},
				ClonePatch::Delete { key } => {
					if self.clones.remove(key).is_some() {
						receipt.deleted += 1;
					}
				}
			}
		}

		if let Some(user) = self.users.get_mut(&commit.user_id) {
			user.last_scan_at = Some(commit.scanned_at);
		}

		receipt
	}
}

/// A [`RadarStore`] kept in process memory. Every operation holds one lock,
/// which makes commits atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
	state: RwLock<State>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait::async_trait]
impl RadarStore for MemoryStore {
	async fn create_user(&self, display_name: &str, now: DateTime<Utc>) -> Result<User, StoreError> {
		let user = User {
			id: Ulid::new(),
			display_name: display_name.to_string(),
			last_scan_at: None,
			created_at: now,
		};

		self.state.write().await.users.insert(user.id, user.clone());

		Ok(user)
	}

	async fn user(&self, user_id: Ulid) -> Result<Option<User>, StoreError> {
		Ok(self.state.read().await.users.get(&user_id).cloned())
	}

	async fn upsert_channel(&self, channel: &NewChannel, now: DateTime<Utc>) -> Result<Channel, StoreError> {
		let mut state = self.state.write().await;

		if let Some(id) = state.channel_by_external_id.get(&channel.external_id).copied() {
			let existing = state.channels.get_mut(&id).ok_or(StoreError::UnknownChannel(id))?;
			existing.name.clone_from(&channel.name);
			existing.description.clone_from(&channel.description);
			existing.thumbnail_url.clone_from(&channel.thumbnail_url);
			existing.subscriber_count = channel.subscriber_count;
			existing.video_count = channel.video_count;
			existing.updated_at = now;
			return Ok(existing.clone());
		}

		let created = Channel {
			id: Ulid::new(),
			external_id: channel.external_id.clone(),
			name: channel.name.clone(),
			description: channel.description.clone(),
			thumbnail_url: channel.thumbnail_url.clone(),
			subscriber_count: channel.subscriber_count,
			video_count: channel.video_count,
			created_at: now,
			updated_at: now,
		};

		state.channel_by_external_id.insert(created.external_id.clone(), created.id);
		state.channels.insert(created.id, created.clone());

		Ok(created)
	}

	async fn collect_channel(&self, user_id: Ulid, channel_id: Ulid, cap: usize) -> Result<CollectOutcome, StoreError> {
		let mut state = self.state.write().await;

		if !state.users.contains_key(&user_id) {
			return Err(StoreError::UnknownUser(user_id));
		}

		if !state.channels.contains_key(&channel_id) {
			return Err(StoreError::UnknownChannel(channel_id));
		}

		let collection = state.collections.entry(user_id).or_default();
		if collection.contains(&channel_id) {
			return Ok(CollectOutcome::AlreadyCollected);
		}

		if collection.len() >= cap {
			return Ok(CollectOutcome::CapReached);
		}

		collection.insert(channel_id);
		state.fans.entry(channel_id).or_default().insert(user_id);

		Ok(CollectOutcome::Added)
	}

	async fn remove_channel(&self, user_id: Ulid, channel_id: Ulid) -> Result<bool, StoreError> {
		let mut state = self.state.write().await;

		let removed = state
			.collections
			.get_mut(&user_id)
			.is_some_and(|collection| collection.remove(&channel_id));

		if removed {
			if let Some(fans) = state.fans.get_mut(&channel_id) {
				fans.remove(&user_id);
			}
		}

		Ok(removed)
	}

	async fn list_channels(&self, user_id: Ulid) -> Result<BTreeSet<Ulid>, StoreError> {
		Ok(self.state.read().await.collections.get(&user_id).cloned().unwrap_or_default())
	}

	async fn list_fans(&self, channel_id: Ulid) -> Result<BTreeSet<Ulid>, StoreError> {
		Ok(self.state.read().await.fans.get(&channel_id).cloned().unwrap_or_default())
	}

	async fn channel_sets(&self, user_ids: &[Ulid]) -> Result<HashMap<Ulid, BTreeSet<Ulid>>, StoreError> {
		let state = self.state.read().await;

		Ok(user_ids
			.iter()
			.map(|id| (*id, state.collections.get(id).cloned().unwrap_or_default()))
			.collect())
	}

	async fn user_channels(&self, user_id: Ulid) -> Result<Vec<Channel>, StoreError> {
		let state = self.state.read().await;

		let mut channels: Vec<Channel> = state
			.collections
			.get(&user_id)
			.into_iter()
			.flatten()
			.filter_map(|id| state.channels.get(id).cloned())
			.collect();

		channels.sort_by(|a, b| b.subscriber_count.cmp(&a.subscriber_count).then_with(|| a.id.cmp(&b.id)));

		Ok(channels)
	}

	async fn clone_partners(&self, user_id: Ulid) -> Result<BTreeSet<Ulid>, StoreError> {
		Ok(self
			.state
			.read()
			.await
			.clones
			.values()
			.filter(|record| record.involves(user_id))
			.map(|record| record.other(user_id))
			.collect())
	}

	async fn clone_record(&self, key: &PairKey) -> Result<Option<CloneRecord>, StoreError> {
		Ok(self.state.read().await.clones.get(key).cloned())
	}

	async fn commit_scan(&self, commit: &ScanCommit) -> Result<CommitReceipt, StoreError> {
		let mut state = self.state.write().await;

		state.validate(commit)?;

		Ok(state.apply(commit))
	}

	async fn clones_of(&self, user_id: Ulid, limit: usize) -> Result<Vec<MyClone>, StoreError> {
		let state = self.state.read().await;

		let mut clones: Vec<MyClone> = state
			.clones
			.values()
			.filter(|record| record.involves(user_id))
			.filter_map(|record| {
				let mut shared_channels: Vec<_> = record
					.shared_channel_ids
					.iter()
					.filter_map(|id| state.channels.get(id).map(Channel::summary))
					.collect();
				shared_channels.sort_by(|a, b| a.name.cmp(&b.name));

				Some(MyClone {
					pair_key: record.pair_key.clone(),
					other: state.user_summary(record.other(user_id))?,
					match_count: record.match_count,
					shared_channels,
					updated_at: record.updated_at,
				})
			})
			.collect();

		listing::rank_my_clones(&mut clones, limit);

		Ok(clones)
	}

	async fn recent_clones(&self, since: DateTime<Utc>, limit: usize) -> Result<Vec<RecentScan>, StoreError> {
		let state = self.state.read().await;

		let mut scans: Vec<RecentScan> = state
			.clones
			.values()
			.filter(|record| record.updated_at >= since)
			.filter_map(|record| {
				let mut participants = vec![state.user_summary(record.user_a)?, state.user_summary(record.user_b)?];
				participants.sort_by(|a, b| a.display_name.cmp(&b.display_name));

				Some(RecentScan {
					pair_key: record.pair_key.clone(),
					participants,
					match_count: record.match_count,
					updated_at: record.updated_at,
				})
			})
			.collect();

		listing::rank_recent_scans(&mut scans, limit);

		Ok(scans)
	}

	async fn popular_channels(&self, limit: usize) -> Result<Vec<PopularChannel>, StoreError> {
		let state = self.state.read().await;

		let mut channels: Vec<PopularChannel> = state
			.channels
			.values()
			.map(|channel| PopularChannel {
				channel: channel.clone(),
				fan_count: state.fans.get(&channel.id).map_or(0, |fans| fans.len() as i64),
			})
			.collect();

		listing::rank_popular_channels(&mut channels, limit);

		Ok(channels)
	}

	async fn recent_channels(&self, limit: usize) -> Result<Vec<Channel>, StoreError> {
		let mut channels: Vec<Channel> = self.state.read().await.channels.values().cloned().collect();

		listing::rank_recent_channels(&mut channels, limit);

		Ok(channels)
	}
}
