use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use ulid::Ulid;

use crate::database::{Channel, CloneRecord, MyClone, NewChannel, PairKey, PopularChannel, RecentScan, User};

mod memory;
mod migration;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
	#[error("user not found: {0}")]
	UnknownUser(Ulid),
	#[error("channel not found: {0}")]
	UnknownChannel(Ulid),
	#[error("last scan of user {0} changed while scanning")]
	ScanConflict(Ulid),
	#[error("invalid clone patch for {key}: {reason}")]
	InvalidPatch { key: PairKey, reason: &'static str },
	#[error("database error: {0}")]
	Database(#[from] tokio_postgres::Error),
	#[error("database pool error: {0}")]
	Pool(#[from] deadpool_postgres::PoolError),
}

/// One per-pair decision of a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClonePatch {
	/// Insert the pair, or overwrite the count and shared set of the existing
	/// record, keeping its creation time.
	Upsert {
		key: PairKey,
		participants: (Ulid, Ulid),
		shared: BTreeSet<Ulid>,
	},
	/// Remove the pair if it exists.
	Delete { key: PairKey },
}

impl ClonePatch {
	pub fn key(&self) -> &PairKey {
		match self {
			Self::Upsert { key, .. } | Self::Delete { key } => key,
		}
	}

	/// Checks the invariants every store relies on.
	pub fn validate(&self) -> Result<(), StoreError> {
		let Self::Upsert { key, participants, shared } = self else {
			return Ok(());
		};

		let invalid = |reason| StoreError::InvalidPatch { key: key.clone(), reason };

		if participants.0 == participants.1 {
			return Err(invalid("a user cannot be their own clone"));
		}

		if *key != PairKey::new(participants.0, participants.1) {
			return Err(invalid("pair key does not match participants"));
		}

		if shared.is_empty() {
			return Err(invalid("a clone must share at least one channel"));
		}

		Ok(())
	}
}

/// Everything a scan writes, applied as a single unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCommit {
	pub user_id: Ulid,
	pub scanned_at: DateTime<Utc>,
	/// The `last_scan_at` of the user when the scan started. The commit is
	/// rejected with [`StoreError::ScanConflict`] if it changed since.
	pub expected_last_scan: Option<DateTime<Utc>>,
	pub patches: Vec<ClonePatch>,
}

impl ScanCommit {
	/// Validates every patch and checks that each one involves the scanning
	/// user.
	pub fn validate(&self) -> Result<(), StoreError> {
		for patch in &self.patches {
			patch.validate()?;

			if !patch.key().contains(self.user_id) {
				return Err(StoreError::InvalidPatch {
					key: patch.key().clone(),
					reason: "a scan may only touch clones of the scanning user",
				});
			}
		}

		Ok(())
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CommitReceipt {
	pub inserted: usize,
	pub updated: usize,
	pub deleted: usize,
}

impl CommitReceipt {
	pub fn mutations(&self) -> usize {
		self.inserted + self.updated + self.deleted
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectOutcome {
	Added,
	AlreadyCollected,
	CapReached,
}

/// Persistence of users, channel collections and clones.
///
/// Implementations must apply [`RadarStore::commit_scan`] atomically and keep
/// at most one clone per pair key.
#[async_trait::async_trait]
pub trait RadarStore: Send + Sync + 'static {
	async fn create_user(&self, display_name: &str, now: DateTime<Utc>) -> Result<User, StoreError>;

	async fn user(&self, user_id: Ulid) -> Result<Option<User>, StoreError>;

	/// Inserts a channel by external id or refreshes the metadata of the
	/// existing one.
	async fn upsert_channel(&self, channel: &NewChannel, now: DateTime<Utc>) -> Result<Channel, StoreError>;

	/// Adds a channel to a collection unless the user already holds `cap`
	/// channels.
	async fn collect_channel(&self, user_id: Ulid, channel_id: Ulid, cap: usize) -> Result<CollectOutcome, StoreError>;

	/// Returns false if the channel was not in the collection.
	async fn remove_channel(&self, user_id: Ulid, channel_id: Ulid) -> Result<bool, StoreError>;

	async fn list_channels(&self, user_id: Ulid) -> Result<BTreeSet<Ulid>, StoreError>;

	async fn list_fans(&self, channel_id: Ulid) -> Result<BTreeSet<Ulid>, StoreError>;

	/// Channel sets of many users at once. Users without channels map to an
	/// empty set.
	async fn channel_sets(&self, user_ids: &[Ulid]) -> Result<HashMap<Ulid, BTreeSet<Ulid>>, StoreError>;

	/// The user's channels ordered by subscriber count, largest first.
	async fn user_channels(&self, user_id: Ulid) -> Result<Vec<Channel>, StoreError>;

	/// The other participant of every clone the user belongs to.
	async fn clone_partners(&self, user_id: Ulid) -> Result<BTreeSet<Ulid>, StoreError>;

	async fn clone_record(&self, key: &PairKey) -> Result<Option<CloneRecord>, StoreError>;

	async fn commit_scan(&self, commit: &ScanCommit) -> Result<CommitReceipt, StoreError>;

	/// Clones of a user ordered by match count, strongest first.
	async fn clones_of(&self, user_id: Ulid, limit: usize) -> Result<Vec<MyClone>, StoreError>;

	/// Clones touched at or after `since`, ordered by match count.
	async fn recent_clones(&self, since: DateTime<Utc>, limit: usize) -> Result<Vec<RecentScan>, StoreError>;

	/// Channels ordered by fan count then subscriber count.
	async fn popular_channels(&self, limit: usize) -> Result<Vec<PopularChannel>, StoreError>;

	/// Channels ordered by creation time, newest first.
	async fn recent_channels(&self, limit: usize) -> Result<Vec<Channel>, StoreError>;
}
