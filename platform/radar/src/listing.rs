use std::cmp::Reverse;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use ulid::Ulid;

use crate::config::RadarConfig;
use crate::database::{Channel, MyClone, PopularChannel, Profile, RecentScan};
use crate::store::{RadarStore, StoreError};

/// Read-only projections over clones and channels. Nothing here scans or
/// reconciles.
#[derive(Clone)]
pub struct Listings {
	store: Arc<dyn RadarStore>,
	recent_window: Duration,
	leaderboard_limit: usize,
	my_clones_limit: usize,
}

impl Listings {
	pub fn new(store: Arc<dyn RadarStore>, config: &RadarConfig) -> Self {
		Self {
			store,
			recent_window: Duration::days(i64::from(config.recent_window_days)),
			leaderboard_limit: config.leaderboard_limit,
			my_clones_limit: config.my_clones_limit,
		}
	}

	/// The user with their channels, `None` for an unknown user.
	pub async fn profile(&self, user_id: Ulid) -> Result<Option<Profile>, StoreError> {
		let Some(user) = self.store.user(user_id).await? else {
			return Ok(None);
		};

		let channels = self.store.user_channels(user_id).await?;

		Ok(Some(Profile { user, channels }))
	}

	pub async fn my_clones(&self, user_id: Ulid) -> Result<Vec<MyClone>, StoreError> {
		self.store.clones_of(user_id, self.my_clones_limit).await
	}

	pub async fn recent_scans(&self, now: DateTime<Utc>) -> Result<Vec<RecentScan>, StoreError> {
		// windows reaching past the epoch cover every clone
		let since = now
			.checked_sub_signed(self.recent_window)
			.filter(|since| *since > DateTime::<Utc>::UNIX_EPOCH)
			.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

		self.store.recent_clones(since, self.leaderboard_limit).await
	}

	pub async fn popular_channels(&self) -> Result<Vec<PopularChannel>, StoreError> {
		self.store.popular_channels(self.leaderboard_limit).await
	}

	pub async fn recent_channels(&self) -> Result<Vec<Channel>, StoreError> {
		self.store.recent_channels(self.leaderboard_limit).await
	}
}

pub(crate) fn rank_my_clones(clones: &mut Vec<MyClone>, limit: usize) {
	clones.sort_by(|a, b| {
		b.match_count
			.cmp(&a.match_count)
			.then_with(|| b.updated_at.cmp(&a.updated_at))
			.then_with(|| a.pair_key.cmp(&b.pair_key))
	});
	clones.truncate(limit);
}

pub(crate) fn rank_recent_scans(scans: &mut Vec<RecentScan>, limit: usize) {
	scans.sort_by(|a, b| {
		b.match_count
			.cmp(&a.match_count)
			.then_with(|| b.updated_at.cmp(&a.updated_at))
			.then_with(|| a.pair_key.cmp(&b.pair_key))
	});
	scans.truncate(limit);
}

pub(crate) fn rank_popular_channels(channels: &mut Vec<PopularChannel>, limit: usize) {
	channels.sort_by_key(|c| (Reverse(c.fan_count), Reverse(c.channel.subscriber_count), c.channel.id));
	channels.truncate(limit);
}

pub(crate) fn rank_recent_channels(channels: &mut Vec<Channel>, limit: usize) {
	channels.sort_by_key(|c| (Reverse(c.created_at), c.id));
	channels.truncate(limit);
}
