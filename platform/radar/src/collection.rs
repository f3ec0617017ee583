use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ulid::Ulid;

use crate::database::{Channel, NewChannel, User};
use crate::events::{EventBus, RadarEvent};
use crate::store::{CollectOutcome, RadarStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum CollectionError {
	#[error("{0}")]
	InvalidInput(&'static str),
	#[error("You can only add {cap} channels. Please remove one to add more.")]
	CapReached { cap: usize },
	#[error("user not found: {0}")]
	UnknownUser(Ulid),
	#[error("channel {channel_id} is not in the collection of {user_id}")]
	NotCollected { user_id: Ulid, channel_id: Ulid },
	#[error(transparent)]
	Store(#[from] StoreError),
}

/// Users and the channels they collect. Keeps the per user cap and the fans
/// index the candidate pool reads from.
#[derive(Clone)]
pub struct Collection {
	store: Arc<dyn RadarStore>,
	events: EventBus,
	cap: usize,
}

impl Collection {
	pub fn new(store: Arc<dyn RadarStore>, events: EventBus, cap: usize) -> Self {
		Self { store, events, cap }
	}

	pub fn cap(&self) -> usize {
		self.cap
	}

	pub async fn create_user(&self, display_name: &str, now: DateTime<Utc>) -> Result<User, CollectionError> {
		User::validate_display_name(display_name).map_err(CollectionError::InvalidInput)?;

		let user = self.store.create_user(display_name.trim(), now).await?;

		tracing::info!(user_id = %user.id, "created user");

		Ok(user)
	}

	/// Stores the channel metadata and adds the channel to the user's
	/// collection. Collecting a channel twice is not an error.
	#[tracing::instrument(skip_all, fields(user_id = %user_id, external_id = %channel.external_id))]
	pub async fn collect(&self, user_id: Ulid, channel: &NewChannel, now: DateTime<Utc>) -> Result<Channel, CollectionError> {
		channel.validate().map_err(CollectionError::InvalidInput)?;

		if self.store.user(user_id).await?.is_none() {
			return Err(CollectionError::UnknownUser(user_id));
		}

		// reject early so a full collection does not leave fanless channels
		// behind, the store checks the cap again when adding
		let collected = self.store.user_channels(user_id).await?;
		if collected.len() >= self.cap && !collected.iter().any(|c| c.external_id == channel.external_id) {
			return Err(CollectionError::CapReached { cap: self.cap });
		}

		let channel = self.store.upsert_channel(channel, now).await?;

		match self.store.collect_channel(user_id, channel.id, self.cap).await? {
			CollectOutcome::Added => {
				tracing::debug!(channel_id = %channel.id, "channel collected");
				self.changed(user_id);
			}
			CollectOutcome::AlreadyCollected => {}
			CollectOutcome::CapReached => return Err(CollectionError::CapReached { cap: self.cap }),
		}

		Ok(channel)
	}

	pub async fn remove(&self, user_id: Ulid, channel_id: Ulid) -> Result<(), CollectionError> {
		if !self.store.remove_channel(user_id, channel_id).await? {
			return Err(CollectionError::NotCollected { user_id, channel_id });
		}

		tracing::debug!(user_id = %user_id, channel_id = %channel_id, "channel removed");
		self.changed(user_id);

		Ok(())
	}

	pub async fn list_channels(&self, user_id: Ulid) -> Result<BTreeSet<Ulid>, CollectionError> {
		Ok(self.store.list_channels(user_id).await?)
	}

	pub async fn list_fans(&self, channel_id: Ulid) -> Result<BTreeSet<Ulid>, CollectionError> {
		Ok(self.store.list_fans(channel_id).await?)
	}

	fn changed(&self, user_id: Ulid) {
		self.events.publish(RadarEvent::CollectionChanged { user_id });
		self.events.publish(RadarEvent::PopularChannelsChanged);
	}
}
