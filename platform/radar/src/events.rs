use tokio::sync::broadcast;
use ulid::Ulid;

/// Invalidation signals for cached listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadarEvent {
	/// The clones of a user were inserted, updated or deleted.
	ClonesChanged { user_id: Ulid },
	/// The recent scans leaderboard may have changed.
	RecentScansChanged,
	/// A user added or removed a channel.
	CollectionChanged { user_id: Ulid },
	/// Fan counts changed, so the popular channels listing may have too.
	PopularChannelsChanged,
}

impl RadarEvent {
	pub fn subject(&self) -> String {
		match self {
			Self::ClonesChanged { user_id } => format!("user.{user_id}.clones"),
			Self::RecentScansChanged => "clones.recent".to_string(),
			Self::CollectionChanged { user_id } => format!("user.{user_id}.channels"),
			Self::PopularChannelsChanged => "channels.popular".to_string(),
		}
	}
}

#[derive(Debug, Clone)]
pub struct EventBus {
	sender: broadcast::Sender<RadarEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity.max(1));
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<RadarEvent> {
		self.sender.subscribe()
	}

	pub fn publish(&self, event: RadarEvent) {
		tracing::trace!(subject = %event.subject(), "publishing event");

		// no subscribers is fine, nobody has anything cached
		let _ = self.sender.send(event);
	}
}
