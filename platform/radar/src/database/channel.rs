use chrono::{DateTime, Utc};
use ulid::Ulid;

#[derive(Debug, Clone, PartialEq, Eq, postgres_from_row::FromRow, serde::Serialize)]
pub struct Channel {
	/// Ulid of the channel
	pub id: Ulid,
	/// The id of the channel on the video platform, unique across channels
	pub external_id: String,
	/// The channel's title
	pub name: String,
	/// The channel's description
	pub description: String,
	/// The channel's thumbnail
	pub thumbnail_url: Option<String>,
	/// Subscriber count as last reported by the video platform
	pub subscriber_count: i64,
	/// Video count as last reported by the video platform
	pub video_count: i64,
	/// The time the channel was first collected by anyone
	pub created_at: DateTime<Utc>,
	/// The time the channel metadata was last refreshed
	pub updated_at: DateTime<Utc>,
}

impl Channel {
	pub fn summary(&self) -> ChannelSummary {
		ChannelSummary {
			id: self.id,
			external_id: self.external_id.clone(),
			name: self.name.clone(),
		}
	}
}

/// Channel metadata as verified against the video platform, before it is
/// stored.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct NewChannel {
	pub external_id: String,
	pub name: String,
	#[serde(default)]
	pub description: String,
	#[serde(default)]
	pub thumbnail_url: Option<String>,
	#[serde(default)]
	pub subscriber_count: i64,
	#[serde(default)]
	pub video_count: i64,
}

impl NewChannel {
	pub const MAX_EXTERNAL_ID_LEN: usize = 64;

	/// Validates the channel before it is upserted.
	pub fn validate(&self) -> Result<(), &'static str> {
		if self.external_id.is_empty() {
			return Err("Channel id must not be empty");
		}

		if self.external_id.len() > Self::MAX_EXTERNAL_ID_LEN {
			return Err("Channel id must be at most 64 characters long");
		}

		if !self
			.external_id
			.chars()
			.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '@'))
		{
			return Err("Channel id must only contain alphanumeric characters, '_', '-' and '@'");
		}

		if self.name.trim().is_empty() {
			return Err("Channel name must not be empty");
		}

		if self.subscriber_count < 0 || self.video_count < 0 {
			return Err("Channel counts must not be negative");
		}

		Ok(())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, postgres_from_row::FromRow, serde::Serialize)]
pub struct ChannelSummary {
	pub id: Ulid,
	pub external_id: String,
	pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PopularChannel {
	pub channel: Channel,
	/// How many users collected the channel
	pub fan_count: i64,
}

#[cfg(test)]
mod tests {
	use super::NewChannel;

	fn channel(external_id: &str) -> NewChannel {
		NewChannel {
			external_id: external_id.to_string(),
			name: "t3dotgg".to_string(),
			description: String::new(),
			thumbnail_url: None,
			subscriber_count: 10,
			video_count: 1,
		}
	}

	#[test]
	fn test_validate() {
		assert!(channel("UCbRP3c757lWg9M-U7TyEkXA").validate().is_ok());
		assert!(channel("@t3dotgg").validate().is_ok());
		assert!(channel("").validate().is_err());
		assert!(channel("bad id").validate().is_err());
		assert!(channel(&"a".repeat(65)).validate().is_err());

		let mut negative = channel("abc");
		negative.subscriber_count = -1;
		assert!(negative.validate().is_err());

		let mut unnamed = channel("abc");
		unnamed.name = " ".to_string();
		assert!(unnamed.validate().is_err());
	}
}
