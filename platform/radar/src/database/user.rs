use chrono::{DateTime, Utc};
use ulid::Ulid;

#[derive(Debug, Clone, PartialEq, Eq, postgres_from_row::FromRow, serde::Serialize)]
pub struct User {
	/// The unique identifier for the user.
	pub id: Ulid,
	/// The display name of the user.
	pub display_name: String,
	/// The time the user last committed a scan, drives the scan cooldown.
	pub last_scan_at: Option<DateTime<Utc>>,
	/// The time the user was created.
	pub created_at: DateTime<Utc>,
}

impl User {
	pub const MAX_DISPLAY_NAME_LEN: usize = 32;

	/// Validates a display name.
	pub fn validate_display_name(display_name: &str) -> Result<(), &'static str> {
		let trimmed = display_name.trim();

		if trimmed.is_empty() {
			return Err("Display name must not be empty");
		}

		if trimmed.chars().count() > Self::MAX_DISPLAY_NAME_LEN {
			return Err("Display name must be at most 32 characters long");
		}

		Ok(())
	}

	pub fn summary(&self) -> UserSummary {
		UserSummary {
			id: self.id,
			display_name: self.display_name.clone(),
		}
	}
}

/// The public face of a user, as shown next to a clone.
#[derive(Debug, Clone, PartialEq, Eq, postgres_from_row::FromRow, serde::Serialize)]
pub struct UserSummary {
	pub id: Ulid,
	pub display_name: String,
}

/// A user together with the channels they collected.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Profile {
	pub user: User,
	/// Ordered by subscriber count, largest first.
	pub channels: Vec<super::Channel>,
}
