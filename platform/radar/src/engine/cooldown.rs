use chrono::{DateTime, Duration, Utc};

/// Minutes a user waits between two scans.
pub const DEFAULT_COOLDOWN_MINUTES: u32 = 30;

/// Gates how often a user may scan, based on their last committed scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cooldown {
	window: Duration,
}

impl Default for Cooldown {
	fn default() -> Self {
		Self::from_minutes(DEFAULT_COOLDOWN_MINUTES)
	}
}

impl Cooldown {
	pub fn from_minutes(minutes: u32) -> Self {
		Self {
			window: Duration::minutes(i64::from(minutes)),
		}
	}

	pub fn window(&self) -> Duration {
		self.window
	}

	/// `None` when the user never scanned.
	pub fn next_allowed_at(&self, last_scan_at: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
		last_scan_at.map(|last| last + self.window)
	}

	pub fn can_scan(&self, last_scan_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
		self.next_allowed_at(last_scan_at).map_or(true, |next| now >= next)
	}

	pub fn status(&self, last_scan_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> ScanStatus {
		let next_allowed_at = self.next_allowed_at(last_scan_at);
		let remaining = next_allowed_at
			.map(|next| next - now)
			.filter(|remaining| *remaining > Duration::zero())
			.unwrap_or_else(Duration::zero);

		ScanStatus {
			can_scan: remaining == Duration::zero(),
			last_scan_at,
			next_allowed_at,
			remaining,
		}
	}
}

/// What a caller needs to render the scan button and its countdown. The
/// countdown is presentation only, [`Cooldown`] is checked again when the scan
/// runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanStatus {
	pub can_scan: bool,
	pub last_scan_at: Option<DateTime<Utc>>,
	pub next_allowed_at: Option<DateTime<Utc>>,
	/// Zero when `can_scan` is set.
	pub remaining: Duration,
}

/// Renders a remaining duration as zero padded `MM:SS`. Minutes are not
/// wrapped into hours and negative durations render as `00:00`.
pub fn format_countdown(remaining: Duration) -> String {
	let seconds = remaining.num_seconds().max(0);
	format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
