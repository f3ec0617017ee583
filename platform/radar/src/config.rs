use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use common::config::LoggingConfig;

use crate::engine::{SelectionOrder, DEFAULT_COOLDOWN_MINUTES, DEFAULT_SELECTION_ORDER, DEFAULT_TOP_K};

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
/// Radar finds users who collected the same channels
pub struct AppConfig {
	/// The path to the config file
	pub config_file: Option<String>,

	/// Name of this instance
	pub name: String,

	/// The logging config
	pub logging: LoggingConfig,

	/// HTTP API config
	pub http: HttpConfig,

	/// Database config
	pub database: DatabaseConfig,

	/// Matching engine config
	pub radar: RadarConfig,
}

impl Default for AppConfig {
	fn default() -> Self {
		Self {
			config_file: Some("config.toml".to_string()),
			name: "radar".to_string(),
			logging: LoggingConfig::default(),
			http: HttpConfig::default(),
			database: DatabaseConfig::default(),
			radar: RadarConfig::default(),
		}
	}
}

impl AppConfig {
	pub fn parse() -> Result<Self> {
		let (mut config, config_file) = common::config::parse::<Self>(!cfg!(test), Self::default().config_file)?;

		config.config_file = config_file;

		Ok(config)
	}
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct HttpConfig {
	/// Bind address for the API
	pub bind_address: SocketAddr,
}

impl Default for HttpConfig {
	fn default() -> Self {
		Self {
			bind_address: SocketAddr::from(([0, 0, 0, 0], 4000)),
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
	#[default]
	Postgres,
	/// Keeps everything in process memory, lost on restart
	Memory,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
	/// Where users, channels and clones are stored
	pub backend: StoreBackend,

	/// The database URL to use
	pub uri: String,

	/// Maximum number of pooled connections
	pub pool_size: usize,

	/// Create the tables on startup if they do not exist
	pub migrate: bool,
}

impl Default for DatabaseConfig {
	fn default() -> Self {
		Self {
			backend: StoreBackend::Postgres,
			uri: "postgres://root@localhost:5432/radar_dev".to_string(),
			pool_size: 16,
			migrate: true,
		}
	}
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct RadarConfig {
	/// Minutes a user waits between two scans
	pub cooldown_minutes: u32,

	/// Minimum wall clock time of a scan, zero disables it
	#[serde(with = "humantime_serde")]
	pub scan_floor: Duration,

	/// How many scored candidates a scan reconciles
	pub top_k: usize,

	/// Which end of the ranking a scan reconciles
	pub selection: SelectionOrder,

	/// Delete decayed clones even when they fall outside the top k
	pub retire_decayed: bool,

	/// Days a clone stays on the recent scans leaderboard
	pub recent_window_days: u32,

	/// Entries in the recent scans and channel leaderboards
	pub leaderboard_limit: usize,

	/// Maximum clones returned to a user
	pub my_clones_limit: usize,

	/// Maximum channels a user may collect
	pub channel_cap: usize,

	/// Buffered invalidation events per subscriber
	pub event_capacity: usize,
}

impl Default for RadarConfig {
	fn default() -> Self {
		Self {
			cooldown_minutes: DEFAULT_COOLDOWN_MINUTES,
			scan_floor: Duration::from_secs(5),
			top_k: DEFAULT_TOP_K,
			selection: DEFAULT_SELECTION_ORDER,
			retire_decayed: true,
			recent_window_days: 30,
			leaderboard_limit: 10,
			my_clones_limit: 100,
			channel_cap: 16,
			event_capacity: 256,
		}
	}
}
