use std::path::Path;

use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use figment::Figment;

use crate::logging;

/// Environment variables with this prefix override config file values.
/// Nested keys are separated by a double underscore, so
/// `RADAR_LOGGING__LEVEL=debug` sets `logging.level`.
pub const ENV_PREFIX: &str = "RADAR_";

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct LoggingConfig {
	/// The log level to use, this is a tracing env filter
	pub level: String,

	/// What logging mode we should use
	pub mode: logging::Mode,
}

impl Default for LoggingConfig {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
			mode: logging::Mode::Default,
		}
	}
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("config file not found: {0}")]
	MissingFile(String),
	#[error("unsupported config file format: {0}")]
	UnsupportedFormat(String),
	#[error("failed to parse command line: {0}")]
	Cli(#[from] clap::Error),
	#[error("failed to resolve config file path: {0}")]
	Io(#[from] std::io::Error),
	#[error("invalid config: {0}")]
	Figment(#[from] Box<figment::Error>),
}

#[derive(Debug, clap::Parser)]
struct Cli {
	/// The path to the config file
	#[arg(long, short = 'c')]
	config_file: Option<String>,
}

fn file_provider(figment: Figment, path: &Path) -> Result<Figment, ConfigError> {
	let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default();

	Ok(match extension {
		"toml" => figment.merge(Toml::file(path)),
		"yaml" | "yml" => figment.merge(Yaml::file(path)),
		"json" => figment.merge(Json::file(path)),
		_ => return Err(ConfigError::UnsupportedFormat(path.display().to_string())),
	})
}

/// Builds a config from, in increasing priority: the defaults of `C`, the
/// config file, and `RADAR_` environment variables.
///
/// The config file is taken from `--config-file` (when `enable_cli` is set),
/// then `RADAR_CONFIG_FILE`, then `config_file`. A missing file is only an
/// error when it was explicitly requested. Returns the canonical path of the
/// file that was loaded, if any.
pub fn parse<C>(enable_cli: bool, config_file: Option<String>) -> Result<(C, Option<String>), ConfigError>
where
	C: Default + serde::Serialize + serde::de::DeserializeOwned,
{
	let cli_file = if enable_cli {
		<Cli as clap::Parser>::try_parse()?.config_file
	} else {
		None
	};

	let env_file = std::env::var(format!("{ENV_PREFIX}CONFIG_FILE")).ok();

	let key_provided = cli_file.is_some() || env_file.is_some();

	let mut figment = Figment::from(Serialized::defaults(C::default()));
	let mut config_path = None;

	if let Some(path) = cli_file.or(env_file).or(config_file) {
		let path = Path::new(&path);
		if path.is_file() {
			figment = file_provider(figment, path)?;
			config_path = Some(std::fs::canonicalize(path)?.display().to_string());
		} else if key_provided {
			return Err(ConfigError::MissingFile(path.display().to_string()));
		} else {
			tracing::debug!(path = %path.display(), "config file not found, skipping");
		}
	}

	let config = figment
		.merge(Env::prefixed(ENV_PREFIX).split("__"))
		.extract()
		.map_err(Box::new)?;

	Ok((config, config_path))
}
