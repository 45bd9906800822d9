//! TOML configuration for the `adex` binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use adex_directory::ConnectionSettings;
use adex_explorer::SearchOptions;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read {}: {error}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		error: std::io::Error,
	},

	#[error("invalid configuration: {0}")]
	Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExplorerConfig {
	pub connection: ConnectionSection,
	pub directory: DirectorySection,
	pub search: SearchSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectionSection {
	pub domain: Option<String>,
	pub user: Option<String>,
	pub password: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
	#[default]
	Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DirectorySection {
	pub backend: Backend,
	pub synthetic_groups: usize,
	pub synthetic_users: usize,
	pub seed: u64,
}

impl Default for DirectorySection {
	fn default() -> Self {
		Self {
			backend: Backend::Memory,
			synthetic_groups: 2000,
			synthetic_users: 5000,
			seed: 7,
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchSection {
	/// Pause between sort-inserts in milliseconds.
	pub insert_pause_ms: u64,
}

/// Directory holding `config.toml`: `ADEX_CONFIG_DIR`, else `$XDG_CONFIG_HOME/adex`.
pub fn config_dir() -> Option<PathBuf> {
	if let Ok(dir) = std::env::var("ADEX_CONFIG_DIR") {
		return Some(PathBuf::from(dir));
	}
	dirs::config_dir().map(|d| d.join("adex"))
}

pub fn default_path() -> Option<PathBuf> {
	config_dir().map(|d| d.join("config.toml"))
}

impl ExplorerConfig {
	/// Reads `path`; a missing file yields the defaults.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let content = match std::fs::read_to_string(path) {
			Ok(content) => content,
			Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
				tracing::debug!(path = %path.display(), "config.missing");
				return Ok(Self::default());
			}
			Err(error) => {
				return Err(ConfigError::Io {
					path: path.to_owned(),
					error,
				});
			}
		};
		let config = toml::from_str(&content)?;
		tracing::debug!(path = %path.display(), "config.loaded");
		Ok(config)
	}

	pub fn connection_settings(&self) -> ConnectionSettings {
		ConnectionSettings {
			domain: self.connection.domain.clone(),
			user: self.connection.user.clone(),
			password: self.connection.password.clone(),
		}
	}

	pub fn search_options(&self) -> SearchOptions {
		SearchOptions {
			insert_pause: Duration::from_millis(self.search.insert_pause_ms),
		}
	}
}
