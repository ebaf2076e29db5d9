//! Engine configuration.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration:
//!
//! ```toml
//! max_history = 1024
//! lock_timeout_ms = 1500
//! suggestion_delay_ms = 500
//! replay_delay_ms = 50
//! status_display_ms = 1000
//! capture_mode = "capture"
//! default_register = "default"
//! ```

mod error;

use std::path::Path;
use std::time::Duration;

pub use error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Tunables of the dispatch engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
	/// History entries kept before the oldest are dropped.
	pub max_history: usize,
	/// The serialization lock is force-released after this long.
	pub lock_timeout_ms: u64,
	/// Delay before next-key suggestions appear; `0` disables them.
	pub suggestion_delay_ms: u64,
	/// Settling delay between replayed history entries.
	pub replay_delay_ms: u64,
	/// How long a completed key sequence stays in the status bar.
	pub status_display_ms: u64,
	/// Mode active while keys are being captured.
	pub capture_mode: String,
	/// Search register and macro stack used when a command names none.
	pub default_register: String,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			max_history: 1024,
			lock_timeout_ms: 1500,
			suggestion_delay_ms: 500,
			replay_delay_ms: 50,
			status_display_ms: 1000,
			capture_mode: "capture".to_string(),
			default_register: "default".to_string(),
		}
	}
}

impl EngineConfig {
	/// Parses and validates a TOML document.
	pub fn from_toml_str(input: &str) -> Result<Self> {
		let config: Self = toml::from_str(input)?;
		config.validate()?;
		Ok(config)
	}

	/// Reads, parses and validates the file at `path`.
	pub fn load(path: &Path) -> Result<Self> {
		let input = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		let config = Self::from_toml_str(&input)?;
		debug!(path = %path.display(), "loaded engine config");
		Ok(config)
	}

	/// Rejects values the engine cannot run with.
	pub fn validate(&self) -> Result<()> {
		if self.max_history == 0 {
			return Err(ConfigError::Invalid("max_history must be at least 1".into()));
		}
		if self.capture_mode.trim().is_empty() {
			return Err(ConfigError::Invalid("capture_mode must name a mode".into()));
		}
		if self.default_register.is_empty() {
			return Err(ConfigError::Invalid("default_register must not be empty".into()));
		}
		Ok(())
	}

	pub fn lock_timeout(&self) -> Duration {
		Duration::from_millis(self.lock_timeout_ms)
	}

	/// `None` when suggestions are disabled.
	pub fn suggestion_delay(&self) -> Option<Duration> {
		(self.suggestion_delay_ms > 0).then(|| Duration::from_millis(self.suggestion_delay_ms))
	}

	pub fn replay_delay(&self) -> Duration {
		Duration::from_millis(self.replay_delay_ms)
	}

	pub fn status_display(&self) -> Duration {
		Duration::from_millis(self.status_display_ms)
	}
}
