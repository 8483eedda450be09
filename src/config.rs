use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigurationError;
use crate::provenance::ScoringConfig;
use crate::{Error, Result};

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
pub const DEFAULT_GENERATOR_COMMAND: &str = "claude";
pub const DEFAULT_OUTPUT_FORMAT: &str = "json";
pub const DEFAULT_GENERATOR_TIMEOUT_SECS: u64 = 600;

/// Settings for the external generator process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub command: String,
    pub output_format: String,
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_GENERATOR_COMMAND.to_string(),
            output_format: DEFAULT_OUTPUT_FORMAT.to_string(),
            timeout_secs: DEFAULT_GENERATOR_TIMEOUT_SECS,
        }
    }
}

impl GeneratorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Progress monitor cadence.
    pub poll_interval_ms: u64,
    pub scoring: ScoringConfig,
    pub generator: GeneratorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            scoring: ScoringConfig::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

impl Config {
    pub fn orchestra_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".orchestra"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::orchestra_dir()?.join("orchestra.toml"))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Load from `~/.orchestra/orchestra.toml`, falling back to defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load from an explicit path. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// parsed settings fail [`Config::validate`].
    pub fn load_from(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading config");
        if !path.exists() {
            tracing::debug!("config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        config.validate()?;
        tracing::debug!(
            poll_interval_ms = config.poll_interval_ms,
            command = %config.generator.command,
            "config loaded"
        );
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                tracing::debug!(dir = %dir.display(), "creating config directory");
                fs::create_dir_all(dir)?;
            }
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        tracing::debug!(path = %path.display(), "config saved");
        Ok(())
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigurationError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigurationError::InvalidSetting(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.generator.command.trim().is_empty() {
            return Err(ConfigurationError::InvalidSetting(
                "generator.command must not be empty".to_string(),
            ));
        }
        if self.generator.timeout_secs == 0 {
            return Err(ConfigurationError::InvalidSetting(
                "generator.timeout_secs must be greater than zero".to_string(),
            ));
        }
        self.scoring.validate()
    }
}
