use std::time::Duration;

use thiserror::Error;

/// Malformed requests, catalogs and settings.
///
/// These are fatal to the whole request: they are raised before any unit
/// of work starts and no partial report is produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("at least one task must be selected")]
    EmptySelection,

    #[error("unknown task: {0}")]
    UnknownTask(String),

    #[error("at least one content source must be enabled")]
    NoSourceEnabled,

    #[error("duplicate task in catalog: {0}")]
    DuplicateTask(String),

    #[error("invalid setting: {0}")]
    InvalidSetting(String),
}

/// Failure of a single unit of work.
///
/// Recorded as a value in the unit's result slot and never propagated to
/// sibling units or to the caller of `dispatch`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskExecutionError {
    #[error("generation failed: {0}")]
    Generation(String),

    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to launch generator: {0}")]
    Spawn(String),

    #[error("unit panicked: {0}")]
    Panicked(String),

    #[error("generator returned no content")]
    EmptyOutput,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Monitor observation error: {0}")]
    MonitorObservation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("No home directory")]
    NoHomeDir,
}

impl Error {
    /// True for errors that reject a request before dispatch.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
