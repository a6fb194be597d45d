// src/errors.rs

//! Crate-wide error type.
//!
//! Only *structural* problems are errors: anything detected before a
//! process is spawned. A command that exits non-zero, fails to spawn, or is
//! cancelled is recorded as an [`ActionOutcome`](crate::engine::ActionOutcome)
//! on its member instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BpmError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error in {location}: {rule}")]
    ValidationError { location: String, rule: String },

    #[error("Action not found: {0}")]
    ActionNotFound(String),

    #[error("Watch mode unsupported: action '{0}' has no watch_command")]
    WatchUnsupported(String),

    #[error(
        "Unexpected arguments: action '{action}' does not accept additional arguments, but {count} were given"
    )]
    UnexpectedArguments { action: String, count: usize },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BpmError {
    pub(crate) fn validation(location: impl Into<String>, rule: impl Into<String>) -> Self {
        BpmError::ValidationError {
            location: location.into(),
            rule: rule.into(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BpmError>;
