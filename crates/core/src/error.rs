use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for skillcap-core
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the skill cap engine
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error for file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Parse/serialization errors
    #[error("parse error: {0}")]
    Parse(String),

    /// Validation errors
    #[error("validation error: {0}")]
    Validation(String),

    /// Settings file not found
    #[error("settings file not found: {0}")]
    SettingsNotFound(PathBuf),

    /// Logging setup errors
    #[error("logging error: {0}")]
    Logging(String),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Parse(format!("TOML parse error: {}", err))
    }
}
