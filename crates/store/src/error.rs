//! Error types for the skill file store

use std::path::PathBuf;
use thiserror::Error;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur reading or writing the skill file
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML syntax or type error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yml::Error),

    /// Document is valid YAML but not a skill mapping in any known format
    #[error("Unrecognised skill document: {0}")]
    Format(String),

    /// Write failed at both the primary and the fallback location
    #[error("Could not write {primary} or fallback {fallback}: {reason}")]
    Unwritable { primary: PathBuf, fallback: PathBuf, reason: String },

    /// File watcher error
    #[error("Watcher error: {0}")]
    Watcher(String),
}

impl Error {
    /// Create a format error with a message
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Create a watcher error with a message
    pub fn watcher(msg: impl Into<String>) -> Self {
        Self::Watcher(msg.into())
    }
}
