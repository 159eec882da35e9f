//! Error types for oget-core
//!
//! One error enum covers configuration, enumeration and transfer failures so
//! that every layer can classify a failure without string matching.

use std::path::Path;

use thiserror::Error;

/// Result type alias for oget operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for oget operations
#[derive(Debug, Error)]
pub enum Error {
    /// A source or target expression could not be interpreted
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// The local target cannot receive the expanded sources
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// Configuration file or environment could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Alias not found: {0}")]
    AliasNotFound(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    /// Remote 403 or local permission failure
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// The operand names a folder rather than an object
    #[error("`{0}` is a folder.")]
    IsDirectory(String),

    #[error("Network error: {0}")]
    Network(String),

    /// The stream ended before the advertised object size was written
    #[error("Partial write to {path}: expected {expected} bytes, wrote {written}")]
    PartialWrite {
        path: String,
        expected: u64,
        written: u64,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{0}")]
    General(String),
}

impl Error {
    /// Classify a local filesystem error against the path it concerns.
    pub fn from_local_io(path: &Path, error: std::io::Error) -> Self {
        let shown = path.display().to_string();
        match error.kind() {
            std::io::ErrorKind::PermissionDenied | std::io::ErrorKind::ReadOnlyFilesystem => {
                Error::AccessDenied(shown)
            }
            std::io::ErrorKind::IsADirectory => Error::IsDirectory(shown),
            _ => Error::Io(std::io::Error::new(error.kind(), format!("{shown}: {error}"))),
        }
    }

    /// True for the "operand is a folder" condition, which is a usage
    /// problem rather than a transient fault.
    pub fn is_directory(&self) -> bool {
        matches!(self, Error::IsDirectory(_))
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}
