//! Error types for the SQLite backend.
//!
//! Wraps the backend-neutral [`rowmap_core::Error`] alongside driver,
//! configuration, and file failures.

use thiserror::Error;

/// Errors that can occur while opening or using a SQLite connection.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// SQLite database operation failure.
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// Mapping failure: validation, execution, coercion, state or schema.
    #[error(transparent)]
    Core(#[from] rowmap_core::Error),

    /// Pragma name or value contains characters outside the allowed set.
    #[error("invalid pragma '{0}': names and values must contain only alphanumeric characters, underscores, dashes and dots")]
    InvalidPragma(String),

    /// File system error while reading or writing configuration.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl SqliteError {
    /// The wrapped core error, if any.
    pub fn core(&self) -> Option<&rowmap_core::Error> {
        match self {
            SqliteError::Core(e) => Some(e.root()),
            _ => None,
        }
    }
}

/// Convenience alias for results with [`SqliteError`].
pub type Result<T> = std::result::Result<T, SqliteError>;
