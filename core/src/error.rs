//! Error types for mapping, coercion, and execution.
//!
//! Every failure the core can produce is an [`Error`] variant. Backend
//! drivers report their own failures as a boxed [`DriverError`], which the
//! core wraps with the SQL text or schema phase it was running.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Boxed error produced by a backend driver (SQLite, a test double, ...).
pub type DriverError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while mapping records to and from a database.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed caller input, detected before any I/O.
    #[error("validation error: {0}")]
    Validation(String),

    /// A statement failed in the database client.
    #[error("{source}. SQL Command: {sql}")]
    Execution {
        sql: String,
        #[source]
        source: DriverError,
    },

    /// A cell could not be converted under its type hint.
    #[error("fail to serialize {column}. {source}")]
    Coercion {
        column: String,
        #[source]
        source: CoerceError,
    },

    /// Transactional operation invoked out of sequence.
    #[error("state error: {0}")]
    State(String),

    /// A catalog read or DDL statement failed while synchronizing a table.
    #[error("unable to {phase} table {table}. {source}")]
    Schema {
        table: String,
        phase: SchemaPhase,
        sql: String,
        #[source]
        source: DriverError,
    },

    /// The result set failed while being iterated.
    #[error("error while iterating data. {0}")]
    Iteration(#[source] DriverError),

    /// Sticky cursor error, returned by every operation after the first failure.
    #[error(transparent)]
    Cursor(Arc<Error>),

    /// File I/O failure while loading or saving configuration.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl Error {
    /// Wraps a driver failure with the statement that caused it.
    pub fn execution(sql: impl Into<String>, source: DriverError) -> Self {
        Error::Execution {
            sql: sql.into(),
            source,
        }
    }

    /// Returns the innermost error, looking through sticky cursor wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Cursor(inner) => inner.root(),
            other => other,
        }
    }
}

/// Step of the schema synchronizer that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaPhase {
    Lookup,
    Describe,
    Create,
    Alter,
    Drop,
}

impl fmt::Display for SchemaPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SchemaPhase::Lookup => "check existence of",
            SchemaPhase::Describe => "describe",
            SchemaPhase::Create => "create",
            SchemaPhase::Alter => "alter",
            SchemaPhase::Drop => "drop",
        };
        f.write_str(text)
    }
}

/// Failure to convert a raw cell or a [`Value`](crate::Value) into a target type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoerceError {
    /// The raw text is not a valid value of the hinted type.
    #[error("invalid {kind} value {raw:?}")]
    Invalid { kind: &'static str, raw: String },

    /// A value of one kind was assigned to a field of another.
    #[error("expected {expected} but found {found}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// The record has no field with this name.
    #[error("unknown field {0}")]
    UnknownField(String),
}

/// Convenience alias for results with [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
