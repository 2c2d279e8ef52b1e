//! Connection configuration.
//!
//! # Example YAML
//!
//! ```yaml
//! path: data/records.db
//! pragmas:
//!   journal_mode: WAL
//!   foreign_keys: "ON"
//! text_capacity: 200
//! ```
//!
//! Without a `path` the connection opens a private in-memory database.

use std::collections::BTreeMap;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use rowmap_core::MapperConfig;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SqliteError};

/// Settings for opening a [`Connection`](crate::Connection).
///
/// # Examples
///
/// ```
/// # use rowmap_sqlite::SqliteConfig;
/// let config = SqliteConfig::in_memory().with_pragma("foreign_keys", "ON");
/// assert!(config.path.is_none());
/// assert_eq!(config.mapper.text_capacity, 200);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// Database file; `None` opens an in-memory database.
    pub path: Option<PathBuf>,
    /// Pragmas applied right after opening, in name order.
    pub pragmas: BTreeMap<String, String>,
    /// Column type mapping settings.
    #[serde(flatten)]
    pub mapper: MapperConfig,
}

impl SqliteConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn with_pragma(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.pragmas.insert(name.into(), value.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](SqliteError::IoError) if the file cannot be read,
    /// or [`YamlError`](SqliteError::YamlError) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Renders the pragma script, validating every name and value.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::InvalidPragma`] for empty names or values, or
    /// ones containing characters other than alphanumerics, `_`, `-` and `.`.
    pub fn pragma_sql(&self) -> Result<String> {
        let mut sql = String::new();
        for (name, value) in &self.pragmas {
            validate_pragma_token(name)?;
            validate_pragma_token(value)?;
            sql.push_str(&format!("PRAGMA {name} = {value};\n"));
        }
        Ok(sql)
    }
}

fn validate_pragma_token(token: &str) -> Result<()> {
    if token.is_empty()
        || !token
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(SqliteError::InvalidPragma(token.to_string()));
    }
    Ok(())
}
