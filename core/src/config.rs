//! Mapping configuration.
//!
//! Loaded from YAML alongside the backend configuration.
//!
//! # Example YAML
//!
//! ```yaml
//! text_capacity: 200
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default capacity of text columns, in characters.
pub const DEFAULT_TEXT_CAPACITY: usize = 200;

/// Settings for the column type mapper.
///
/// # Examples
///
/// ```
/// # use rowmap_core::MapperConfig;
/// let config = MapperConfig::default();
/// assert_eq!(config.text_capacity, 200);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Capacity of `VARCHAR` columns created for text and unknown types.
    pub text_capacity: usize,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            text_capacity: DEFAULT_TEXT_CAPACITY,
        }
    }
}

impl MapperConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::Error::IoError) if the file cannot be read,
    /// or [`YamlError`](crate::Error::YamlError) if parsing fails.
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
}
