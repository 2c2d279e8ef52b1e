//! Column type mapping.
//!
//! Maps a declared field type name to the storage column type used in
//! `CREATE TABLE` and `ALTER TABLE` statements. Rules are checked by
//! lowercase prefix and the first match wins:
//!
//! | prefix  | column type          |
//! |---------|----------------------|
//! | `int`   | `INT`                |
//! | `float` | `REAL`               |
//! | `time`  | `DATETIME`           |
//! | `bool`  | `TINYINT(1)`         |
//! | other   | `VARCHAR(capacity)`  |
//!
//! The text capacity defaults to 200 characters. Longer values are
//! truncated or rejected by the database, not by this crate.

use crate::config::MapperConfig;
use crate::record::SemanticType;

/// Maps a declared type name to a column type.
pub fn column_type(type_name: &str, config: &MapperConfig) -> String {
    let name = type_name.to_lowercase();
    if name.starts_with("int") {
        "INT".to_string()
    } else if name.starts_with("float") {
        "REAL".to_string()
    } else if name.starts_with("time") {
        "DATETIME".to_string()
    } else if name.starts_with("bool") {
        "TINYINT(1)".to_string()
    } else {
        text_type(config)
    }
}

/// Maps a [`SemanticType`] to a column type.
pub fn for_semantic(semantic: SemanticType, config: &MapperConfig) -> String {
    match semantic {
        SemanticType::Integer => "INT".to_string(),
        SemanticType::Float => "REAL".to_string(),
        SemanticType::Timestamp => "DATETIME".to_string(),
        SemanticType::Boolean => "TINYINT(1)".to_string(),
        SemanticType::Text | SemanticType::Other => text_type(config),
    }
}

fn text_type(config: &MapperConfig) -> String {
    format!("VARCHAR({})", config.text_capacity)
}
