//! Record descriptors and generic rows.
//!
//! A record type describes its persistable fields once, as a static
//! [`FieldSpec`] table. Everything else in the crate (DDL generation,
//! write literals, row materialization) works from the ordered
//! [`FieldDescriptor`] list derived from that table, so no runtime type
//! inspection is involved.
//!
//! Field matching is always case-insensitive on the storage alias, which
//! defaults to the field name. The alias [`EXCLUDED`] removes a field from
//! persistence entirely.
//!
//! # Example
//!
//! ```
//! use rowmap_core::{Record, Timestamp, descriptors, impl_record};
//!
//! #[derive(Debug, Default, Clone)]
//! struct Employee {
//!     id: String,
//!     title: String,
//!     group: String,
//!     joined: Timestamp,
//!     scratch: String,
//! }
//!
//! impl_record!(Employee {
//!     id: String,
//!     title: String,
//!     group: String => "dg",
//!     joined: Timestamp,
//!     scratch: String => "-",
//! });
//!
//! let fields = descriptors::<Employee>(&["id"]);
//! assert_eq!(fields.len(), 4);
//! assert_eq!(fields[2].storage_alias, "dg");
//! assert!(fields[0].is_key);
//! ```

use crate::error::CoerceError;
use crate::value::{Timestamp, Value};

/// Alias marking a field as excluded from persistence.
pub const EXCLUDED: &str = "-";

/// Semantic type of a field, derived from its declared type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticType {
    Integer,
    Float,
    Boolean,
    Timestamp,
    Text,
    Other,
}

impl SemanticType {
    /// Classifies a declared type name by its lowercase prefix.
    pub fn from_type_name(type_name: &str) -> Self {
        let name = type_name.to_lowercase();
        if name.starts_with("int") && !name.starts_with("interface") {
            SemanticType::Integer
        } else if name.starts_with("float") {
            SemanticType::Float
        } else if name.starts_with("time") {
            SemanticType::Timestamp
        } else if name.starts_with("bool") {
            SemanticType::Boolean
        } else if name.starts_with("string") {
            SemanticType::Text
        } else {
            SemanticType::Other
        }
    }
}

/// Canonical type name of a Rust field type, as seen by the type mapper
/// and the coercion engine.
pub trait FieldType {
    const TYPE_NAME: &'static str;
}

macro_rules! impl_field_type {
    ( $( $ty:ty => $name:literal ),* $(,)? ) => {
        $(
            impl FieldType for $ty {
                const TYPE_NAME: &'static str = $name;
            }
        )*
    };
}

impl_field_type!(
    i64 => "int64",
    i32 => "int32",
    f64 => "float64",
    f32 => "float32",
    bool => "bool",
    String => "string",
    Timestamp => "time",
    serde_json::Value => "json",
);

/// One entry of a record's static descriptor table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name as declared on the record.
    pub name: &'static str,
    /// Declared type name, e.g. `"int64"` or `"time"`.
    pub type_name: &'static str,
    /// Storage alias; [`EXCLUDED`] drops the field.
    pub alias: Option<&'static str>,
}

impl FieldSpec {
    pub const fn new(name: &'static str, type_name: &'static str) -> Self {
        Self {
            name,
            type_name,
            alias: None,
        }
    }

    pub const fn alias(mut self, alias: &'static str) -> Self {
        self.alias = Some(alias);
        self
    }

    pub const fn excluded(self) -> Self {
        self.alias(EXCLUDED)
    }

    pub fn is_excluded(&self) -> bool {
        self.alias == Some(EXCLUDED)
    }
}

/// Derived metadata for one persistable field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub logical_name: String,
    /// Column name used for schema, writes and reads.
    pub storage_alias: String,
    pub type_name: String,
    pub semantic_type: SemanticType,
    pub is_key: bool,
}

impl FieldDescriptor {
    /// Builds the descriptor for `spec`, or `None` if the field is excluded.
    pub fn from_spec(spec: &FieldSpec, keys: &[&str]) -> Option<Self> {
        if spec.is_excluded() {
            return None;
        }
        let storage_alias = spec.alias.unwrap_or(spec.name);
        let is_key = keys
            .iter()
            .any(|key| names_match(key, spec.name) || names_match(key, storage_alias));
        Some(Self {
            logical_name: spec.name.to_string(),
            storage_alias: storage_alias.to_string(),
            type_name: spec.type_name.to_string(),
            semantic_type: SemanticType::from_type_name(spec.type_name),
            is_key,
        })
    }

    /// Returns `true` if `column` addresses this field.
    pub fn matches(&self, column: &str) -> bool {
        names_match(&self.storage_alias, column)
    }
}

/// Case-insensitive name comparison used for every field and column match.
pub fn names_match(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// Derives the ordered descriptor list from a static field table.
pub fn describe(specs: &[FieldSpec], keys: &[&str]) -> Vec<FieldDescriptor> {
    specs
        .iter()
        .filter_map(|spec| FieldDescriptor::from_spec(spec, keys))
        .collect()
}

/// Derives the ordered descriptor list of a record type.
pub fn descriptors<R: Record>(keys: &[&str]) -> Vec<FieldDescriptor> {
    describe(R::FIELDS, keys)
}

/// A record type with a static field table.
///
/// Usually implemented through [`impl_record!`](crate::impl_record), which
/// also provides the [`Materialize`](crate::Materialize) impls for the
/// record and for `Box<Record>`.
pub trait Record: Default {
    const FIELDS: &'static [FieldSpec];

    /// Reads a field by its logical name.
    fn field_value(&self, name: &str) -> Option<Value>;

    /// Writes a coerced value into a field by its logical name.
    fn assign(&mut self, name: &str, value: Value) -> Result<(), CoerceError>;
}

/// Source of field-name/value pairs for write commands.
pub trait Persist {
    fn persisted_fields(&self) -> Vec<(String, Value)>;
}

impl<R: Record> Persist for R {
    fn persisted_fields(&self) -> Vec<(String, Value)> {
        descriptors::<R>(&[])
            .into_iter()
            .filter_map(|field| {
                self.field_value(&field.logical_name)
                    .map(|value| (field.storage_alias, value))
            })
            .collect()
    }
}

/// Generic ordered map from column name to value.
///
/// Entries keep the order in which they were first set, which for
/// materialized rows is the result-set column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    entries: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`, replacing an entry with exactly the same name.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
        self
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(key, _)| names_match(key, name))
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl Persist for Row {
    fn persisted_fields(&self) -> Vec<(String, Value)> {
        self.entries.clone()
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __field_alias {
    () => {
        None
    };
    ($alias:literal) => {
        Some($alias)
    };
}

/// Implements [`Record`] and [`Materialize`](crate::Materialize) for a
/// struct whose fields all implement [`FieldType`], `Clone`, `Into<Value>`
/// and [`FromValue`](crate::FromValue).
///
/// Each field may carry a storage alias with `=> "alias"`; `=> "-"`
/// excludes it.
#[macro_export]
macro_rules! impl_record {
    ($ty:ident { $( $field:ident : $fty:ty $( => $alias:literal )? ),* $(,)? }) => {
        impl $crate::Record for $ty {
            const FIELDS: &'static [$crate::FieldSpec] = &[
                $(
                    $crate::FieldSpec {
                        name: stringify!($field),
                        type_name: <$fty as $crate::FieldType>::TYPE_NAME,
                        alias: $crate::__field_alias!($($alias)?),
                    },
                )*
            ];

            fn field_value(&self, name: &str) -> ::std::option::Option<$crate::Value> {
                match name {
                    $(
                        stringify!($field) => ::std::option::Option::Some($crate::Value::from(
                            ::std::clone::Clone::clone(&self.$field),
                        )),
                    )*
                    _ => ::std::option::Option::None,
                }
            }

            fn assign(
                &mut self,
                name: &str,
                value: $crate::Value,
            ) -> ::std::result::Result<(), $crate::CoerceError> {
                match name {
                    $(
                        stringify!($field) => {
                            self.$field = <$fty as $crate::FromValue>::from_value(value)?;
                            ::std::result::Result::Ok(())
                        }
                    )*
                    _ => ::std::result::Result::Err($crate::CoerceError::UnknownField(
                        name.to_string(),
                    )),
                }
            }
        }

        impl $crate::Materialize for $ty {
            fn fields() -> ::std::vec::Vec<$crate::FieldDescriptor> {
                $crate::descriptors::<$ty>(&[])
            }

            fn materialize(
                fields: &[$crate::FieldDescriptor],
                columns: &[::std::string::String],
                cells: ::std::vec::Vec<$crate::RawCell>,
            ) -> $crate::Result<Self> {
                let mut record = <$ty as ::std::default::Default>::default();
                $crate::serialize_record(&mut record, fields, columns, cells)?;
                ::std::result::Result::Ok(record)
            }
        }

        impl $crate::Materialize for ::std::boxed::Box<$ty> {
            fn fields() -> ::std::vec::Vec<$crate::FieldDescriptor> {
                <$ty as $crate::Materialize>::fields()
            }

            fn materialize(
                fields: &[$crate::FieldDescriptor],
                columns: &[::std::string::String],
                cells: ::std::vec::Vec<$crate::RawCell>,
            ) -> $crate::Result<Self> {
                <$ty as $crate::Materialize>::materialize(fields, columns, cells)
                    .map(::std::boxed::Box::new)
            }
        }
    };
}
