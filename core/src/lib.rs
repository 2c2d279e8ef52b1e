//! Dialect-agnostic core of a lightweight SQL record mapper.
//!
//! This crate maps plain Rust structs and generic [`Row`]s to relational
//! tables without an ORM:
//!
//! - [`Record`]: a struct's static field table, implemented with
//!   [`impl_record!`]; fields may carry a storage alias or be excluded.
//! - [`ensure_table`]: creates a missing table or adds/modifies columns so
//!   it matches a record, never dropping anything.
//! - [`Query`] / [`Command`]: statement templates for select, insert,
//!   update, delete, save (upsert by filter) and raw SQL.
//! - [`execute`]: resolves a write command against a payload into literal
//!   SQL and runs it.
//! - [`Cursor`]: iterates a select, coercing every cell's text form into
//!   typed values for records, boxed records or rows.
//!
//! Everything talks to the database through the [`Session`] trait, which a
//! backend crate implements for its connection and transaction handles.
//! Dialect-specific DDL lives behind [`Dialect`].
//!
//! # Example
//!
//! ```
//! use rowmap_core::{Filter, Query, Row, Value, field_literals};
//!
//! let cmd = Query::table("employees")
//!     .filter(Filter::eq("id", "E1"))
//!     .update_fields(&["title"]);
//! assert_eq!(cmd.text, "UPDATE employees SET {{.FIELDVALUES}} WHERE id = 'E1'");
//!
//! let row = Row::new().with("id", "E1").with("title", "Lead");
//! assert_eq!(
//!     field_literals(&row, &cmd.fields),
//!     vec![("title".to_string(), "'Lead'".to_string())]
//! );
//! assert_eq!(row.get("TITLE"), Some(&Value::from("Lead")));
//! ```

mod coerce;
mod command;
mod config;
mod cursor;
mod dialect;
mod error;
mod executor;
mod record;
mod session;
mod sync;
mod typemap;
mod value;

#[cfg(test)]
mod testing;

pub use coerce::{DATETIME_LAYOUT, coerce, normalize_cell, to_literal, zero_timestamp};
pub use command::{Command, CommandKind, Filter, Query};
pub use config::{DEFAULT_TEXT_CAPACITY, MapperConfig};
pub use cursor::{Cursor, FETCH_CHUNK, Materialize, serialize_record, serialize_row};
pub use dialect::{AlterOp, Dialect, MysqlDialect, ObservedColumn, describe_cell};
pub use error::{CoerceError, DriverError, Error, Result, SchemaPhase};
pub use executor::{ExecOutcome, Payload, execute, field_literals};
pub use record::{
    EXCLUDED, FieldDescriptor, FieldSpec, FieldType, Persist, Record, Row, SemanticType, describe,
    descriptors, names_match,
};
pub use session::{BufferedRows, ResultSet, Session, TextRows, query_count, query_text};
pub use sync::{
    SyncOutcome, create_table_sql, describe_table, drop_table, ensure_fields, ensure_table,
    plan_alter, table_exists,
};
pub use typemap::{column_type, for_semantic};
pub use value::{FromValue, RawCell, Timestamp, Value};
