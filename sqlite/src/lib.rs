//! SQLite backend for the rowmap record mapper.
//!
//! This crate implements the [`Session`](rowmap_core::Session) seam of
//! `rowmap-core` over a `rusqlite` connection, so records and rows can be
//! synchronized, written and read against SQLite.
//!
//! # Architecture
//!
//! - **`connection`**: [`Connection`]: open/close, schema sync, command
//!   execution, cursors and transaction state
//! - **`transaction`**: [`Transaction`]: explicit handle, rolled back on drop
//! - **`schema`**: [`SqliteDialect`]: catalog reads and DDL, including the
//!   table rebuild used for column type changes
//! - **`convert`**: rusqlite rows to raw cells
//! - **`config`**: [`SqliteConfig`], loadable from YAML
//!
//! # Quick start
//!
//! ```no_run
//! use rowmap_core::{Payload, Query, Row};
//! use rowmap_sqlite::{Connection, SqliteConfig};
//!
//! let config = SqliteConfig::load("rowmap.yml").unwrap();
//! let conn = Connection::open(&config).unwrap();
//!
//! let tx = conn.begin_tx().unwrap();
//! let row = Row::new().with("id", "E1").with("title", "Lead");
//! tx.execute(&Query::table("employees").insert(), Payload::data(&row))
//!     .unwrap();
//! tx.commit().unwrap();
//!
//! let mut rows: Vec<Row> = Vec::new();
//! conn.cursor(&Query::table("employees").select())
//!     .fetch(&mut rows, 0)
//!     .unwrap();
//! ```

mod config;
mod connection;
mod convert;
mod error;
mod schema;
mod transaction;

pub use config::SqliteConfig;
pub use connection::{Connection, ConnectionState};
pub use error::{Result, SqliteError};
pub use schema::{SHADOW_SUFFIX, SqliteDialect};
pub use transaction::Transaction;
