//! SQLite connection handle.
//!
//! [`Connection`] is a [`Session`]: commands executed on it run in SQLite's
//! autocommit mode. [`begin_tx`](Connection::begin_tx) returns an explicit
//! [`Transaction`] handle; at most one may be active per connection.
//!
//! # Example
//!
//! ```
//! use rowmap_core::{Filter, Payload, Query, Row, impl_record};
//! use rowmap_sqlite::Connection;
//!
//! #[derive(Debug, Default, Clone)]
//! struct Employee {
//!     id: String,
//!     title: String,
//! }
//!
//! impl_record!(Employee { id: String, title: String });
//!
//! let conn = Connection::open_in_memory().unwrap();
//! conn.ensure_table::<Employee>("employees", &["id"]).unwrap();
//!
//! let emp = Employee { id: "E1".into(), title: "Lead".into() };
//! let save = Query::table("employees").filter(Filter::eq("id", "E1")).save();
//! conn.execute(&save, Payload::data(&emp)).unwrap();
//!
//! let mut cursor = conn.cursor(&Query::table("employees").select());
//! let mut rows: Vec<Row> = Vec::new();
//! cursor.fetch(&mut rows, 0).unwrap();
//! assert_eq!(rows.len(), 1);
//! ```

use std::cell::Cell;
use std::fmt;

use rowmap_core::{
    Command, Cursor, Dialect, DriverError, Error, ExecOutcome, Payload, Record, ResultSet, Session,
    SyncOutcome,
};
use tracing::{debug, info};

use crate::config::SqliteConfig;
use crate::convert::{open_rows, run_statement};
use crate::error::Result;
use crate::schema::SqliteDialect;
use crate::transaction::Transaction;

/// Lifecycle state of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Open, statements autocommit.
    Connected,
    /// Open, with a [`Transaction`] handle alive.
    InTransaction,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::InTransaction => write!(f, "in transaction"),
        }
    }
}

/// A SQLite connection with its dialect and mapping settings.
pub struct Connection {
    inner: rusqlite::Connection,
    dialect: SqliteDialect,
    config: SqliteConfig,
    tx_active: Cell<bool>,
}

impl Connection {
    /// Opens the database named by `config` and applies its pragmas.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::InvalidPragma`](crate::SqliteError::InvalidPragma)
    /// for a malformed pragma, or
    /// [`DatabaseError`](crate::SqliteError::DatabaseError) if the database
    /// cannot be opened.
    pub fn open(config: &SqliteConfig) -> Result<Self> {
        let pragmas = config.pragma_sql()?;
        let inner = match &config.path {
            Some(path) => rusqlite::Connection::open(path)?,
            None => rusqlite::Connection::open_in_memory()?,
        };
        if !pragmas.is_empty() {
            inner.execute_batch(&pragmas)?;
        }
        info!(
            path = ?config.path,
            pragmas = config.pragmas.len(),
            "Opened SQLite connection"
        );
        Ok(Self {
            inner,
            dialect: SqliteDialect,
            config: config.clone(),
            tx_active: Cell::new(false),
        })
    }

    /// Opens a private in-memory database with default settings.
    pub fn open_in_memory() -> Result<Self> {
        Self::open(&SqliteConfig::in_memory())
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        if self.is_tx() {
            ConnectionState::InTransaction
        } else {
            ConnectionState::Connected
        }
    }

    pub fn is_tx(&self) -> bool {
        self.tx_active.get()
    }

    pub fn supports_tx(&self) -> bool {
        true
    }

    /// Creates or extends `table` to hold `R`.
    pub fn ensure_table<R: Record>(&self, table: &str, keys: &[&str]) -> Result<SyncOutcome> {
        Ok(rowmap_core::ensure_table::<R>(self, table, keys, &self.config.mapper)?)
    }

    pub fn drop_table(&self, table: &str) -> Result<()> {
        Ok(rowmap_core::drop_table(self, table)?)
    }

    /// Executes a write or raw SQL command in autocommit mode.
    pub fn execute(&self, command: &Command, payload: Payload<'_>) -> Result<ExecOutcome> {
        Ok(rowmap_core::execute(self, command, payload)?)
    }

    /// Opens a cursor over a select or raw SQL command.
    pub fn cursor(&self, command: &Command) -> Cursor<'_> {
        Cursor::open(self, command)
    }

    /// Begins a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::State`] if a transaction is already active on this
    /// connection.
    pub fn begin_tx(&self) -> Result<Transaction<'_>> {
        if self.is_tx() {
            return Err(Error::State(
                "already in transaction mode, commit or rollback first".to_string(),
            )
            .into());
        }
        let tx = self.inner.unchecked_transaction()?;
        self.tx_active.set(true);
        debug!("Began transaction");
        Ok(Transaction::new(self, tx))
    }

    pub(crate) fn end_tx(&self) {
        self.tx_active.set(false);
    }

    pub(crate) fn raw(&self) -> &rusqlite::Connection {
        &self.inner
    }

    /// Closes the connection, reporting any error from SQLite.
    pub fn close(self) -> Result<()> {
        self.inner.close().map_err(|(_, e)| e)?;
        Ok(())
    }
}

impl Session for Connection {
    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn run(&self, sql: &str) -> std::result::Result<usize, DriverError> {
        run_statement(&self.inner, sql)
    }

    fn run_script(&self, sql: &str) -> std::result::Result<(), DriverError> {
        Ok(self.inner.execute_batch(sql)?)
    }

    fn query(&self, sql: &str) -> std::result::Result<Box<dyn ResultSet + '_>, DriverError> {
        Ok(Box::new(open_rows(&self.inner, sql)?))
    }

    fn in_transaction(&self) -> bool {
        self.is_tx()
    }
}
