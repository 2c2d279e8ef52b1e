//! Explicit transaction handle.
//!
//! Commands run through a [`Transaction`] are part of it; commands run
//! through the owning [`Connection`] while the handle is alive share the
//! same SQLite connection and therefore land in it as well. Dropping the
//! handle without [`commit`](Transaction::commit) rolls back.

use rowmap_core::{
    Command, Cursor, Dialect, DriverError, ExecOutcome, Payload, Record, ResultSet, Session,
    SyncOutcome,
};
use tracing::debug;

use crate::connection::Connection;
use crate::convert::{open_rows, run_statement};
use crate::error::Result;

/// An active transaction on a [`Connection`].
pub struct Transaction<'c> {
    conn: &'c Connection,
    tx: Option<rusqlite::Transaction<'c>>,
}

impl<'c> Transaction<'c> {
    pub(crate) fn new(conn: &'c Connection, tx: rusqlite::Transaction<'c>) -> Self {
        Self { conn, tx: Some(tx) }
    }

    /// Executes a write or raw SQL command inside the transaction.
    pub fn execute(&self, command: &Command, payload: Payload<'_>) -> Result<ExecOutcome> {
        Ok(rowmap_core::execute(self, command, payload)?)
    }

    /// Opens a cursor that reads inside the transaction.
    pub fn cursor(&self, command: &Command) -> Cursor<'_> {
        Cursor::open(self, command)
    }

    /// Creates or extends `table` inside the transaction.
    pub fn ensure_table<R: Record>(&self, table: &str, keys: &[&str]) -> Result<SyncOutcome> {
        Ok(rowmap_core::ensure_table::<R>(
            self,
            table,
            keys,
            &self.conn.config().mapper,
        )?)
    }

    pub fn commit(mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.commit()?;
            debug!("Committed transaction");
        }
        Ok(())
    }

    pub fn rollback(mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.rollback()?;
            debug!("Rolled back transaction");
        }
        Ok(())
    }

    fn handle(&self) -> &rusqlite::Connection {
        match &self.tx {
            Some(tx) => &**tx,
            None => self.conn.raw(),
        }
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.tx.take().is_some() {
            debug!("Transaction dropped without commit, rolled back");
        }
        self.conn.end_tx();
    }
}

impl Session for Transaction<'_> {
    fn dialect(&self) -> &dyn Dialect {
        self.conn.dialect()
    }

    fn run(&self, sql: &str) -> std::result::Result<usize, DriverError> {
        run_statement(self.handle(), sql)
    }

    fn run_script(&self, sql: &str) -> std::result::Result<(), DriverError> {
        Ok(self.handle().execute_batch(sql)?)
    }

    fn query(&self, sql: &str) -> std::result::Result<Box<dyn ResultSet + '_>, DriverError> {
        Ok(Box::new(open_rows(self.handle(), sql)?))
    }

    fn in_transaction(&self) -> bool {
        true
    }
}
