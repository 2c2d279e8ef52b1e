//! Execution seam between the core and a database client.
//!
//! A [`Session`] is anything that can run SQL text: a bare connection or an
//! explicit transaction handle. Which one a caller passes decides whether a
//! statement runs inside the transaction; there is no hidden ambient state.

use std::collections::VecDeque;

use crate::coerce::normalize_cell;
use crate::dialect::Dialect;
use crate::error::{DriverError, Error, Result};
use crate::value::RawCell;

/// A result set being iterated.
pub trait ResultSet {
    /// Column names, in result order.
    fn columns(&self) -> &[String];

    /// Next row, or `None` at end of data.
    fn next_row(&mut self) -> std::result::Result<Option<Vec<RawCell>>, DriverError>;
}

/// Something that can run SQL text against a database.
pub trait Session {
    fn dialect(&self) -> &dyn Dialect;

    /// Runs one statement and returns the number of affected rows.
    fn run(&self, sql: &str) -> std::result::Result<usize, DriverError>;

    /// Runs a script of one or more statements.
    fn run_script(&self, sql: &str) -> std::result::Result<(), DriverError>;

    /// Runs a query and returns its result set.
    fn query(&self, sql: &str) -> std::result::Result<Box<dyn ResultSet + '_>, DriverError>;

    /// Whether statements on this session run inside a transaction.
    fn in_transaction(&self) -> bool {
        false
    }
}

/// Result set held in memory, drained front to back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BufferedRows {
    columns: Vec<String>,
    rows: VecDeque<Vec<RawCell>>,
}

impl BufferedRows {
    pub fn new(columns: Vec<String>, rows: impl Into<VecDeque<Vec<RawCell>>>) -> Self {
        Self {
            columns,
            rows: rows.into(),
        }
    }

    /// Rows left to iterate.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl ResultSet for BufferedRows {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> std::result::Result<Option<Vec<RawCell>>, DriverError> {
        Ok(self.rows.pop_front())
    }
}

/// Column names and text rows of a fully read result set.
pub type TextRows = (Vec<String>, Vec<Vec<String>>);

/// Runs `sql` and returns every row normalized to text.
pub fn query_text(session: &dyn Session, sql: &str) -> std::result::Result<TextRows, DriverError> {
    let mut rows = session.query(sql)?;
    let columns = rows.columns().to_vec();
    let mut out = Vec::new();
    while let Some(cells) = rows.next_row()? {
        out.push(cells.into_iter().map(normalize_cell).collect());
    }
    Ok((columns, out))
}

/// Runs a `count(*)` query and returns the first cell as a number.
pub fn query_count(session: &dyn Session, sql: &str) -> Result<usize> {
    let (_, rows) = query_text(session, sql).map_err(|e| Error::execution(sql, e))?;
    let cell = rows
        .first()
        .and_then(|row| row.first())
        .map(String::as_str)
        .unwrap_or("0");
    cell.trim()
        .parse::<usize>()
        .map_err(|e| Error::execution(sql, Box::new(e)))
}
