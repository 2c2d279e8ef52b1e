//! Conversions between rusqlite rows and core raw cells.
//!
//! Every statement is run through these helpers, whether issued on a bare
//! connection or inside a transaction (which derefs to its connection).

use ouroboros::self_referencing;
use rowmap_core::{DriverError, RawCell, ResultSet};
use rusqlite::types::ValueRef;
use rusqlite::{Rows, Statement};

/// Converts a borrowed SQLite value into an owned raw cell.
pub(crate) fn raw_cell(value: ValueRef<'_>) -> RawCell {
    match value {
        ValueRef::Null => RawCell::Null,
        ValueRef::Integer(v) => RawCell::Integer(v),
        ValueRef::Real(v) => RawCell::Real(v),
        ValueRef::Text(bytes) => RawCell::Text(bytes.to_vec()),
        ValueRef::Blob(bytes) => RawCell::Blob(bytes.to_vec()),
    }
}

/// Runs one statement and returns the number of changed rows.
///
/// Statements that produce rows are stepped to completion and report zero
/// changes.
pub(crate) fn run_statement(conn: &rusqlite::Connection, sql: &str) -> Result<usize, DriverError> {
    let mut stmt = conn.prepare(sql)?;
    if stmt.column_count() > 0 {
        let mut rows = stmt.query([])?;
        while rows.next()?.is_some() {}
        return Ok(0);
    }
    Ok(stmt.execute([])?)
}

#[self_referencing]
struct LiveRows<'conn> {
    stmt: Statement<'conn>,
    #[borrows(mut stmt)]
    #[not_covariant]
    rows: Rows<'this>,
}

/// A result set that steps the prepared statement one row per
/// [`next_row`](ResultSet::next_row) call.
///
/// Errors SQLite raises while stepping a later row surface from that call,
/// after the earlier rows were already handed out.
pub(crate) struct StreamingRows<'conn> {
    columns: Vec<String>,
    live: LiveRows<'conn>,
}

impl ResultSet for StreamingRows<'_> {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Vec<RawCell>>, DriverError> {
        let width = self.columns.len();
        let next = self.live.with_rows_mut(|rows| -> rusqlite::Result<Option<Vec<RawCell>>> {
            let Some(row) = rows.next()? else {
                return Ok(None);
            };
            let mut cells = Vec::with_capacity(width);
            for idx in 0..width {
                cells.push(raw_cell(row.get_ref(idx)?));
            }
            Ok(Some(cells))
        });
        Ok(next?)
    }
}

/// Prepares a query and returns its rows without stepping it.
pub(crate) fn open_rows<'conn>(
    conn: &'conn rusqlite::Connection,
    sql: &str,
) -> Result<StreamingRows<'conn>, DriverError> {
    let stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let live = LiveRows::try_new(stmt, |stmt| stmt.query([]))?;
    Ok(StreamingRows { columns, live })
}
