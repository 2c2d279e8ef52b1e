//! Row materialization over a live result set.
//!
//! A [`Cursor`] wraps the result set of a select (or raw SQL) command and
//! fills caller-owned vectors with records or [`Row`]s. Each raw cell is
//! normalized to text, then coerced: record fields use their declared type
//! as hint, rows use inference.
//!
//! Errors are sticky. Once an operation fails, every later operation on the
//! same cursor returns that error wrapped in [`Error::Cursor`].

use std::sync::Arc;

use tracing::{debug, trace};

use crate::coerce::{coerce, normalize_cell};
use crate::command::{Command, CommandKind};
use crate::error::{Error, Result};
use crate::record::{FieldDescriptor, Record, Row};
use crate::session::{ResultSet, Session, query_count};
use crate::value::RawCell;

/// Initial capacity of the fetch buffer, and its growth step.
pub const FETCH_CHUNK: usize = 1000;

/// A destination element kind: a record, a boxed record, or a [`Row`].
///
/// Record impls come from [`impl_record!`](crate::impl_record). A cursor
/// reads [`fields`](Materialize::fields) once per fetch and hands the same
/// slice to every row.
pub trait Materialize: Sized {
    /// Field descriptors matched against result columns. Rows have none.
    fn fields() -> Vec<FieldDescriptor> {
        Vec::new()
    }

    fn materialize(fields: &[FieldDescriptor], columns: &[String], cells: Vec<RawCell>) -> Result<Self>;
}

impl Materialize for Row {
    fn materialize(_fields: &[FieldDescriptor], columns: &[String], cells: Vec<RawCell>) -> Result<Self> {
        serialize_row(columns, cells)
    }
}

/// Writes one result row into `dest`.
///
/// `fields` are the descriptors of `R`. Columns are matched to them by
/// storage alias, ignoring case; unmatched columns are skipped.
///
/// # Errors
///
/// Returns [`Error::Coercion`] naming the column whose text could not be
/// converted to the field type.
pub fn serialize_record<R: Record>(
    dest: &mut R,
    fields: &[FieldDescriptor],
    columns: &[String],
    cells: Vec<RawCell>,
) -> Result<()> {
    for (name, cell) in columns.iter().zip(cells) {
        let Some(field) = fields.iter().find(|f| f.matches(name)) else {
            continue;
        };
        let text = normalize_cell(cell);
        let value = coerce(&text, &field.type_name).map_err(|source| Error::Coercion {
            column: name.clone(),
            source,
        })?;
        dest.assign(&field.logical_name, value)
            .map_err(|source| Error::Coercion {
                column: name.clone(),
                source,
            })?;
    }
    Ok(())
}

/// Builds a [`Row`] from one result row, inferring every value's type.
pub fn serialize_row(columns: &[String], cells: Vec<RawCell>) -> Result<Row> {
    let mut row = Row::new();
    for (name, cell) in columns.iter().zip(cells) {
        let text = normalize_cell(cell);
        let value = coerce(&text, "").map_err(|source| Error::Coercion {
            column: name.clone(),
            source,
        })?;
        row.set(name.clone(), value);
    }
    Ok(row)
}

/// Stateful handle over a result set.
///
/// Dropping the cursor releases the result set; [`close`](Self::close)
/// does the same explicitly.
pub struct Cursor<'s> {
    session: &'s dyn Session,
    rows: Option<Box<dyn ResultSet + 's>>,
    command: Command,
    error: Option<Arc<Error>>,
    eof: bool,
}

impl<'s> Cursor<'s> {
    /// Runs a select or raw SQL command and wraps its result set.
    ///
    /// Never fails directly: a command of the wrong kind, an empty command,
    /// or a failing query leaves the cursor in its sticky error state,
    /// visible through [`error`](Self::error).
    pub fn open(session: &'s dyn Session, command: &Command) -> Self {
        let mut cursor = Self {
            session,
            rows: None,
            command: command.clone(),
            error: None,
            eof: false,
        };

        if !matches!(command.kind, CommandKind::Select | CommandKind::Sql) {
            cursor.fail(Error::Validation(
                "cursor is used for only select command".to_string(),
            ));
            return cursor;
        }
        if command.text.is_empty() {
            cursor.fail(Error::Validation("no command".to_string()));
            return cursor;
        }

        debug!(
            table = %command.table,
            in_transaction = session.in_transaction(),
            sql = %command.text,
            "Opening cursor"
        );
        match session.query(&command.text) {
            Ok(rows) => cursor.rows = Some(rows),
            Err(e) => {
                cursor.fail(Error::execution(&command.text, e));
            }
        }
        cursor
    }

    /// The sticky error, if any operation has failed.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_deref()
    }

    /// `true` once the result set reported end of data.
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Column names of the result set.
    pub fn columns(&self) -> &[String] {
        self.rows.as_ref().map(|rows| rows.columns()).unwrap_or(&[])
    }

    /// Reads the remaining rows into `dest`, replacing its contents.
    ///
    /// `batch_hint` is accepted for callers issuing bounded fetches but is
    /// not enforced: every remaining row is read. End of data stops without
    /// error; an iteration or coercion failure leaves `dest` untouched and
    /// becomes the cursor's sticky error.
    pub fn fetch<T: Materialize>(&mut self, dest: &mut Vec<T>, batch_hint: usize) -> Result<()> {
        self.check()?;
        trace!(batch_hint, "Fetching rows");
        let outcome = match self.rows.as_mut() {
            Some(rows) => drain(rows.as_mut()),
            None => Err(Error::State("cursor is closed".to_string())),
        };
        match outcome {
            Ok((buffer, eof)) => {
                self.eof = eof;
                trace!(rows = buffer.len(), "Fetched rows");
                *dest = buffer;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Reads the next row, or `None` at end of data.
    pub fn fetch_one<T: Materialize>(&mut self) -> Result<Option<T>> {
        self.check()?;
        let outcome = match self.rows.as_mut() {
            Some(rows) => next_item(rows.as_mut()),
            None => Err(Error::State("cursor is closed".to_string())),
        };
        match outcome {
            Ok(item) => {
                self.eof = item.is_none();
                Ok(item)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Counts the rows matching the command, independent of the cursor
    /// position.
    pub fn count(&mut self) -> Result<usize> {
        self.check()?;
        let sql = self.command.count_command().text;
        match query_count(self.session, &sql) {
            Ok(count) => Ok(count),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Releases the result set.
    pub fn close(mut self) {
        self.rows = None;
    }

    fn check(&self) -> Result<()> {
        match &self.error {
            Some(e) => Err(Error::Cursor(Arc::clone(e))),
            None => Ok(()),
        }
    }

    fn fail(&mut self, error: Error) -> Error {
        let shared = Arc::new(error);
        self.error = Some(Arc::clone(&shared));
        Error::Cursor(shared)
    }
}

fn next_item<T: Materialize>(rows: &mut dyn ResultSet) -> Result<Option<T>> {
    let Some(cells) = rows.next_row().map_err(Error::Iteration)? else {
        return Ok(None);
    };
    T::materialize(&T::fields(), rows.columns(), cells).map(Some)
}

/// Reads every remaining row, growing the buffer in steps of
/// [`FETCH_CHUNK`] and trimming it to the exact length at the end.
fn drain<T: Materialize>(rows: &mut dyn ResultSet) -> Result<(Vec<T>, bool)> {
    let fields = T::fields();
    let columns = rows.columns().to_vec();
    let mut buffer: Vec<T> = Vec::with_capacity(FETCH_CHUNK);
    let mut index = 0usize;
    while let Some(cells) = rows.next_row().map_err(Error::Iteration)? {
        if index % FETCH_CHUNK == 0 {
            buffer.reserve(FETCH_CHUNK);
        }
        buffer.push(T::materialize(&fields, &columns, cells)?);
        index += 1;
    }
    buffer.shrink_to_fit();
    Ok((buffer, true))
}
