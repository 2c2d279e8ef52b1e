//! In-memory session double for unit tests.

use std::cell::RefCell;

use crate::dialect::{Dialect, MysqlDialect};
use crate::error::DriverError;
use crate::session::{BufferedRows, ResultSet, Session};
use crate::value::RawCell;

enum Response {
    Rows(BufferedRows),
    /// Yields the buffered rows, then fails.
    FailAfter(BufferedRows),
}

/// Records every statement and answers queries from canned responses
/// matched by substring.
pub(crate) struct FakeSession {
    dialect: MysqlDialect,
    responses: Vec<(String, Response)>,
    failures: Vec<String>,
    pub executed: RefCell<Vec<String>>,
    pub queried: RefCell<Vec<String>>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self {
            dialect: MysqlDialect,
            responses: Vec::new(),
            failures: Vec::new(),
            executed: RefCell::new(Vec::new()),
            queried: RefCell::new(Vec::new()),
        }
    }

    pub fn respond(mut self, needle: &str, columns: &[&str], rows: Vec<Vec<RawCell>>) -> Self {
        self.responses
            .push((needle.to_string(), Response::Rows(buffered(columns, rows))));
        self
    }

    pub fn respond_then_fail(mut self, needle: &str, columns: &[&str], rows: Vec<Vec<RawCell>>) -> Self {
        self.responses
            .push((needle.to_string(), Response::FailAfter(buffered(columns, rows))));
        self
    }

    /// Any statement or query containing `needle` fails.
    pub fn fail_on(mut self, needle: &str) -> Self {
        self.failures.push(needle.to_string());
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.borrow().clone()
    }

    fn check(&self, sql: &str) -> Result<(), DriverError> {
        match self.failures.iter().find(|needle| sql.contains(needle.as_str())) {
            Some(needle) => Err(format!("forced failure on {needle}").into()),
            None => Ok(()),
        }
    }
}

fn buffered(columns: &[&str], rows: Vec<Vec<RawCell>>) -> BufferedRows {
    BufferedRows::new(columns.iter().map(|c| c.to_string()).collect(), rows)
}

struct FailingRows(BufferedRows);

impl ResultSet for FailingRows {
    fn columns(&self) -> &[String] {
        self.0.columns()
    }

    fn next_row(&mut self) -> Result<Option<Vec<RawCell>>, DriverError> {
        match self.0.next_row()? {
            Some(row) => Ok(Some(row)),
            None => Err("connection reset".into()),
        }
    }
}

impl Session for FakeSession {
    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn run(&self, sql: &str) -> Result<usize, DriverError> {
        self.check(sql)?;
        self.executed.borrow_mut().push(sql.to_string());
        Ok(1)
    }

    fn run_script(&self, sql: &str) -> Result<(), DriverError> {
        self.run(sql).map(|_| ())
    }

    fn query(&self, sql: &str) -> Result<Box<dyn ResultSet + '_>, DriverError> {
        self.check(sql)?;
        self.queried.borrow_mut().push(sql.to_string());
        let response = self
            .responses
            .iter()
            .find(|(needle, _)| sql.contains(needle.as_str()))
            .map(|(_, response)| response);
        Ok(match response {
            Some(Response::Rows(rows)) => Box::new(rows.clone()),
            Some(Response::FailAfter(rows)) => Box::new(FailingRows(rows.clone())),
            None => Box::new(BufferedRows::default()),
        })
    }
}

/// Text cells from string slices.
pub(crate) fn text_row(cells: &[&str]) -> Vec<RawCell> {
    cells.iter().map(|c| RawCell::from(*c)).collect()
}
