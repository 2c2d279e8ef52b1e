//! Command execution.
//!
//! Resolves a [`Command`] into literal SQL and runs it on a [`Session`].
//! Write commands take their field names and literal values from the
//! payload's data, optionally restricted to the command's field allow-list,
//! and substitute them into the statement template.
//!
//! [`CommandKind::Save`] is a composite: it counts the rows matching the
//! filter and re-dispatches as an insert when there are none, an update
//! otherwise. The check and the write are separate round trips, so
//! concurrent writers can race between them.

use tracing::debug;

use crate::coerce::to_literal;
use crate::command::{Command, CommandKind, FIELDS, FIELDVALUES, Query, VALUES};
use crate::error::{Error, Result};
use crate::record::{Persist, names_match};
use crate::session::{Session, query_count};

/// Input of a write command.
#[derive(Clone, Copy, Default)]
pub struct Payload<'a> {
    pub data: Option<&'a dyn Persist>,
}

impl<'a> Payload<'a> {
    /// Payload without data, for deletes and selects.
    pub fn none() -> Self {
        Self { data: None }
    }

    pub fn data(data: &'a dyn Persist) -> Self {
        Self { data: Some(data) }
    }
}

/// Result of an executed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutcome {
    /// Kind that actually ran; a save reports `Insert` or `Update`.
    pub kind: CommandKind,
    /// Final SQL text.
    pub sql: String,
    /// Rows affected, as reported by the database.
    pub affected: usize,
}

/// Executes a non-cursor command.
///
/// # Errors
///
/// - [`Error::Validation`] if the command has no text (except save), if a
///   command other than select or delete has no data, or if a save has no
///   filter.
/// - [`Error::Execution`] with the SQL text if the database rejects the
///   statement.
pub fn execute(session: &dyn Session, command: &Command, payload: Payload<'_>) -> Result<ExecOutcome> {
    let kind = command.kind;
    if command.text.is_empty() && kind != CommandKind::Save {
        return Err(Error::Validation("no command".to_string()));
    }

    let pairs = match payload.data {
        Some(data) => field_literals(data, &command.fields),
        None if matches!(kind, CommandKind::Delete | CommandKind::Select) => Vec::new(),
        None => {
            return Err(Error::Validation(
                "non select and delete command should have data".to_string(),
            ));
        }
    };

    let sql = match kind {
        CommandKind::Save => return save(session, command, payload),
        CommandKind::Insert => {
            let (names, values): (Vec<&str>, Vec<&str>) =
                pairs.iter().map(|(n, v)| (n.as_str(), v.as_str())).unzip();
            command
                .text
                .replace(FIELDS, &names.join(","))
                .replace(VALUES, &values.join(","))
        }
        CommandKind::Update => {
            let assignments: Vec<String> = pairs.iter().map(|(n, v)| format!("{n}={v}")).collect();
            command.text.replace(FIELDVALUES, &assignments.join(","))
        }
        CommandKind::Delete | CommandKind::Sql | CommandKind::Select => command.text.clone(),
    };

    debug!(
        kind = %kind,
        table = %command.table,
        in_transaction = session.in_transaction(),
        sql = %sql,
        "Executing command"
    );
    let affected = session.run(&sql).map_err(|e| Error::execution(&sql, e))?;
    Ok(ExecOutcome { kind, sql, affected })
}

fn save(session: &dyn Session, command: &Command, payload: Payload<'_>) -> Result<ExecOutcome> {
    let Some(filter) = command.filter.clone() else {
        return Err(Error::Validation(
            "save operations should have filter".to_string(),
        ));
    };

    let lookup = Query::table(&command.table).filter(filter.clone()).select();
    let existing = query_count(session, &lookup.count_command().text)?;

    let query = Query::table(&command.table).filter(filter);
    let dispatched = if existing == 0 {
        query.insert()
    } else {
        query.update()
    };
    debug!(
        table = %command.table,
        existing,
        dispatched = %dispatched.kind,
        "Resolved save"
    );
    execute(session, &dispatched, payload)
}

/// Field names and literal values of `data`, restricted to `allow` when
/// non-empty.
///
/// The allow-list is walked in order and each entry emits every matching
/// field under the allow-list spelling, so case-variant duplicates in the
/// allow-list produce duplicate pairs.
pub fn field_literals(data: &dyn Persist, allow: &[String]) -> Vec<(String, String)> {
    let pairs: Vec<(String, String)> = data
        .persisted_fields()
        .into_iter()
        .map(|(name, value)| (name, to_literal(&value)))
        .collect();
    if allow.is_empty() {
        return pairs;
    }

    let mut restricted = Vec::new();
    for wanted in allow {
        for (name, literal) in &pairs {
            if names_match(name, wanted) {
                restricted.push((wanted.clone(), literal.clone()));
            }
        }
    }
    restricted
}
