//! Resolved command configuration.
//!
//! A [`Command`] is a read-only bag of settings produced by a query
//! builder and consumed once by the executor or a cursor: the command
//! kind, the statement template, the table, an optional filter and an
//! optional field list. Write templates carry the placeholders
//! [`FIELDS`], [`VALUES`] and [`FIELDVALUES`], which the executor
//! replaces with fragments computed from the payload.

use std::fmt;

use crate::coerce::to_literal;
use crate::value::Value;

/// Placeholder for the comma-joined column list of an insert.
pub const FIELDS: &str = "{{.FIELDS}}";
/// Placeholder for the comma-joined literal list of an insert.
pub const VALUES: &str = "{{.VALUES}}";
/// Placeholder for the `col=value` assignment list of an update.
pub const FIELDVALUES: &str = "{{.FIELDVALUES}}";

/// Kind of statement a command resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Select,
    Insert,
    Update,
    Delete,
    /// Insert when the filter matches nothing, update otherwise.
    Save,
    /// Raw SQL text used as-is.
    Sql,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandKind::Select => "select",
            CommandKind::Insert => "insert",
            CommandKind::Update => "update",
            CommandKind::Delete => "delete",
            CommandKind::Save => "save",
            CommandKind::Sql => "sql",
        };
        f.write_str(name)
    }
}

/// Opaque `WHERE` clause fragment.
///
/// Values are embedded as literals through [`to_literal`]; there is no
/// parameter binding.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter(String);

impl Filter {
    /// Uses `sql` verbatim as the condition.
    pub fn raw(sql: impl Into<String>) -> Self {
        Filter(sql.into())
    }

    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self::compare(field, "=", value.into())
    }

    pub fn ne(field: &str, value: impl Into<Value>) -> Self {
        Self::compare(field, "<>", value.into())
    }

    pub fn gt(field: &str, value: impl Into<Value>) -> Self {
        Self::compare(field, ">", value.into())
    }

    pub fn lt(field: &str, value: impl Into<Value>) -> Self {
        Self::compare(field, "<", value.into())
    }

    fn compare(field: &str, op: &str, value: Value) -> Self {
        Filter(format!("{field} {op} {}", to_literal(&value)))
    }

    pub fn and(self, other: Filter) -> Self {
        Filter(format!("({}) AND ({})", self.0, other.0))
    }

    pub fn or(self, other: Filter) -> Self {
        Filter(format!("({}) OR ({})", self.0, other.0))
    }

    pub fn as_sql(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A resolved command, ready for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub kind: CommandKind,
    /// Statement template; may contain placeholders.
    pub text: String,
    pub table: String,
    pub filter: Option<Filter>,
    /// Select column list, or the allow-list of a write command.
    pub fields: Vec<String>,
}

impl Command {
    /// A raw SQL command, used as-is.
    pub fn sql(text: impl Into<String>) -> Self {
        Self {
            kind: CommandKind::Sql,
            text: text.into(),
            table: String::new(),
            filter: None,
            fields: Vec::new(),
        }
    }

    /// Derives the `count(*)` command over the same table and filter.
    ///
    /// Raw SQL commands without a table are counted as a subquery.
    pub fn count_command(&self) -> Command {
        let text = if self.table.is_empty() {
            format!("SELECT count(*) AS Count FROM ({}) AS counted", self.text)
        } else {
            format!(
                "SELECT count(*) AS Count FROM {}{}",
                self.table,
                where_clause(self.filter.as_ref())
            )
        };
        Command {
            kind: CommandKind::Select,
            text,
            table: self.table.clone(),
            filter: self.filter.clone(),
            fields: vec!["count(*) AS Count".to_string()],
        }
    }
}

fn where_clause(filter: Option<&Filter>) -> String {
    match filter {
        Some(filter) => format!(" WHERE {filter}"),
        None => String::new(),
    }
}

/// Builder producing resolved [`Command`]s for one table.
///
/// # Examples
///
/// ```
/// use rowmap_core::{CommandKind, Filter, Query};
///
/// let cmd = Query::table("people").filter(Filter::eq("id", "e1")).update();
/// assert_eq!(cmd.kind, CommandKind::Update);
/// assert_eq!(cmd.text, "UPDATE people SET {{.FIELDVALUES}} WHERE id = 'e1'");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    table: String,
    filter: Option<Filter>,
}

impl Query {
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            table: name.into(),
            filter: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn select(self) -> Command {
        self.select_fields(&[])
    }

    pub fn select_fields(self, fields: &[&str]) -> Command {
        let columns = if fields.is_empty() {
            "*".to_string()
        } else {
            fields.join(",")
        };
        let text = format!(
            "SELECT {columns} FROM {}{}",
            self.table,
            where_clause(self.filter.as_ref())
        );
        self.build(CommandKind::Select, text, fields)
    }

    pub fn insert(self) -> Command {
        let text = format!("INSERT INTO {} ({FIELDS}) VALUES ({VALUES})", self.table);
        self.build(CommandKind::Insert, text, &[])
    }

    /// Update of every persisted field.
    pub fn update(self) -> Command {
        self.update_fields(&[])
    }

    /// Update restricted to `fields` (case-insensitive).
    pub fn update_fields(self, fields: &[&str]) -> Command {
        let text = format!(
            "UPDATE {} SET {FIELDVALUES}{}",
            self.table,
            where_clause(self.filter.as_ref())
        );
        self.build(CommandKind::Update, text, fields)
    }

    pub fn delete(self) -> Command {
        let text = format!("DELETE FROM {}{}", self.table, where_clause(self.filter.as_ref()));
        self.build(CommandKind::Delete, text, &[])
    }

    /// Insert-or-update keyed by the filter; the text is resolved at execution.
    pub fn save(self) -> Command {
        self.build(CommandKind::Save, String::new(), &[])
    }

    fn build(self, kind: CommandKind, text: String, fields: &[&str]) -> Command {
        Command {
            kind,
            text,
            table: self.table,
            filter: self.filter,
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }
}
