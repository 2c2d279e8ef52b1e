//! SQL dialect strategy for catalog reads and DDL.
//!
//! The schema synchronizer is dialect-agnostic: it asks the [`Dialect`] for
//! the catalog lookup and describe statements, lets it parse describe rows
//! into [`ObservedColumn`]s, and hands it the computed [`AlterOp`]s to
//! render. [`MysqlDialect`] renders the classic shape (information_schema
//! lookup, `DESCRIBE`, a single comma-joined `ALTER TABLE`).

use crate::coerce::to_literal;
use crate::value::Value;

/// A column as reported by the live database.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObservedColumn {
    pub name: String,
    pub column_type: String,
    pub nullable: bool,
    /// Key marker, e.g. `"PRI"`; empty when the column is not a key.
    pub key: String,
    pub default: Option<String>,
    pub extra: String,
}

impl ObservedColumn {
    pub fn is_primary_key(&self) -> bool {
        self.key.eq_ignore_ascii_case("PRI")
    }
}

/// One change emitted by the synchronizer for an existing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlterOp {
    /// Column absent from the live table.
    Add { column: String, column_type: String },
    /// Column present with a different type.
    Modify { column: String, column_type: String },
}

impl AlterOp {
    pub fn column(&self) -> &str {
        match self {
            AlterOp::Add { column, .. } | AlterOp::Modify { column, .. } => column,
        }
    }

    pub fn column_type(&self) -> &str {
        match self {
            AlterOp::Add { column_type, .. } | AlterOp::Modify { column_type, .. } => column_type,
        }
    }
}

/// SQL syntax strategy for a database engine.
pub trait Dialect: Send + Sync {
    fn name(&self) -> &str;

    /// Query returning the names of base tables matching `table`
    /// case-insensitively, first column.
    fn table_lookup_sql(&self, table: &str) -> String;

    /// Query describing the live columns of `table`.
    fn describe_sql(&self, table: &str) -> String;

    /// Parses one describe row, already normalized to text.
    fn observed_column(&self, columns: &[String], row: &[String]) -> Option<ObservedColumn>;

    /// Whether a live column type already satisfies the desired one.
    fn same_type(&self, observed: &str, desired: &str) -> bool {
        observed.trim().eq_ignore_ascii_case(desired.trim())
    }

    /// Renders the DDL unit applying `ops` to `table`.
    ///
    /// `observed` is the live column list, for engines that must rebuild
    /// the table to change a column type.
    fn alter_sql(&self, table: &str, ops: &[AlterOp], observed: &[ObservedColumn]) -> String;

    fn drop_table_sql(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {table}")
    }
}

/// Looks up a describe cell by column name, falling back to its position.
pub fn describe_cell<'a>(
    columns: &[String],
    row: &'a [String],
    name: &str,
    position: usize,
) -> Option<&'a str> {
    columns
        .iter()
        .position(|c| c.eq_ignore_ascii_case(name))
        .or(Some(position))
        .and_then(|idx| row.get(idx))
        .map(String::as_str)
}

/// MySQL/MariaDB dialect.
#[derive(Debug, Clone, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for MysqlDialect {
    fn name(&self) -> &str {
        "mysql"
    }

    fn table_lookup_sql(&self, table: &str) -> String {
        format!(
            "SELECT table_name FROM information_schema.TABLES t \
             WHERE table_type='BASE TABLE' AND lower(table_name)=lower({})",
            to_literal(&Value::from(table))
        )
    }

    fn describe_sql(&self, table: &str) -> String {
        format!("DESCRIBE {table}")
    }

    fn observed_column(&self, columns: &[String], row: &[String]) -> Option<ObservedColumn> {
        let name = describe_cell(columns, row, "Field", 0)?;
        Some(ObservedColumn {
            name: name.to_string(),
            column_type: describe_cell(columns, row, "Type", 1)?.to_string(),
            nullable: describe_cell(columns, row, "Null", 2)
                .is_some_and(|v| v.eq_ignore_ascii_case("YES")),
            key: describe_cell(columns, row, "Key", 3).unwrap_or_default().to_string(),
            default: describe_cell(columns, row, "Default", 4)
                .filter(|v| !v.is_empty())
                .map(String::from),
            extra: describe_cell(columns, row, "Extra", 5).unwrap_or_default().to_string(),
        })
    }

    /// `DESCRIBE` reports `double` for `REAL` and, before MySQL 8.0.19,
    /// integer display widths such as `int(11)`.
    fn same_type(&self, observed: &str, desired: &str) -> bool {
        mysql_canonical_type(observed) == mysql_canonical_type(desired)
    }

    fn alter_sql(&self, table: &str, ops: &[AlterOp], _observed: &[ObservedColumn]) -> String {
        let fragments: Vec<String> = ops
            .iter()
            .map(|op| match op {
                AlterOp::Add {
                    column,
                    column_type,
                } => format!("ADD {column} {column_type}"),
                AlterOp::Modify {
                    column,
                    column_type,
                } => format!("MODIFY {column} {column_type}"),
            })
            .collect();
        format!("ALTER TABLE {table} {}", fragments.join(", "))
    }
}

fn mysql_canonical_type(column_type: &str) -> String {
    let lowered = column_type.trim().to_ascii_lowercase();
    let (base, width) = match lowered.split_once('(') {
        Some((base, rest)) => (base.trim_end(), rest.strip_suffix(')')),
        None => (lowered.as_str(), None),
    };
    match (base, width) {
        ("real" | "double" | "double precision", _) => "double".to_string(),
        ("int" | "integer", _) => "int".to_string(),
        ("tinyint", Some("1")) => "tinyint(1)".to_string(),
        ("tinyint" | "smallint" | "mediumint" | "bigint", _) => base.to_string(),
        _ => lowered,
    }
}
