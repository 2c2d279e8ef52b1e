//! SQLite catalog reads and DDL rendering.
//!
//! Tables are looked up in `sqlite_master` and described with
//! `PRAGMA table_info`. SQLite can add columns in place but cannot change a
//! column's type, so the DDL unit depends on the operations:
//!
//! - only additions: one `ALTER TABLE ... ADD COLUMN` per column
//! - any type change: the table is rebuilt through a shadow table named
//!   `{table}__rowmap_sync`, copying every live row
//!
//! Either way the unit is a single script run in one call.

use rowmap_core::{AlterOp, Dialect, ObservedColumn, Value, describe_cell, names_match, to_literal};

/// Suffix of the shadow table used while rebuilding.
pub const SHADOW_SUFFIX: &str = "__rowmap_sync";

/// SQLite dialect.
#[derive(Debug, Clone, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn table_lookup_sql(&self, table: &str) -> String {
        format!(
            "SELECT name FROM sqlite_master WHERE type='table' AND lower(name)=lower({})",
            to_literal(&Value::from(table))
        )
    }

    fn describe_sql(&self, table: &str) -> String {
        format!("PRAGMA table_info({table})")
    }

    fn observed_column(&self, columns: &[String], row: &[String]) -> Option<ObservedColumn> {
        let name = describe_cell(columns, row, "name", 1)?;
        let pk = describe_cell(columns, row, "pk", 5).unwrap_or("0");
        Some(ObservedColumn {
            name: name.to_string(),
            column_type: describe_cell(columns, row, "type", 2)?.to_string(),
            nullable: describe_cell(columns, row, "notnull", 3) != Some("1"),
            key: if pk.is_empty() || pk == "0" {
                String::new()
            } else {
                "PRI".to_string()
            },
            default: describe_cell(columns, row, "dflt_value", 4)
                .filter(|v| !v.is_empty())
                .map(String::from),
            extra: String::new(),
        })
    }

    fn alter_sql(&self, table: &str, ops: &[AlterOp], observed: &[ObservedColumn]) -> String {
        if ops.iter().any(|op| matches!(op, AlterOp::Modify { .. })) {
            return rebuild_sql(table, ops, observed);
        }
        ops.iter()
            .map(|op| {
                format!(
                    "ALTER TABLE {table} ADD COLUMN {} {};",
                    op.column(),
                    op.column_type()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Renders the shadow-table rebuild applying `ops` to `table`.
///
/// The shadow keeps every live column in order, with modified types
/// substituted, followed by the added columns. `NOT NULL`, defaults and the
/// primary key carry over from the live table.
fn rebuild_sql(table: &str, ops: &[AlterOp], observed: &[ObservedColumn]) -> String {
    let shadow = format!("{table}{SHADOW_SUFFIX}");

    let mut definitions: Vec<String> = observed
        .iter()
        .map(|col| {
            let column_type = ops
                .iter()
                .find(|op| matches!(op, AlterOp::Modify { .. }) && names_match(op.column(), &col.name))
                .map(|op| op.column_type())
                .unwrap_or(&col.column_type);
            let mut definition = format!("{} {column_type}", col.name);
            if !col.nullable {
                definition.push_str(" NOT NULL");
            }
            if let Some(default) = &col.default {
                definition.push_str(&format!(" DEFAULT {default}"));
            }
            definition
        })
        .collect();
    definitions.extend(ops.iter().filter_map(|op| match op {
        AlterOp::Add {
            column,
            column_type,
        } => Some(format!("{column} {column_type}")),
        AlterOp::Modify { .. } => None,
    }));

    let keys: Vec<&str> = observed
        .iter()
        .filter(|col| col.is_primary_key())
        .map(|col| col.name.as_str())
        .collect();
    if !keys.is_empty() {
        definitions.push(format!("PRIMARY KEY ({})", keys.join(", ")));
    }

    let copied = observed
        .iter()
        .map(|col| col.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "DROP TABLE IF EXISTS {shadow};\n\
         CREATE TABLE {shadow} (\n{}\n);\n\
         INSERT INTO {shadow} ({copied}) SELECT {copied} FROM {table};\n\
         DROP TABLE {table};\n\
         ALTER TABLE {shadow} RENAME TO {table};",
        definitions.join(",\n")
    )
}
