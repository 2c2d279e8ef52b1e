//! Schema synchronization.
//!
//! Derives the desired table definition from a record's descriptor table
//! and reconciles it with the live schema:
//!
//! - table absent: one `CREATE TABLE` with a column per persisted field
//! - column absent: `ADD`
//! - column type differs: `MODIFY`
//!
//! All `ADD`/`MODIFY` operations are batched into one DDL unit, executed only
//! when there is at least one. Columns present in the table but not in the
//! record are never dropped or renamed, so synchronizing twice issues no DDL
//! the second time.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::config::MapperConfig;
use crate::dialect::{AlterOp, Dialect, ObservedColumn};
use crate::error::{Error, Result, SchemaPhase};
use crate::record::{FieldDescriptor, Record, descriptors, names_match};
use crate::session::{Session, query_text};
use crate::typemap::column_type;

/// What [`ensure_table`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The table was created with this statement.
    Created(String),
    /// The table was altered with this statement.
    Altered(String),
    /// The table already matched.
    Unchanged,
}

/// Ensures `table` exists and has a column for every persisted field of `R`.
///
/// `keys` lists the fields (by name or alias, case-insensitive) that get
/// `NOT NULL PRIMARY KEY` when the table is created.
///
/// # Errors
///
/// Returns [`Error::Schema`] naming the table and the failed phase. No
/// retry or rollback is attempted.
pub fn ensure_table<R: Record>(
    session: &dyn Session,
    table: &str,
    keys: &[&str],
    config: &MapperConfig,
) -> Result<SyncOutcome> {
    let fields = descriptors::<R>(keys);
    ensure_fields(session, table, &fields, config)
}

/// [`ensure_table`] over an explicit descriptor list.
pub fn ensure_fields(
    session: &dyn Session,
    table: &str,
    fields: &[FieldDescriptor],
    config: &MapperConfig,
) -> Result<SyncOutcome> {
    if !table_exists(session, table)? {
        let sql = create_table_sql(table, fields, config);
        debug!(table, sql = %sql, "Creating table");
        session
            .run_script(&sql)
            .map_err(|source| schema_error(table, SchemaPhase::Create, &sql, source))?;
        info!(table, columns = fields.len(), "Created table");
        return Ok(SyncOutcome::Created(sql));
    }

    let observed = describe_table(session, table)?;
    let ops = plan_alter(session.dialect(), fields, &observed, config);
    if ops.is_empty() {
        debug!(table, "Table already synchronized");
        return Ok(SyncOutcome::Unchanged);
    }

    let sql = session.dialect().alter_sql(table, &ops, &observed);
    debug!(table, sql = %sql, "Altering table");
    session
        .run_script(&sql)
        .map_err(|source| schema_error(table, SchemaPhase::Alter, &sql, source))?;
    info!(table, changes = ops.len(), "Altered table");
    Ok(SyncOutcome::Altered(sql))
}

/// Checks the catalog for a table named `table`, ignoring case.
pub fn table_exists(session: &dyn Session, table: &str) -> Result<bool> {
    let sql = session.dialect().table_lookup_sql(table);
    let (_, rows) = query_text(session, &sql)
        .map_err(|source| schema_error(table, SchemaPhase::Lookup, &sql, source))?;
    Ok(rows
        .first()
        .and_then(|row| row.first())
        .is_some_and(|name| names_match(name, table)))
}

/// Reads the live column list of `table`.
pub fn describe_table(session: &dyn Session, table: &str) -> Result<Vec<ObservedColumn>> {
    let dialect = session.dialect();
    let sql = dialect.describe_sql(table);
    let (columns, rows) = query_text(session, &sql)
        .map_err(|source| schema_error(table, SchemaPhase::Describe, &sql, source))?;
    Ok(rows
        .iter()
        .filter_map(|row| dialect.observed_column(&columns, row))
        .collect())
}

/// Drops `table` if it exists.
pub fn drop_table(session: &dyn Session, table: &str) -> Result<()> {
    let sql = session.dialect().drop_table_sql(table);
    debug!(table, "Dropping table");
    session
        .run_script(&sql)
        .map_err(|source| schema_error(table, SchemaPhase::Drop, &sql, source))
}

/// Renders the `CREATE TABLE` statement for `fields`.
///
/// A field-less record renders an empty column list; the database decides
/// whether that is valid.
pub fn create_table_sql(table: &str, fields: &[FieldDescriptor], config: &MapperConfig) -> String {
    let columns: Vec<String> = fields
        .iter()
        .map(|field| {
            let mut column = format!(
                "{} {}",
                field.storage_alias,
                column_type(&field.type_name, config)
            );
            if field.is_key {
                column.push_str(" NOT NULL PRIMARY KEY");
            }
            column
        })
        .collect();
    format!("CREATE TABLE {table} (\n{}\n)", columns.join(",\n"))
}

/// Computes the `ADD`/`MODIFY` operations bringing `observed` up to `fields`.
///
/// Types are compared with [`Dialect::same_type`], since catalogs report
/// them in their own spelling.
pub fn plan_alter(
    dialect: &dyn Dialect,
    fields: &[FieldDescriptor],
    observed: &[ObservedColumn],
    config: &MapperConfig,
) -> Vec<AlterOp> {
    let live: HashMap<String, &ObservedColumn> = observed
        .iter()
        .map(|col| (col.name.to_lowercase(), col))
        .collect();

    fields
        .iter()
        .filter_map(|field| {
            let desired = column_type(&field.type_name, config);
            match live.get(&field.storage_alias.to_lowercase()) {
                None => Some(AlterOp::Add {
                    column: field.storage_alias.clone(),
                    column_type: desired,
                }),
                Some(col) if !dialect.same_type(&col.column_type, &desired) => {
                    Some(AlterOp::Modify {
                        column: field.storage_alias.clone(),
                        column_type: desired,
                    })
                }
                Some(_) => None,
            }
        })
        .collect()
}

fn schema_error(
    table: &str,
    phase: SchemaPhase,
    sql: &str,
    source: crate::error::DriverError,
) -> Error {
    Error::Schema {
        table: table.to_string(),
        phase,
        sql: sql.to_string(),
        source,
    }
}
