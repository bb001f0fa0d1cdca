//! Schema migration executor driven by the table registry.
//!
//! # Responsibility
//! - Create missing tables, add missing columns and indexes.
//! - Track the applied schema version via `PRAGMA user_version`.
//!
//! # Invariants
//! - Running migrations any number of times never fails on an up-to-date
//!   database and never duplicates structures.
//! - A database stamped with a newer version than this binary knows is
//!   rejected before any DDL runs.
//! - All DDL of one run is applied in a single transaction.
//! - A table whose stored definition lacks a declared check constraint is
//!   rebuilt with the declared definition; rows that violate the rule fail
//!   the run.

use crate::db::schema::{TableDef, TABLES};
use crate::db::{missing_checks, table_columns, table_exists, DbError, DbResult};
use log::{info, warn};
use rusqlite::Connection;

/// Schema version stamped after a successful run.
const SCHEMA_VERSION: u32 = 1;

/// Structures created or altered by one [`ensure_schema`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaReport {
    pub created_tables: Vec<&'static str>,
    pub added_columns: Vec<(&'static str, &'static str)>,
    /// Tables recreated to restore missing check constraints.
    pub rebuilt_tables: Vec<&'static str>,
}

impl SchemaReport {
    /// Returns whether the run changed nothing.
    pub fn is_noop(&self) -> bool {
        self.created_tables.is_empty()
            && self.added_columns.is_empty()
            && self.rebuilt_tables.is_empty()
    }
}

/// Returns the latest schema version known by this binary.
pub fn latest_version() -> u32 {
    SCHEMA_VERSION
}

/// Ensures every registered table exists with its declared columns,
/// constraints and indexes.
///
/// Existing tables are altered by adding missing columns; columns are never
/// dropped. A table missing a declared check constraint is rebuilt, which
/// requires foreign key enforcement to be off for the connection
/// ([`apply_migrations`] takes care of that).
pub fn ensure_schema(conn: &Connection) -> DbResult<SchemaReport> {
    let mut report = SchemaReport::default();
    for table in TABLES {
        ensure_table(conn, table, &mut report)?;
    }
    Ok(report)
}

/// Applies the schema to the provided connection and stamps its version.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<SchemaReport> {
    let current_version = current_user_version(conn)?;
    let latest = latest_version();

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    let foreign_keys_on: bool = conn.query_row("PRAGMA foreign_keys;", [], |row| row.get(0))?;
    if foreign_keys_on {
        conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
    }
    let result = migrate_in_transaction(conn, current_version, latest);
    if foreign_keys_on {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    }
    let report = result?;

    info!(
        "event=schema_migrate module=db status=ok from_version={} to_version={} created_tables={} added_columns={} rebuilt_tables={}",
        current_version,
        latest,
        report.created_tables.len(),
        report.added_columns.len(),
        report.rebuilt_tables.len()
    );
    Ok(report)
}

/// Reads the schema version stamped on the database.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

fn migrate_in_transaction(
    conn: &mut Connection,
    current_version: u32,
    latest: u32,
) -> DbResult<SchemaReport> {
    let tx = conn.transaction()?;
    let report = ensure_schema(&tx)?;
    if !report.rebuilt_tables.is_empty() {
        ensure_foreign_keys_intact(&tx)?;
    }
    if current_version != latest {
        tx.execute_batch(&format!("PRAGMA user_version = {latest};"))?;
    }
    tx.commit()?;
    Ok(report)
}

fn ensure_table(
    conn: &Connection,
    table: &'static TableDef,
    report: &mut SchemaReport,
) -> DbResult<()> {
    if !table_exists(conn, table.name)? {
        conn.execute_batch(&table.create_sql())?;
        report.created_tables.push(table.name);
    } else if !missing_checks(conn, table)?.is_empty() {
        rebuild_table(conn, table)?;
        report.rebuilt_tables.push(table.name);
    } else {
        let existing = table_columns(conn, table.name)?;
        for column in table.all_columns() {
            if existing.iter().any(|name| name == column.name) {
                continue;
            }
            conn.execute_batch(&format!(
                "ALTER TABLE {} ADD COLUMN {};",
                table.name,
                column.to_sql()
            ))?;
            report.added_columns.push((table.name, column.name));
        }
    }

    for index in table.indexes {
        conn.execute_batch(&index.create_sql(table.name))?;
    }

    Ok(())
}

/// Recreates `table` from its declaration and copies the shared columns.
/// Indexes are recreated by the caller.
fn rebuild_table(conn: &Connection, table: &'static TableDef) -> DbResult<()> {
    let missing = missing_checks(conn, table)?;
    warn!(
        "event=schema_rebuild module=db status=start table={} missing_checks={}",
        table.name,
        missing.join(",")
    );

    let existing = table_columns(conn, table.name)?;
    let shared = table
        .all_columns()
        .filter(|column| existing.iter().any(|name| name == column.name))
        .map(|column| column.name)
        .collect::<Vec<_>>()
        .join(", ");
    let staging = format!("{}__rebuild", table.name);

    conn.execute_batch(&format!(
        "DROP TABLE IF EXISTS {staging};
         {create}
         INSERT INTO {staging} ({shared}) SELECT {shared} FROM {name};
         DROP TABLE {name};
         ALTER TABLE {staging} RENAME TO {name};",
        create = table.create_sql_as(&staging),
        name = table.name,
    ))?;
    Ok(())
}

fn ensure_foreign_keys_intact(conn: &Connection) -> DbResult<()> {
    let mut stmt = conn.prepare("PRAGMA foreign_key_check;")?;
    let mut rows = stmt.query([])?;
    let mut first_table: Option<String> = None;
    let mut violations = 0usize;
    while let Some(row) = rows.next()? {
        if first_table.is_none() {
            first_table = Some(row.get(0)?);
        }
        violations += 1;
    }

    match first_table {
        Some(table) => Err(DbError::ForeignKeyCheckFailed { table, violations }),
        None => Ok(()),
    }
}
