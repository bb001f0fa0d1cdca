//! SQLite storage bootstrap, schema registry and migration entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the shopping-list core.
//! - Declare the relational schema and apply it idempotently.
//! - Provide savepoint scoping for multi-row writes.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write application data before migrations succeed.

use std::error::Error;
use std::fmt::{Display, Formatter};

use log::warn;
use rusqlite::{Connection, OptionalExtension};

use crate::db::schema::TableDef;

pub mod migrations;
mod open;
pub mod schema;

pub use open::{open_db, open_db_in_memory, open_db_with_config, DEFAULT_BUSY_TIMEOUT};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// Rows left dangling by a table rebuild.
    ForeignKeyCheckFailed {
        table: String,
        violations: usize,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::ForeignKeyCheckFailed { table, violations } => write!(
                f,
                "foreign key check failed after migration: {violations} dangling row(s) in `{table}`"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } | Self::ForeignKeyCheckFailed { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Runs `f` inside a named savepoint.
///
/// Works both on a bare connection (the savepoint then acts as its own
/// transaction) and inside a caller-owned transaction. When `f` fails,
/// every write made since the savepoint is rolled back and the original
/// error is returned.
///
/// `name` must be a plain SQL identifier.
pub fn with_savepoint<T, E, F>(conn: &Connection, name: &str, f: F) -> Result<T, E>
where
    E: From<rusqlite::Error>,
    F: FnOnce(&Connection) -> Result<T, E>,
{
    conn.execute_batch(&format!("SAVEPOINT {name};"))?;
    match f(conn) {
        Ok(value) => {
            conn.execute_batch(&format!("RELEASE SAVEPOINT {name};"))?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = conn.execute_batch(&format!(
                "ROLLBACK TO SAVEPOINT {name}; RELEASE SAVEPOINT {name};"
            )) {
                warn!(
                    "event=savepoint_rollback module=db status=error savepoint={} error={}",
                    name, rollback_err
                );
            }
            Err(err)
        }
    }
}

/// Returns whether `table` exists in the main schema.
pub fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Returns the column names of `table` in declaration order.
pub fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get::<_, String>(1)?);
    }
    Ok(columns)
}

/// Returns the stored `CREATE TABLE` statement of `table`, if it exists.
pub fn table_sql(conn: &Connection, table: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT sql
         FROM sqlite_master
         WHERE type = 'table' AND name = ?1;",
        [table],
        |row| row.get(0),
    )
    .optional()
}

/// Returns the declared check constraints of `table` that the stored table
/// definition does not carry. A missing table reports every check.
pub fn missing_checks(conn: &Connection, table: &TableDef) -> rusqlite::Result<Vec<&'static str>> {
    let stored = table_sql(conn, table.name)?.unwrap_or_default();
    Ok(table
        .check_names()
        .into_iter()
        .filter(|name| !stored.contains(name))
        .collect())
}
