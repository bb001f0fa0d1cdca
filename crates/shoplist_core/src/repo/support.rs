//! Row mapping and query helpers shared by the SQLite repositories.

use crate::db::migrations::latest_version;
use crate::db::schema::TableDef;
use crate::db::{missing_checks, table_columns, table_exists};
use crate::model::{EntityId, Record};
use crate::repo::error::{RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

/// Current time in epoch milliseconds, evaluated by SQLite.
pub(crate) const NOW_MS_SQL: &str = "(CAST(strftime('%s', 'now') AS INTEGER) * 1000)";

/// Verifies that `conn` carries the migrated schema for `tables`.
pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    tables: &[&'static TableDef],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in tables {
        if !table_exists(conn, table.name)? {
            return Err(RepoError::MissingRequiredTable(table.name));
        }
        let existing = table_columns(conn, table.name)?;
        for column in table.column_names() {
            if !existing.iter().any(|name| name == column) {
                return Err(RepoError::MissingRequiredColumn {
                    table: table.name,
                    column,
                });
            }
        }
        if let Some(constraint) = missing_checks(conn, table)?.into_iter().next() {
            return Err(RepoError::MissingRequiredConstraint {
                table: table.name,
                constraint,
            });
        }
    }

    Ok(())
}

/// Reads the standard columns of one row.
pub(crate) fn parse_record(row: &Row<'_>, table: &str) -> RepoResult<Record> {
    let id_text: String = row.get("id")?;
    Ok(Record {
        id: parse_uuid(&id_text, table, "id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        deleted_at: row.get("deleted_at")?,
    })
}

pub(crate) fn parse_uuid(value: &str, table: &str, column: &str) -> RepoResult<EntityId> {
    Uuid::parse_str(value).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{value}` in {table}.{column}"))
    })
}

pub(crate) fn parse_optional_uuid(
    row: &Row<'_>,
    table: &str,
    column: &str,
) -> RepoResult<Option<EntityId>> {
    match row.get::<_, Option<String>>(column)? {
        Some(value) => Ok(Some(parse_uuid(&value, table, column)?)),
        None => Ok(None),
    }
}

/// Assigns a fresh identity to records that have none yet.
pub(crate) fn assign_id(record: &mut Record) {
    if record.is_new() {
        record.id = Uuid::new_v4();
    }
}

/// Reloads storage-assigned timestamps into `record`.
pub(crate) fn refresh_record(conn: &Connection, table: &str, record: &mut Record) -> RepoResult<()> {
    let (created_at, updated_at, deleted_at): (i64, i64, Option<i64>) = conn.query_row(
        &format!("SELECT created_at, updated_at, deleted_at FROM {table} WHERE id = ?1;"),
        [record.id.to_string()],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;
    record.created_at = created_at;
    record.updated_at = updated_at;
    record.deleted_at = deleted_at;
    Ok(())
}

/// Tombstones one active row. Returns `NotFound` when the row is missing or
/// already deleted.
pub(crate) fn soft_delete_row(
    conn: &Connection,
    table: &'static str,
    entity: &'static str,
    id: EntityId,
) -> RepoResult<()> {
    let changed = conn.execute(
        &format!(
            "UPDATE {table}
             SET
                deleted_at = {NOW_MS_SQL},
                updated_at = {NOW_MS_SQL}
             WHERE id = ?1
               AND deleted_at IS NULL;"
        ),
        params![id.to_string()],
    )?;

    if changed == 0 {
        return Err(RepoError::NotFound { entity, id });
    }

    Ok(())
}

/// Returns whether a row with `id` exists in `table`. Tombstoned rows count
/// only when `include_deleted`.
pub(crate) fn row_exists(
    conn: &Connection,
    table: &str,
    id: EntityId,
    include_deleted: bool,
) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        &format!(
            "SELECT EXISTS(
                SELECT 1
                FROM {table}
                WHERE id = ?1
                  AND (?2 = 1 OR deleted_at IS NULL)
            );"
        ),
        params![id.to_string(), include_deleted],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Appends `LIMIT`/`OFFSET` clauses with bound values.
pub(crate) fn push_pagination(
    sql: &mut String,
    bind_values: &mut Vec<Value>,
    limit: Option<u32>,
    offset: u32,
) {
    if let Some(limit) = limit {
        sql.push_str(" LIMIT ?");
        bind_values.push(Value::Integer(i64::from(limit)));
        if offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(Value::Integer(i64::from(offset)));
        }
    } else if offset > 0 {
        sql.push_str(" LIMIT -1 OFFSET ?");
        bind_values.push(Value::Integer(i64::from(offset)));
    }
}
