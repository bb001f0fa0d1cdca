//! Store repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over `stores` storage.
//! - Expose row helpers reused by the item repository for the one-to-one
//!   item/store association.
//!
//! # Invariants
//! - `stores.name` non-emptiness is enforced by `chk_stores_name`.
//! - Default reads exclude soft-deleted rows.

use crate::db::schema::STORES;
use crate::model::{Entity, EntityId, Store};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::support::{
    assign_id, ensure_connection_ready, parse_optional_uuid, parse_record, push_pagination,
    refresh_record, soft_delete_row, NOW_MS_SQL,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const STORE_SELECT_SQL: &str = "SELECT
    id,
    created_at,
    updated_at,
    deleted_at,
    name,
    address,
    item_id
FROM stores";

/// Query options for listing stores.
#[derive(Debug, Clone, Default)]
pub struct StoreListQuery {
    /// Exact name match.
    pub name: Option<String>,
    pub item_id: Option<EntityId>,
    pub include_deleted: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for store CRUD operations.
pub trait StoreRepository {
    fn create_store(&self, store: &mut Store) -> RepoResult<EntityId>;
    fn get_store(&self, id: EntityId, include_deleted: bool) -> RepoResult<Option<Store>>;
    fn list_stores(&self, query: &StoreListQuery) -> RepoResult<Vec<Store>>;
    fn update_store(&self, store: &mut Store) -> RepoResult<()>;
    fn soft_delete_store(&self, id: EntityId) -> RepoResult<()>;
}

/// SQLite-backed store repository.
pub struct SqliteStoreRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStoreRepository<'conn> {
    /// Creates repository from a migrated connection or transaction.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &[&STORES])?;
        Ok(Self { conn })
    }
}

impl StoreRepository for SqliteStoreRepository<'_> {
    fn create_store(&self, store: &mut Store) -> RepoResult<EntityId> {
        let mut staged = store.clone();
        insert_store(self.conn, &mut staged)?;
        *store = staged;
        Ok(store.id())
    }

    fn get_store(&self, id: EntityId, include_deleted: bool) -> RepoResult<Option<Store>> {
        let mut stmt = self.conn.prepare(&format!(
            "{STORE_SELECT_SQL}
             WHERE id = ?1
               AND (?2 = 1 OR deleted_at IS NULL);"
        ))?;

        let mut rows = stmt.query(params![id.to_string(), include_deleted])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_store_row(row)?));
        }

        Ok(None)
    }

    fn list_stores(&self, query: &StoreListQuery) -> RepoResult<Vec<Store>> {
        let mut sql = format!("{STORE_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.include_deleted {
            sql.push_str(" AND deleted_at IS NULL");
        }
        if let Some(name) = query.name.as_ref() {
            sql.push_str(" AND name = ?");
            bind_values.push(Value::Text(name.clone()));
        }
        if let Some(item_id) = query.item_id {
            sql.push_str(" AND item_id = ?");
            bind_values.push(Value::Text(item_id.to_string()));
        }

        sql.push_str(" ORDER BY created_at ASC, rowid ASC");
        push_pagination(&mut sql, &mut bind_values, query.limit, query.offset);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut stores = Vec::new();
        while let Some(row) = rows.next()? {
            stores.push(parse_store_row(row)?);
        }

        Ok(stores)
    }

    fn update_store(&self, store: &mut Store) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE stores
                 SET
                    name = ?1,
                    address = ?2,
                    item_id = ?3,
                    updated_at = {NOW_MS_SQL}
                 WHERE id = ?4
                   AND deleted_at IS NULL;"
            ),
            params![
                store.name.as_str(),
                store.address.as_deref(),
                store.item_id.map(|id| id.to_string()),
                store.id().to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "store",
                id: store.id(),
            });
        }

        refresh_record(self.conn, Store::TABLE, &mut store.record)
    }

    fn soft_delete_store(&self, id: EntityId) -> RepoResult<()> {
        soft_delete_row(self.conn, Store::TABLE, "store", id)
    }
}

/// Inserts one store row and loads its stored timestamps.
pub(crate) fn insert_store(conn: &Connection, store: &mut Store) -> RepoResult<()> {
    assign_id(&mut store.record);
    conn.execute(
        &format!(
            "INSERT INTO stores (
                id,
                created_at,
                updated_at,
                name,
                address,
                item_id
            ) VALUES (?1, {NOW_MS_SQL}, {NOW_MS_SQL}, ?2, ?3, ?4);"
        ),
        params![
            store.id().to_string(),
            store.name.as_str(),
            store.address.as_deref(),
            store.item_id.map(|id| id.to_string()),
        ],
    )?;
    refresh_record(conn, Store::TABLE, &mut store.record)
}

/// Loads the store associated with `item_id`, if any. Active stores win
/// over tombstoned ones, which are only considered when `include_deleted`.
pub(crate) fn load_store_for_item(
    conn: &Connection,
    item_id: EntityId,
    include_deleted: bool,
) -> RepoResult<Option<Store>> {
    let mut stmt = conn.prepare(&format!(
        "{STORE_SELECT_SQL}
         WHERE item_id = ?1
           AND (?2 = 1 OR deleted_at IS NULL)
         ORDER BY deleted_at IS NOT NULL, created_at ASC, rowid ASC
         LIMIT 1;"
    ))?;
    let mut rows = stmt.query(params![item_id.to_string(), include_deleted])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_store_row(row)?));
    }
    Ok(None)
}

fn parse_store_row(row: &Row<'_>) -> RepoResult<Store> {
    Ok(Store {
        record: parse_record(row, Store::TABLE)?,
        name: row.get("name")?,
        address: row.get("address")?,
        item_id: parse_optional_uuid(row, Store::TABLE, "item_id")?,
    })
}
