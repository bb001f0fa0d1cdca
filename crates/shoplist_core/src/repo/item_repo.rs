//! Item repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over `items` storage.
//! - Persist the one-to-one store association together with its item.
//!
//! # Invariants
//! - `items.name` and `items.quantity` rules are enforced by
//!   `chk_items_name` and `chk_items_quantity`.
//! - An item and its store are written atomically.
//! - Soft-deleting an item also tombstones its active store.

use crate::db::schema::{ITEMS, STORES};
use crate::db::with_savepoint;
use crate::model::{Entity, EntityId, Item, Store};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::store_repo::{insert_store, load_store_for_item};
use crate::repo::support::{
    assign_id, ensure_connection_ready, parse_optional_uuid, parse_record, push_pagination,
    refresh_record, soft_delete_row, NOW_MS_SQL,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const ITEM_SELECT_SQL: &str = "SELECT
    id,
    created_at,
    updated_at,
    deleted_at,
    name,
    quantity,
    uom,
    shopping_list_id
FROM items";

/// Query options for listing items.
#[derive(Debug, Clone, Default)]
pub struct ItemListQuery {
    pub shopping_list_id: Option<EntityId>,
    /// Exact name match.
    pub name: Option<String>,
    pub include_deleted: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for item CRUD operations.
pub trait ItemRepository {
    /// Inserts the item and, when present, its store.
    fn create_item(&self, item: &mut Item) -> RepoResult<EntityId>;
    fn get_item(&self, id: EntityId, include_deleted: bool) -> RepoResult<Option<Item>>;
    fn list_items(&self, query: &ItemListQuery) -> RepoResult<Vec<Item>>;
    /// Updates `name`, `quantity`, `uom` and `shopping_list_id`. The
    /// associated store is managed through the store repository.
    fn update_item(&self, item: &mut Item) -> RepoResult<()>;
    fn soft_delete_item(&self, id: EntityId) -> RepoResult<()>;
}

/// SQLite-backed item repository.
pub struct SqliteItemRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteItemRepository<'conn> {
    /// Creates repository from a migrated connection or transaction.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &[&ITEMS, &STORES])?;
        Ok(Self { conn })
    }
}

impl ItemRepository for SqliteItemRepository<'_> {
    fn create_item(&self, item: &mut Item) -> RepoResult<EntityId> {
        let mut staged = item.clone();
        with_savepoint(self.conn, "create_item", |conn| {
            insert_item(conn, &mut staged)
        })?;
        *item = staged;
        Ok(item.id())
    }

    fn get_item(&self, id: EntityId, include_deleted: bool) -> RepoResult<Option<Item>> {
        fetch_item(self.conn, id, include_deleted)
    }

    fn list_items(&self, query: &ItemListQuery) -> RepoResult<Vec<Item>> {
        let mut sql = format!("{ITEM_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.include_deleted {
            sql.push_str(" AND deleted_at IS NULL");
        }
        if let Some(list_id) = query.shopping_list_id {
            sql.push_str(" AND shopping_list_id = ?");
            bind_values.push(Value::Text(list_id.to_string()));
        }
        if let Some(name) = query.name.as_ref() {
            sql.push_str(" AND name = ?");
            bind_values.push(Value::Text(name.clone()));
        }

        sql.push_str(" ORDER BY created_at ASC, rowid ASC");
        push_pagination(&mut sql, &mut bind_values, query.limit, query.offset);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(load_item_row(self.conn, row, query.include_deleted)?);
        }

        Ok(items)
    }

    fn update_item(&self, item: &mut Item) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE items
                 SET
                    name = ?1,
                    quantity = ?2,
                    uom = ?3,
                    shopping_list_id = ?4,
                    updated_at = {NOW_MS_SQL}
                 WHERE id = ?5
                   AND deleted_at IS NULL;"
            ),
            params![
                item.name.as_str(),
                item.quantity,
                item.uom.as_deref(),
                item.shopping_list_id.map(|id| id.to_string()),
                item.id().to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "item",
                id: item.id(),
            });
        }

        refresh_record(self.conn, Item::TABLE, &mut item.record)
    }

    fn soft_delete_item(&self, id: EntityId) -> RepoResult<()> {
        with_savepoint(self.conn, "soft_delete_item", |conn| {
            soft_delete_row(conn, Item::TABLE, "item", id)?;
            conn.execute(
                &format!(
                    "UPDATE stores
                     SET
                        deleted_at = {NOW_MS_SQL},
                        updated_at = {NOW_MS_SQL}
                     WHERE item_id = ?1
                       AND deleted_at IS NULL;"
                ),
                [id.to_string()],
            )?;
            Ok(())
        })
    }
}

/// Inserts one item row plus its store. Callers provide the savepoint.
pub(crate) fn insert_item(conn: &Connection, item: &mut Item) -> RepoResult<()> {
    assign_id(&mut item.record);
    conn.execute(
        &format!(
            "INSERT INTO items (
                id,
                created_at,
                updated_at,
                name,
                quantity,
                uom,
                shopping_list_id
            ) VALUES (?1, {NOW_MS_SQL}, {NOW_MS_SQL}, ?2, ?3, ?4, ?5);"
        ),
        params![
            item.id().to_string(),
            item.name.as_str(),
            item.quantity,
            item.uom.as_deref(),
            item.shopping_list_id.map(|id| id.to_string()),
        ],
    )?;
    refresh_record(conn, Item::TABLE, &mut item.record)?;

    let item_id = item.id();
    if let Some(store) = item.store.as_mut() {
        store.item_id = Some(item_id);
        insert_store(conn, store)?;
    }

    Ok(())
}

/// Loads items owned by `shopping_list_id` in insertion order.
pub(crate) fn load_items_for_list(
    conn: &Connection,
    shopping_list_id: EntityId,
    include_deleted: bool,
) -> RepoResult<Vec<Item>> {
    let mut stmt = conn.prepare(&format!(
        "{ITEM_SELECT_SQL}
         WHERE shopping_list_id = ?1
           AND (?2 = 1 OR deleted_at IS NULL)
         ORDER BY created_at ASC, rowid ASC;"
    ))?;
    let mut rows = stmt.query(params![shopping_list_id.to_string(), include_deleted])?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(load_item_row(conn, row, include_deleted)?);
    }
    Ok(items)
}

/// Loads one item with its store. Deleted-inclusive reads also return a
/// tombstoned store.
pub(crate) fn fetch_item(
    conn: &Connection,
    id: EntityId,
    include_deleted: bool,
) -> RepoResult<Option<Item>> {
    let mut stmt = conn.prepare(&format!(
        "{ITEM_SELECT_SQL}
         WHERE id = ?1
           AND (?2 = 1 OR deleted_at IS NULL);"
    ))?;

    let mut rows = stmt.query(params![id.to_string(), include_deleted])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(load_item_row(conn, row, include_deleted)?));
    }

    Ok(None)
}

fn load_item_row(conn: &Connection, row: &Row<'_>, include_deleted: bool) -> RepoResult<Item> {
    let record = parse_record(row, Item::TABLE)?;
    let store: Option<Store> = load_store_for_item(conn, record.id, include_deleted)?;
    Ok(Item {
        record,
        name: row.get("name")?,
        quantity: row.get("quantity")?,
        uom: row.get("uom")?,
        store,
        shopping_list_id: parse_optional_uuid(row, Item::TABLE, "shopping_list_id")?,
    })
}
