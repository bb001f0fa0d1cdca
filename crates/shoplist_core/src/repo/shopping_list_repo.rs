//! Shopping list repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist shopping lists together with their owned items.
//! - Manage list membership (add/remove items).
//!
//! # Invariants
//! - A list and its initial items are created in one atomic unit.
//! - Soft-deleting a list tombstones its active items and their stores in
//!   the same unit.
//! - Default reads return only active lists and active items, the latter
//!   in insertion order.
//! - `name`/`creator` rules are enforced by `chk_shopping_lists_name` and
//!   `chk_shopping_lists_creator`.

use crate::db::schema::{ITEMS, SHOPPING_LISTS, STORES};
use crate::db::with_savepoint;
use crate::model::{Entity, EntityId, Item, ShoppingList};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::item_repo::{fetch_item, insert_item, load_items_for_list};
use crate::repo::support::{
    assign_id, ensure_connection_ready, parse_record, push_pagination, refresh_record,
    row_exists, soft_delete_row, NOW_MS_SQL,
};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const SHOPPING_LIST_SELECT_SQL: &str = "SELECT
    id,
    created_at,
    updated_at,
    deleted_at,
    name,
    creator
FROM shopping_lists";

/// Query options for listing and counting shopping lists.
#[derive(Debug, Clone, Default)]
pub struct ShoppingListQuery {
    /// Exact name match.
    pub name: Option<String>,
    /// Exact creator match.
    pub creator: Option<String>,
    pub include_deleted: bool,
    /// Ignored by [`ShoppingListRepository::count_shopping_lists`].
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for the shopping list aggregate.
pub trait ShoppingListRepository {
    /// Inserts the list and every item in `list.items` atomically.
    fn create_shopping_list(&self, list: &mut ShoppingList) -> RepoResult<EntityId>;
    fn get_shopping_list(
        &self,
        id: EntityId,
        include_deleted: bool,
    ) -> RepoResult<Option<ShoppingList>>;
    fn list_shopping_lists(&self, query: &ShoppingListQuery) -> RepoResult<Vec<ShoppingList>>;
    fn count_shopping_lists(&self, query: &ShoppingListQuery) -> RepoResult<u64>;
    /// Updates `name` and `creator`. Items are managed through
    /// [`Self::add_item`] and [`Self::remove_item`].
    fn update_shopping_list(&self, list: &mut ShoppingList) -> RepoResult<()>;
    /// Attaches `item` to the list.
    ///
    /// An item without a stored row (nil id, or an id never persisted) is
    /// inserted with its store. For a stored item only membership changes;
    /// `item` is then reloaded from storage, discarding unsaved edits.
    fn add_item(&self, list_id: EntityId, item: &mut Item) -> RepoResult<EntityId>;
    /// Detaches an item from the list. The item itself stays active.
    fn remove_item(&self, list_id: EntityId, item_id: EntityId) -> RepoResult<()>;
    fn soft_delete_shopping_list(&self, id: EntityId) -> RepoResult<()>;
}

/// SQLite-backed shopping list repository.
pub struct SqliteShoppingListRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteShoppingListRepository<'conn> {
    /// Creates repository from a migrated connection or transaction.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &[&SHOPPING_LISTS, &ITEMS, &STORES])?;
        Ok(Self { conn })
    }
}

impl ShoppingListRepository for SqliteShoppingListRepository<'_> {
    fn create_shopping_list(&self, list: &mut ShoppingList) -> RepoResult<EntityId> {
        let mut staged = list.clone();
        with_savepoint(self.conn, "create_shopping_list", |conn| {
            insert_shopping_list(conn, &mut staged)
        })?;
        *list = staged;

        debug!(
            "event=shopping_list_create module=repo status=ok id={} items={}",
            list.id(),
            list.items.len()
        );
        Ok(list.id())
    }

    fn get_shopping_list(
        &self,
        id: EntityId,
        include_deleted: bool,
    ) -> RepoResult<Option<ShoppingList>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SHOPPING_LIST_SELECT_SQL}
             WHERE id = ?1
               AND (?2 = 1 OR deleted_at IS NULL);"
        ))?;

        let mut rows = stmt.query(params![id.to_string(), include_deleted])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(load_shopping_list_row(
                self.conn,
                row,
                include_deleted,
            )?));
        }

        Ok(None)
    }

    fn list_shopping_lists(&self, query: &ShoppingListQuery) -> RepoResult<Vec<ShoppingList>> {
        let (mut sql, mut bind_values) = filtered_sql(SHOPPING_LIST_SELECT_SQL, query);
        sql.push_str(" ORDER BY created_at ASC, rowid ASC");
        push_pagination(&mut sql, &mut bind_values, query.limit, query.offset);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut lists = Vec::new();
        while let Some(row) = rows.next()? {
            lists.push(load_shopping_list_row(
                self.conn,
                row,
                query.include_deleted,
            )?);
        }

        Ok(lists)
    }

    fn count_shopping_lists(&self, query: &ShoppingListQuery) -> RepoResult<u64> {
        let (sql, bind_values) = filtered_sql("SELECT COUNT(*) FROM shopping_lists", query);
        let count: i64 =
            self.conn
                .query_row(&sql, params_from_iter(bind_values), |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count `{count}`")))
    }

    fn update_shopping_list(&self, list: &mut ShoppingList) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE shopping_lists
                 SET
                    name = ?1,
                    creator = ?2,
                    updated_at = {NOW_MS_SQL}
                 WHERE id = ?3
                   AND deleted_at IS NULL;"
            ),
            params![
                list.name.as_str(),
                list.creator.as_str(),
                list.id().to_string()
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "shopping list",
                id: list.id(),
            });
        }

        refresh_record(self.conn, ShoppingList::TABLE, &mut list.record)
    }

    fn add_item(&self, list_id: EntityId, item: &mut Item) -> RepoResult<EntityId> {
        let attached = with_savepoint(self.conn, "add_item", |conn| {
            if !row_exists(conn, ShoppingList::TABLE, list_id, false)? {
                return Err(RepoError::NotFound {
                    entity: "shopping list",
                    id: list_id,
                });
            }

            if item.record.is_new() || !row_exists(conn, Item::TABLE, item.id(), true)? {
                let mut staged = item.clone();
                staged.shopping_list_id = Some(list_id);
                insert_item(conn, &mut staged)?;
                return Ok(staged);
            }

            let changed = conn.execute(
                &format!(
                    "UPDATE items
                     SET
                        shopping_list_id = ?1,
                        updated_at = {NOW_MS_SQL}
                     WHERE id = ?2
                       AND deleted_at IS NULL;"
                ),
                params![list_id.to_string(), item.id().to_string()],
            )?;
            let reloaded = if changed == 0 {
                None
            } else {
                fetch_item(conn, item.id(), false)?
            };
            reloaded.ok_or(RepoError::NotFound {
                entity: "item",
                id: item.id(),
            })
        })?;

        *item = attached;
        Ok(item.id())
    }

    fn remove_item(&self, list_id: EntityId, item_id: EntityId) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE items
                 SET
                    shopping_list_id = NULL,
                    updated_at = {NOW_MS_SQL}
                 WHERE id = ?1
                   AND shopping_list_id = ?2
                   AND deleted_at IS NULL;"
            ),
            params![item_id.to_string(), list_id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "item",
                id: item_id,
            });
        }

        Ok(())
    }

    fn soft_delete_shopping_list(&self, id: EntityId) -> RepoResult<()> {
        let cascaded = with_savepoint(self.conn, "soft_delete_shopping_list", |conn| {
            soft_delete_row(conn, ShoppingList::TABLE, "shopping list", id)?;
            conn.execute(
                &format!(
                    "UPDATE stores
                     SET
                        deleted_at = {NOW_MS_SQL},
                        updated_at = {NOW_MS_SQL}
                     WHERE deleted_at IS NULL
                       AND item_id IN (
                         SELECT id
                         FROM items
                         WHERE shopping_list_id = ?1
                           AND deleted_at IS NULL
                       );"
                ),
                [id.to_string()],
            )?;
            let items = conn.execute(
                &format!(
                    "UPDATE items
                     SET
                        deleted_at = {NOW_MS_SQL},
                        updated_at = {NOW_MS_SQL}
                     WHERE shopping_list_id = ?1
                       AND deleted_at IS NULL;"
                ),
                [id.to_string()],
            )?;
            Ok::<_, RepoError>(items)
        })?;

        debug!(
            "event=shopping_list_delete module=repo status=ok id={} cascaded_items={}",
            id, cascaded
        );
        Ok(())
    }
}

fn insert_shopping_list(conn: &Connection, list: &mut ShoppingList) -> RepoResult<()> {
    assign_id(&mut list.record);
    conn.execute(
        &format!(
            "INSERT INTO shopping_lists (
                id,
                created_at,
                updated_at,
                name,
                creator
            ) VALUES (?1, {NOW_MS_SQL}, {NOW_MS_SQL}, ?2, ?3);"
        ),
        params![
            list.id().to_string(),
            list.name.as_str(),
            list.creator.as_str()
        ],
    )?;
    refresh_record(conn, ShoppingList::TABLE, &mut list.record)?;

    let list_id = list.id();
    for item in &mut list.items {
        item.shopping_list_id = Some(list_id);
        insert_item(conn, item)?;
    }

    Ok(())
}

fn filtered_sql(select: &str, query: &ShoppingListQuery) -> (String, Vec<Value>) {
    let mut sql = format!("{select} WHERE 1 = 1");
    let mut bind_values: Vec<Value> = Vec::new();

    if !query.include_deleted {
        sql.push_str(" AND deleted_at IS NULL");
    }
    if let Some(name) = query.name.as_ref() {
        sql.push_str(" AND name = ?");
        bind_values.push(Value::Text(name.clone()));
    }
    if let Some(creator) = query.creator.as_ref() {
        sql.push_str(" AND creator = ?");
        bind_values.push(Value::Text(creator.clone()));
    }

    (sql, bind_values)
}

/// Maps one list row. Deleted items are loaded only for deleted-inclusive
/// reads.
fn load_shopping_list_row(
    conn: &Connection,
    row: &Row<'_>,
    include_deleted: bool,
) -> RepoResult<ShoppingList> {
    let record = parse_record(row, ShoppingList::TABLE)?;
    let items = load_items_for_list(conn, record.id, include_deleted)?;
    Ok(ShoppingList {
        record,
        name: row.get("name")?,
        creator: row.get("creator")?,
        items,
    })
}
