use shoplist_core::db::open_db_in_memory;
use shoplist_core::db::schema::{
    CHK_ITEMS_NAME, CHK_ITEMS_QUANTITY, CHK_SHOPPING_LISTS_CREATOR, CHK_SHOPPING_LISTS_NAME,
};
use shoplist_core::{
    ConstraintKind, Item, ItemListQuery, ItemRepository, Record, RepoError, ShoppingList,
    ShoppingListQuery, ShoppingListRepository, SqliteItemRepository,
    SqliteShoppingListRepository, Store,
};
use rusqlite::Connection;
use uuid::Uuid;

#[test]
fn create_shopping_list_populates_identity_and_timestamps() {
    let mut conn = open_db_in_memory().unwrap();
    let tx = conn.transaction().unwrap();
    let repo = SqliteShoppingListRepository::try_new(&tx).unwrap();

    let mut list = ShoppingList::new("Giant", "Soumya Sengupta");
    let id = repo.create_shopping_list(&mut list).unwrap();

    assert!(!id.is_nil());
    assert_eq!(list.record.id, id);
    assert!(list.record.created_at > 0);
    assert!(list.record.updated_at >= list.record.created_at);
    assert!(list.record.is_active());
    assert_eq!(list.name, "Giant");
    assert_eq!(list.creator, "Soumya Sengupta");
}

#[test]
fn empty_name_is_rejected_and_rolled_back() {
    let mut conn = open_db_in_memory().unwrap();
    {
        let tx = conn.transaction().unwrap();
        let repo = SqliteShoppingListRepository::try_new(&tx).unwrap();

        let mut list = ShoppingList::new("", "Soumya Sengupta");
        let err = repo.create_shopping_list(&mut list).unwrap_err();

        assert_eq!(err.constraint_name(), Some(CHK_SHOPPING_LISTS_NAME));
        assert!(
            err.to_string().contains("chk_shopping_lists_name"),
            "unexpected violation flagged: {err}"
        );
        assert!(list.record.is_new());
    }

    assert_eq!(count_rows(&conn, "shopping_lists"), 0);
}

#[test]
fn empty_creator_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteShoppingListRepository::try_new(&conn).unwrap();

    let mut list = ShoppingList::new("Giant", "");
    let err = repo.create_shopping_list(&mut list).unwrap_err();

    match err {
        RepoError::ConstraintViolation(violation) => {
            assert_eq!(violation.kind, ConstraintKind::Check);
            assert_eq!(violation.name, CHK_SHOPPING_LISTS_CREATOR);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(count_rows(&conn, "shopping_lists"), 0);
}

#[test]
fn create_shopping_list_with_one_item_commits_both() {
    let mut conn = open_db_in_memory().unwrap();

    let mut list = ShoppingList::new("Giant", "Soumya Sengupta")
        .with_item(Item::new("Milk", 2.0).with_uom("L"));
    {
        let tx = conn.transaction().unwrap();
        let repo = SqliteShoppingListRepository::try_new(&tx).unwrap();
        repo.create_shopping_list(&mut list).unwrap();
        drop(repo);
        tx.commit().unwrap();
    }

    let repo = SqliteShoppingListRepository::try_new(&conn).unwrap();
    let by_name = ShoppingListQuery {
        name: Some("Giant".to_string()),
        ..ShoppingListQuery::default()
    };
    assert_eq!(repo.count_shopping_lists(&by_name).unwrap(), 1);

    assert_eq!(list.items.len(), 1);
    let created_item = &list.items[0];
    assert!(!created_item.record.is_new());
    assert_eq!(created_item.shopping_list_id, Some(list.record.id));

    let loaded = repo.get_shopping_list(list.record.id, false).unwrap().unwrap();
    assert_eq!(loaded.items.len(), 1);
    let item = &loaded.items[0];
    assert_eq!(item.record.id, created_item.record.id);
    assert_eq!(item.name, "Milk");
    assert_eq!(item.quantity, 2.0);
    assert_eq!(item.uom.as_deref(), Some("L"));
    assert_eq!(count_rows(&conn, "items"), 1);
}

#[test]
fn invalid_nested_item_rolls_back_whole_list() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteShoppingListRepository::try_new(&conn).unwrap();

    let mut list = ShoppingList::new("Giant", "Soumya Sengupta")
        .with_item(Item::new("Milk", 2.0))
        .with_item(Item::new("Eggs", -1.0));
    let err = repo.create_shopping_list(&mut list).unwrap_err();

    assert_eq!(err.constraint_name(), Some(CHK_ITEMS_QUANTITY));
    assert!(list.record.is_new());
    assert!(list.items.iter().all(|item| item.record.is_new()));
    assert_eq!(count_rows(&conn, "shopping_lists"), 0);
    assert_eq!(count_rows(&conn, "items"), 0);
}

#[test]
fn nested_item_with_empty_name_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteShoppingListRepository::try_new(&conn).unwrap();

    let mut list = ShoppingList::new("Giant", "Soumya Sengupta").with_item(Item::new("", 1.0));
    let err = repo.create_shopping_list(&mut list).unwrap_err();

    assert_eq!(err.constraint_name(), Some(CHK_ITEMS_NAME));
    assert_eq!(count_rows(&conn, "shopping_lists"), 0);
}

#[test]
fn update_revalidates_constraints_and_refreshes_timestamp() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteShoppingListRepository::try_new(&conn).unwrap();

    let mut list = ShoppingList::new("Giant", "Soumya Sengupta");
    repo.create_shopping_list(&mut list).unwrap();
    conn.execute("UPDATE shopping_lists SET updated_at = 1000;", [])
        .unwrap();

    list.name = "Safeway".to_string();
    repo.update_shopping_list(&mut list).unwrap();
    assert!(list.record.updated_at > 1000);
    let loaded = repo.get_shopping_list(list.record.id, false).unwrap().unwrap();
    assert_eq!(loaded.name, "Safeway");

    list.creator = String::new();
    let err = repo.update_shopping_list(&mut list).unwrap_err();
    assert_eq!(err.constraint_name(), Some(CHK_SHOPPING_LISTS_CREATOR));
    let loaded = repo.get_shopping_list(list.record.id, false).unwrap().unwrap();
    assert_eq!(loaded.creator, "Soumya Sengupta");
}

#[test]
fn update_unknown_list_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteShoppingListRepository::try_new(&conn).unwrap();

    let mut list = ShoppingList::new("Giant", "Soumya Sengupta");
    list.record.id = Uuid::new_v4();
    let err = repo.update_shopping_list(&mut list).unwrap_err();

    assert!(matches!(err, RepoError::NotFound { id, .. } if id == list.record.id));
}

#[test]
fn soft_delete_hides_list_but_keeps_row() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteShoppingListRepository::try_new(&conn).unwrap();

    let mut kept = ShoppingList::new("Giant", "Soumya Sengupta");
    let mut deleted = ShoppingList::new("Safeway", "Soumya Sengupta");
    repo.create_shopping_list(&mut kept).unwrap();
    repo.create_shopping_list(&mut deleted).unwrap();

    repo.soft_delete_shopping_list(deleted.record.id).unwrap();

    assert!(repo
        .get_shopping_list(deleted.record.id, false)
        .unwrap()
        .is_none());
    let tombstone = repo
        .get_shopping_list(deleted.record.id, true)
        .unwrap()
        .unwrap();
    assert!(tombstone.record.is_deleted());

    let visible = repo
        .list_shopping_lists(&ShoppingListQuery::default())
        .unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].record.id, kept.record.id);

    let all = ShoppingListQuery {
        include_deleted: true,
        ..ShoppingListQuery::default()
    };
    assert_eq!(repo.list_shopping_lists(&all).unwrap().len(), 2);
    assert_eq!(count_rows(&conn, "shopping_lists"), 2);
}

#[test]
fn deleted_list_is_terminal() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteShoppingListRepository::try_new(&conn).unwrap();

    let mut list = ShoppingList::new("Giant", "Soumya Sengupta");
    repo.create_shopping_list(&mut list).unwrap();
    repo.soft_delete_shopping_list(list.record.id).unwrap();

    let err = repo.soft_delete_shopping_list(list.record.id).unwrap_err();
    assert!(err.is_not_found());
    list.name = "Renamed".to_string();
    let err = repo.update_shopping_list(&mut list).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn soft_delete_cascades_to_items_and_stores() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteShoppingListRepository::try_new(&conn).unwrap();

    let mut list = ShoppingList::new("Giant", "Soumya Sengupta")
        .with_item(Item::new("Milk", 2.0).with_store(Store::new("Giant Food")))
        .with_item(Item::new("Bread", 1.0));
    repo.create_shopping_list(&mut list).unwrap();

    repo.soft_delete_shopping_list(list.record.id).unwrap();

    assert_eq!(count_active_rows(&conn, "items"), 0);
    assert_eq!(count_active_rows(&conn, "stores"), 0);
    assert_eq!(count_rows(&conn, "items"), 2);
    assert_eq!(count_rows(&conn, "stores"), 1);

    let tombstone = repo.get_shopping_list(list.record.id, true).unwrap().unwrap();
    assert_eq!(tombstone.items.len(), 2);
    assert!(tombstone.items.iter().all(|item| item.record.is_deleted()));
}

#[test]
fn add_and_remove_items_manage_membership() {
    let conn = open_db_in_memory().unwrap();
    let lists = SqliteShoppingListRepository::try_new(&conn).unwrap();
    let items = SqliteItemRepository::try_new(&conn).unwrap();

    let mut list = ShoppingList::new("Giant", "Soumya Sengupta");
    lists.create_shopping_list(&mut list).unwrap();

    let mut fresh = Item::new("Milk", 2.0).with_uom("L");
    lists.add_item(list.record.id, &mut fresh).unwrap();
    assert_eq!(fresh.shopping_list_id, Some(list.record.id));

    let mut standalone = Item::new("Butter", 1.0);
    items.create_item(&mut standalone).unwrap();
    lists.add_item(list.record.id, &mut standalone).unwrap();

    let loaded = lists.get_shopping_list(list.record.id, false).unwrap().unwrap();
    let names: Vec<_> = loaded.items.iter().map(|item| item.name.as_str()).collect();
    assert_eq!(names, vec!["Milk", "Butter"]);

    lists.remove_item(list.record.id, fresh.record.id).unwrap();
    let loaded = lists.get_shopping_list(list.record.id, false).unwrap().unwrap();
    assert_eq!(loaded.items.len(), 1);
    let detached = items.get_item(fresh.record.id, false).unwrap().unwrap();
    assert_eq!(detached.shopping_list_id, None);

    let err = lists
        .remove_item(list.record.id, fresh.record.id)
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn add_existing_item_reloads_stored_fields() {
    let conn = open_db_in_memory().unwrap();
    let lists = SqliteShoppingListRepository::try_new(&conn).unwrap();
    let items = SqliteItemRepository::try_new(&conn).unwrap();

    let mut list = ShoppingList::new("Giant", "Soumya Sengupta");
    lists.create_shopping_list(&mut list).unwrap();
    let mut butter = Item::new("Butter", 1.0);
    items.create_item(&mut butter).unwrap();

    butter.name = "Margarine".to_string();
    butter.quantity = 3.0;
    butter.store = Some(Store::new("Corner Shop"));
    lists.add_item(list.record.id, &mut butter).unwrap();

    assert_eq!(butter.name, "Butter");
    assert_eq!(butter.quantity, 1.0);
    assert!(butter.store.is_none());
    assert_eq!(butter.shopping_list_id, Some(list.record.id));
    assert_eq!(count_rows(&conn, "stores"), 0);
}

#[test]
fn add_item_with_unsaved_id_inserts_it() {
    let conn = open_db_in_memory().unwrap();
    let lists = SqliteShoppingListRepository::try_new(&conn).unwrap();
    let items = SqliteItemRepository::try_new(&conn).unwrap();

    let mut list = ShoppingList::new("Giant", "Soumya Sengupta");
    lists.create_shopping_list(&mut list).unwrap();

    let id = Uuid::new_v4();
    let mut cheese = Item {
        record: Record::with_id(id),
        ..Item::new("Cheese", 1.0)
    };
    let attached = lists.add_item(list.record.id, &mut cheese).unwrap();

    assert_eq!(attached, id);
    assert!(cheese.record.created_at > 0);
    let stored = items.get_item(id, false).unwrap().unwrap();
    assert_eq!(stored.name, "Cheese");
    assert_eq!(stored.shopping_list_id, Some(list.record.id));
}

#[test]
fn add_deleted_item_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let lists = SqliteShoppingListRepository::try_new(&conn).unwrap();
    let items = SqliteItemRepository::try_new(&conn).unwrap();

    let mut list = ShoppingList::new("Giant", "Soumya Sengupta");
    lists.create_shopping_list(&mut list).unwrap();
    let mut milk = Item::new("Milk", 2.0);
    items.create_item(&mut milk).unwrap();
    items.soft_delete_item(milk.record.id).unwrap();

    let err = lists.add_item(list.record.id, &mut milk).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { entity: "item", .. }));
    assert_eq!(count_rows(&conn, "items"), 1);
}

#[test]
fn add_item_to_unknown_list_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let lists = SqliteShoppingListRepository::try_new(&conn).unwrap();
    let items = SqliteItemRepository::try_new(&conn).unwrap();

    let missing = Uuid::new_v4();
    let mut item = Item::new("Milk", 2.0);
    let err = lists.add_item(missing, &mut item).unwrap_err();

    assert!(matches!(err, RepoError::NotFound { id, .. } if id == missing));
    assert!(item.record.is_new());
    assert!(items
        .list_items(&ItemListQuery::default())
        .unwrap()
        .is_empty());
}

#[test]
fn list_filters_by_creator_with_pagination() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteShoppingListRepository::try_new(&conn).unwrap();

    for (name, creator) in [
        ("Weekly", "Ana"),
        ("Party", "Ben"),
        ("Pantry", "Ana"),
        ("Camping", "Ana"),
    ] {
        let mut list = ShoppingList::new(name, creator);
        repo.create_shopping_list(&mut list).unwrap();
    }

    let query = ShoppingListQuery {
        creator: Some("Ana".to_string()),
        limit: Some(2),
        offset: 1,
        ..ShoppingListQuery::default()
    };
    let page = repo.list_shopping_lists(&query).unwrap();
    let names: Vec<_> = page.iter().map(|list| list.name.as_str()).collect();
    assert_eq!(names, vec!["Pantry", "Camping"]);
    assert_eq!(repo.count_shopping_lists(&query).unwrap(), 3);
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let result = SqliteShoppingListRepository::try_new(&conn);
    match result {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert!(expected_version > 0),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

fn count_active_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(
        &format!("SELECT COUNT(*) FROM {table} WHERE deleted_at IS NULL;"),
        [],
        |row| row.get(0),
    )
    .unwrap()
}
