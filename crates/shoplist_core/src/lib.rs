//! Core data model and persistence for shopping lists.
//! This crate is the single source of truth for schema and storage invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;

pub use config::{AppConfig, ConfigError, DbConfig, LogConfig, DEFAULT_CONFIG_FILE};
pub use db::migrations::{apply_migrations, ensure_schema, latest_version, SchemaReport};
pub use db::{open_db, open_db_in_memory, open_db_with_config, DbError};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LogLevel,
    LoggingError,
};
pub use model::{Entity, EntityId, Item, Record, ShoppingList, Store};
pub use repo::error::{ConstraintKind, ConstraintViolation, RepoError, RepoResult};
pub use repo::item_repo::{ItemListQuery, ItemRepository, SqliteItemRepository};
pub use repo::shopping_list_repo::{
    ShoppingListQuery, ShoppingListRepository, SqliteShoppingListRepository,
};
pub use repo::store_repo::{SqliteStoreRepository, StoreListQuery, StoreRepository};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
