//! Shopping-list domain model.
//!
//! # Responsibility
//! - Define the entity shapes persisted by the repository layer.
//! - Share lifecycle metadata through one composed [`Record`].
//!
//! # Invariants
//! - Every entity is identified by a stable UUID.
//! - Deletion is represented by a `deleted_at` tombstone, not hard delete.
//! - Field-level rules (non-empty names, non-negative quantity) are enforced
//!   by storage constraints, not by these types.

pub mod item;
pub mod record;
pub mod shopping_list;
pub mod store;

pub use item::Item;
pub use record::{Entity, EntityId, Record};
pub use shopping_list::ShoppingList;
pub use store::Store;
