//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts per entity.
//! - Isolate SQLite query details from callers.
//!
//! # Invariants
//! - Repositories borrow a caller-owned connection or transaction; the
//!   caller decides the transaction scope.
//! - Field rules are enforced by storage constraints and surfaced as
//!   `RepoError::ConstraintViolation` carrying the constraint name.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod error;
pub mod item_repo;
pub mod shopping_list_repo;
pub mod store_repo;
mod support;
