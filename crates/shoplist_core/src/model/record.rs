//! Lifecycle metadata shared by every entity.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for every persisted entity.
pub type EntityId = Uuid;

/// Identifier, timestamps and soft-delete tombstone.
///
/// Timestamps are Unix epoch milliseconds assigned by storage. A nil `id`
/// marks a value that has not been persisted yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: EntityId,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl Record {
    /// Record carrying a caller-provided identity, e.g. from an import.
    pub fn with_id(id: EntityId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Returns whether storage has not assigned an identity yet.
    pub fn is_new(&self) -> bool {
        self.id.is_nil()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_active(&self) -> bool {
        !self.is_deleted()
    }
}

/// Implemented by every persisted entity.
pub trait Entity {
    /// Backing table name.
    const TABLE: &'static str;

    fn record(&self) -> &Record;

    fn record_mut(&mut self) -> &mut Record;

    fn id(&self) -> EntityId {
        self.record().id
    }
}
