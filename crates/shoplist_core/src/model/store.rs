//! Store entity.

use super::record::{Entity, EntityId, Record};
use serde::{Deserialize, Serialize};

/// A physical or logical store, associated with at most one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    #[serde(flatten)]
    pub record: Record,
    /// Required; must be non-empty.
    pub name: String,
    pub address: Option<String>,
    /// Owning item, if any.
    pub item_id: Option<EntityId>,
}

impl Store {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            record: Record::default(),
            name: name.into(),
            address: None,
            item_id: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}

impl Entity for Store {
    const TABLE: &'static str = "stores";

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }
}
