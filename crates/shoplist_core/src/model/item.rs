//! Item entity.

use super::record::{Entity, EntityId, Record};
use super::store::Store;
use serde::{Deserialize, Serialize};

/// A named, quantified product, optionally owned by one shopping list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(flatten)]
    pub record: Record,
    /// Required; must be non-empty.
    pub name: String,
    /// Required; must be `>= 0.0`.
    pub quantity: f64,
    /// Free-text unit of measure, e.g. `L` or `pcs`.
    pub uom: Option<String>,
    /// One-to-one associated store, persisted with `item_id` pointing here.
    pub store: Option<Store>,
    /// Owning shopping list. `None` for standalone items.
    pub shopping_list_id: Option<EntityId>,
}

impl Item {
    pub fn new(name: impl Into<String>, quantity: f64) -> Self {
        Self {
            record: Record::default(),
            name: name.into(),
            quantity,
            uom: None,
            store: None,
            shopping_list_id: None,
        }
    }

    pub fn with_uom(mut self, uom: impl Into<String>) -> Self {
        self.uom = Some(uom.into());
        self
    }

    pub fn with_store(mut self, store: Store) -> Self {
        self.store = Some(store);
        self
    }
}

impl Entity for Item {
    const TABLE: &'static str = "items";

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }
}
