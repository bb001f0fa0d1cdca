//! Shopping list aggregate.

use super::item::Item;
use super::record::{Entity, Record};
use serde::{Deserialize, Serialize};

/// A named list created by a person. Owns its items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingList {
    #[serde(flatten)]
    pub record: Record,
    /// Required; must be non-empty.
    pub name: String,
    /// Required; must be non-empty.
    pub creator: String,
    /// Owned items in insertion order.
    #[serde(default)]
    pub items: Vec<Item>,
}

impl ShoppingList {
    pub fn new(name: impl Into<String>, creator: impl Into<String>) -> Self {
        Self {
            record: Record::default(),
            name: name.into(),
            creator: creator.into(),
            items: Vec::new(),
        }
    }

    pub fn with_item(mut self, item: Item) -> Self {
        self.items.push(item);
        self
    }
}

impl Entity for ShoppingList {
    const TABLE: &'static str = "shopping_lists";

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }
}
