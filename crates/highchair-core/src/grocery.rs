//! Grocery list types.

use serde::{Deserialize, Serialize};

/// A single entry on the grocery list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroceryItem {
    /// Unique item ID.
    pub id: String,

    /// What to buy.
    pub name: String,

    /// Whether the item has been bought.
    #[serde(default)]
    pub purchased: bool,
}

/// An ordered grocery list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroceryList(Vec<GroceryItem>);

impl GroceryList {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item. Blank names are ignored and return `None`.
    pub fn add(&mut self, name: &str) -> Option<&GroceryItem> {
        if name.trim().is_empty() {
            return None;
        }
        self.0.push(GroceryItem {
            id: uuid::Uuid::new_v4().simple().to_string(),
            name: name.to_string(),
            purchased: false,
        });
        self.0.last()
    }

    /// Flip the purchased flag of an item. Returns `false` if no item has this ID.
    pub fn toggle(&mut self, id: &str) -> bool {
        match self.0.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.purchased = !item.purchased;
                true
            }
            None => false,
        }
    }

    /// Remove an item. Returns `false` if no item has this ID.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|item| item.id != id);
        self.0.len() != before
    }

    /// Items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[GroceryItem] {
        &self.0
    }

    /// Items not yet bought.
    pub fn pending(&self) -> impl Iterator<Item = &GroceryItem> {
        self.0.iter().filter(|item| !item.purchased)
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
