//! The user's chosen items, kept independent of whatever page is loaded.
//!
//! Full item objects are retained so a selected question can still be shown
//! (and weighed) after it scrolls out of the pool. Insertion order is kept for
//! the merge view.

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::types::{Aggregate, Identifier, Item, SelectionSnapshot};

/// What to toggle: a full item can be switched on or off, a bare id only off.
#[derive(Debug, Clone)]
pub enum ToggleTarget {
    Item(Item),
    Id(Identifier),
}

impl From<Item> for ToggleTarget {
    fn from(item: Item) -> Self { ToggleTarget::Item(item) }
}

impl From<Identifier> for ToggleTarget {
    fn from(id: Identifier) -> Self { ToggleTarget::Id(id) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggled {
    Selected,
    Deselected,
}

#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    items: IndexMap<Identifier, Item>,
}

impl SelectionSet {
    pub fn new() -> Self { Self::default() }

    /// Replace the contents with previously saved items.
    pub fn seed<I: IntoIterator<Item = Item>>(&mut self, items: I) {
        self.items.clear();
        for item in items {
            self.items.entry(item.id.clone()).or_insert(item);
        }
    }

    pub fn toggle(&mut self, target: impl Into<ToggleTarget>) -> Result<Toggled> {
        match target.into() {
            ToggleTarget::Item(item) => {
                if self.items.shift_remove(&item.id).is_some() {
                    Ok(Toggled::Deselected)
                } else {
                    self.items.insert(item.id.clone(), item);
                    Ok(Toggled::Selected)
                }
            }
            ToggleTarget::Id(id) => match self.items.shift_remove(&id) {
                Some(_) => Ok(Toggled::Deselected),
                None => Err(Error::UnknownSelection(id)),
            },
        }
    }

    pub fn clear(&mut self) { self.items.clear(); }

    pub fn contains(&self, id: &Identifier) -> bool { self.items.contains_key(id) }

    pub fn get(&self, id: &Identifier) -> Option<&Item> { self.items.get(id) }

    pub fn ids(&self) -> impl Iterator<Item = &Identifier> { self.items.keys() }

    pub fn items(&self) -> impl Iterator<Item = &Item> { self.items.values() }

    pub fn len(&self) -> usize { self.items.len() }

    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    /// Count and summed weight, computed from the current contents every call.
    pub fn aggregate(&self) -> Aggregate {
        Aggregate { count: self.items.len(), total_weight: self.items.values().map(Item::weight).sum() }
    }

    pub fn snapshot(&self) -> SelectionSnapshot {
        let Aggregate { count, total_weight } = self.aggregate();
        SelectionSnapshot { selected_ids: self.items.keys().cloned().collect(), count, total_weight }
    }
}
