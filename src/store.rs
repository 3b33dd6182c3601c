//! Local copy of every todo, keyed by identity.
//!
//! The store keeps insertion order; the grouping pass relies on it to break
//! ties between items with equal or missing ordering keys.

use crate::error::{SyncError, SyncResult};
use crate::types::{ItemId, Status, Todo};
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct ItemStore {
    items: Vec<Todo>,
    index: HashMap<ItemId, usize>,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole contents, e.g. after a reload.
    ///
    /// Duplicate identities collapse to one entry: the content of the last
    /// occurrence wins, the position of the first is kept.
    /// Returns the number of duplicates dropped.
    pub fn replace_all<I>(&mut self, items: I) -> usize
    where
        I: IntoIterator<Item = Todo>,
    {
        self.items.clear();
        self.index.clear();

        let mut duplicates = 0;
        for item in items {
            match self.index.get(&item.id) {
                Some(&pos) => {
                    duplicates += 1;
                    self.items[pos] = item;
                }
                None => {
                    self.index.insert(item.id, self.items.len());
                    self.items.push(item);
                }
            }
        }

        if duplicates > 0 {
            warn!(duplicates, "Remote list contained duplicate todo ids");
        }
        duplicates
    }

    /// Insert a new item at the end, or overwrite the existing one in place.
    pub fn upsert_one(&mut self, item: Todo) {
        match self.index.get(&item.id) {
            Some(&pos) => self.items[pos] = item,
            None => {
                self.index.insert(item.id, self.items.len());
                self.items.push(item);
            }
        }
    }

    /// Remove by identity. Returns the removed item; absent ids are a no-op.
    pub fn remove_one(&mut self, id: ItemId) -> Option<Todo> {
        let pos = self.index.remove(&id)?;
        let removed = self.items.remove(pos);
        for slot in self.index.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    pub fn mutate_status(&mut self, id: ItemId, status: Status) -> SyncResult<()> {
        let item = self.get_mut(id).ok_or_else(|| SyncError::item_not_found(id))?;
        item.status = status;
        Ok(())
    }

    pub fn get(&self, id: ItemId) -> Option<&Todo> {
        self.index.get(&id).map(|&pos| &self.items[pos])
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut Todo> {
        match self.index.get(&id) {
            Some(&pos) => Some(&mut self.items[pos]),
            None => None,
        }
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in collection order.
    pub fn iter(&self) -> impl Iterator<Item = &Todo> {
        self.items.iter()
    }

    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|t| t.id).collect()
    }
}
