//! In-process remote collection.
//!
//! Holds rows in memory and lets callers script failures per operation or per
//! item, which makes it the reference backend for exercising reconciliation.

use super::{Entity, RemoteCollection, RemoteError, RemoteResult};
use crate::types::ItemId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// A recorded call against the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCall {
    List,
    Create,
    Update(ItemId),
    Delete(ItemId),
}

struct State<E> {
    rows: Vec<E>,
    next_id: ItemId,
    calls: Vec<RemoteCall>,
    fail_list: Option<RemoteError>,
    fail_create: Option<RemoteError>,
    fail_update: HashMap<ItemId, RemoteError>,
    fail_delete: HashMap<ItemId, RemoteError>,
}

/// Remote collection backed by a vector of rows.
pub struct InMemoryCollection<E: Entity> {
    state: Mutex<State<E>>,
}

impl<E: Entity> InMemoryCollection<E> {
    pub fn new() -> Self {
        Self::with_rows(Vec::new())
    }

    /// Seed the collection. Rows are kept verbatim, duplicates included, so
    /// `list()` returns exactly what was seeded.
    pub fn with_rows(rows: Vec<E>) -> Self {
        let next_id = rows.iter().map(|r| r.id()).max().unwrap_or(0) + 1;
        Self {
            state: Mutex::new(State {
                rows,
                next_id,
                calls: Vec::new(),
                fail_list: None,
                fail_create: None,
                fail_update: HashMap::new(),
                fail_delete: HashMap::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State<E>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current rows as `list()` would return them.
    pub fn rows(&self) -> Vec<E> {
        self.state().rows.clone()
    }

    pub fn row(&self, id: ItemId) -> Option<E> {
        self.state().rows.iter().find(|r| r.id() == id).cloned()
    }

    /// Every call received so far, in arrival order.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state().calls.clone()
    }

    /// Identities passed to `update`, in arrival order.
    pub fn update_calls(&self) -> Vec<ItemId> {
        self.state()
            .calls
            .iter()
            .filter_map(|c| match c {
                RemoteCall::Update(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn fail_list(&self, err: RemoteError) {
        self.state().fail_list = Some(err);
    }

    pub fn fail_create(&self, err: RemoteError) {
        self.state().fail_create = Some(err);
    }

    /// Make every `update` of `id` fail until failures are cleared.
    pub fn fail_update(&self, id: ItemId, err: RemoteError) {
        self.state().fail_update.insert(id, err);
    }

    pub fn fail_delete(&self, id: ItemId, err: RemoteError) {
        self.state().fail_delete.insert(id, err);
    }

    pub fn clear_failures(&self) {
        let mut state = self.state();
        state.fail_list = None;
        state.fail_create = None;
        state.fail_update.clear();
        state.fail_delete.clear();
    }
}

impl<E: Entity> Default for InMemoryCollection<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: Entity> RemoteCollection<E> for InMemoryCollection<E> {
    async fn list(&self) -> RemoteResult<Vec<E>> {
        let mut state = self.state();
        state.calls.push(RemoteCall::List);
        if let Some(err) = state.fail_list.clone() {
            return Err(err);
        }
        Ok(state.rows.clone())
    }

    async fn create(&self, draft: &E::Draft) -> RemoteResult<E> {
        let mut state = self.state();
        state.calls.push(RemoteCall::Create);
        if let Some(err) = state.fail_create.clone() {
            return Err(err);
        }
        let id = state.next_id;
        state.next_id += 1;
        let row = E::from_draft(id, draft.clone());
        state.rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, id: ItemId, item: &E) -> RemoteResult<E> {
        let mut state = self.state();
        state.calls.push(RemoteCall::Update(id));
        if let Some(err) = state.fail_update.get(&id).cloned() {
            return Err(err);
        }
        // Last matching row is the one a deduplicating reader keeps.
        match state.rows.iter_mut().rev().find(|r| r.id() == id) {
            Some(row) => {
                *row = item.clone();
                Ok(item.clone())
            }
            None => Err(RemoteError::rejected(404, format!("Todo {} not found", id))),
        }
    }

    async fn delete(&self, id: ItemId) -> RemoteResult<()> {
        let mut state = self.state();
        state.calls.push(RemoteCall::Delete(id));
        if let Some(err) = state.fail_delete.get(&id).cloned() {
            return Err(err);
        }
        let before = state.rows.len();
        state.rows.retain(|r| r.id() != id);
        if state.rows.len() == before {
            return Err(RemoteError::rejected(404, format!("Todo {} not found", id)));
        }
        Ok(())
    }
}
