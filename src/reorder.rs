//! Translation of a drag-and-drop move into new ordering keys.
//!
//! Planning is synchronous and purely local: it mutates the item store
//! (status and ordering keys) and reports which items must be written back.
//! Persisting the plan is the board's job.

use crate::error::{SyncError, SyncResult};
use crate::grouping::Partition;
use crate::store::ItemStore;
use crate::types::{ItemId, Status};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A column and an index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub status: Status,
    pub index: usize,
}

impl Slot {
    pub fn new(status: Status, index: usize) -> Self {
        Self { status, index }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveKind {
    /// Reorder inside one column.
    Within,
    /// Move to another column, changing the item's status.
    Across,
}

/// A move as reported by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveDescriptor {
    /// Item expected at `from`; a mismatch means the caller's view is stale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<ItemId>,
    pub from: Slot,
    pub to: Slot,
}

impl MoveDescriptor {
    pub fn new(from: Slot, to: Slot) -> Self {
        Self {
            item: None,
            from,
            to,
        }
    }

    pub fn within(status: Status, from: usize, to: usize) -> Self {
        Self::new(Slot::new(status, from), Slot::new(status, to))
    }

    pub fn across(from_status: Status, from: usize, to_status: Status, to: usize) -> Self {
        Self::new(Slot::new(from_status, from), Slot::new(to_status, to))
    }

    pub fn with_item(mut self, id: ItemId) -> Self {
        self.item = Some(id);
        self
    }

    pub fn kind(&self) -> MoveKind {
        if self.from.status == self.to.status {
            MoveKind::Within
        } else {
            MoveKind::Across
        }
    }
}

/// Items of one column that must be written back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceUpdate {
    pub status: Status,
    /// Column contents after the move, in display order.
    pub order: Vec<ItemId>,
    /// Subset of `order` whose key or status changed.
    pub changed: Vec<ItemId>,
}

/// Result of applying a move to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovePlan {
    pub moved: ItemId,
    pub kind: MoveKind,
    /// One entry per affected column: the source first, then the destination
    /// for cross-column moves.
    pub sequences: Vec<SequenceUpdate>,
}

impl MovePlan {
    pub fn changed_ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.sequences.iter().flat_map(|s| s.changed.iter().copied())
    }

    pub fn changed_count(&self) -> usize {
        self.sequences.iter().map(|s| s.changed.len()).sum()
    }

    pub fn statuses(&self) -> Vec<Status> {
        self.sequences.iter().map(|s| s.status).collect()
    }
}

/// Relocate the element at `from` to `to`, shifting everything in between by one.
///
/// Out-of-range indices are clamped to the last element.
pub fn move_in_place<T>(seq: &mut Vec<T>, from: usize, to: usize) {
    if seq.is_empty() {
        return;
    }
    let last = seq.len() - 1;
    let from = from.min(last);
    let to = to.min(last);
    if from == to {
        return;
    }
    let item = seq.remove(from);
    seq.insert(to, item);
}

/// Move the element at `from` in `src` to position `to` in `dst`.
///
/// `to` is clamped to `dst.len()` (append). Returns `false` when `from` is out of range.
pub fn transfer<T>(src: &mut Vec<T>, dst: &mut Vec<T>, from: usize, to: usize) -> bool {
    if from >= src.len() {
        return false;
    }
    let item = src.remove(from);
    let to = to.min(dst.len());
    dst.insert(to, item);
    true
}

/// Apply `mv` to the store and rewrite ordering keys of the affected columns.
///
/// `partition` must be the current grouping of `store`. Nothing is mutated
/// when the move is rejected. With `skip_unchanged`, items whose key and
/// status are untouched are left out of the plan's `changed` lists.
pub fn apply_move(
    store: &mut ItemStore,
    partition: &Partition,
    mv: &MoveDescriptor,
    skip_unchanged: bool,
) -> SyncResult<MovePlan> {
    let mut source = partition.sequence(mv.from.status).to_vec();
    if mv.from.index >= source.len() {
        return Err(SyncError::invalid_move(format!(
            "No item at index {} in column {} ({} items)",
            mv.from.index,
            mv.from.status,
            source.len()
        )));
    }

    let moved = source[mv.from.index];
    if let Some(expected) = mv.item {
        if expected != moved {
            return Err(SyncError::invalid_move(format!(
                "Column {} changed: expected todo {} at index {}, found {}",
                mv.from.status, expected, mv.from.index, moved
            ))
            .with_item(expected));
        }
    }

    let kind = mv.kind();
    let sequences = match kind {
        MoveKind::Within => {
            move_in_place(&mut source, mv.from.index, mv.to.index);
            let changed = assign_keys(store, &source, skip_unchanged, None)?;
            vec![SequenceUpdate {
                status: mv.from.status,
                order: source,
                changed,
            }]
        }
        MoveKind::Across => {
            let mut destination = partition.sequence(mv.to.status).to_vec();
            transfer(&mut source, &mut destination, mv.from.index, mv.to.index);
            store.mutate_status(moved, mv.to.status)?;

            let source_changed = assign_keys(store, &source, skip_unchanged, None)?;
            let destination_changed =
                assign_keys(store, &destination, skip_unchanged, Some(moved))?;
            vec![
                SequenceUpdate {
                    status: mv.from.status,
                    order: source,
                    changed: source_changed,
                },
                SequenceUpdate {
                    status: mv.to.status,
                    order: destination,
                    changed: destination_changed,
                },
            ]
        }
    };

    let plan = MovePlan {
        moved,
        kind,
        sequences,
    };
    debug!(
        item_id = moved,
        kind = ?kind,
        changed = plan.changed_count(),
        "Applied move locally"
    );
    Ok(plan)
}

/// Give `seq` keys `0..n` in order. Returns the ids whose key changed, plus
/// `force` (an item whose status changed) regardless of its key.
fn assign_keys(
    store: &mut ItemStore,
    seq: &[ItemId],
    skip_unchanged: bool,
    force: Option<ItemId>,
) -> SyncResult<Vec<ItemId>> {
    let mut changed = Vec::new();
    for (position, &id) in seq.iter().enumerate() {
        let item = store.get_mut(id).ok_or_else(|| SyncError::item_not_found(id))?;
        let key = position as i64;
        let differs = item.order != Some(key);
        item.order = Some(key);
        if differs || !skip_unchanged || force == Some(id) {
            changed.push(id);
        }
    }
    Ok(changed)
}
