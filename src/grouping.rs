//! Projection of the item store into one ordered column per status.

use crate::types::{ItemId, Status, Todo};

/// Ordered item ids per status, in the order the statuses were requested.
///
/// The partition holds identities only; item data stays in the store, so a
/// partition can never disagree with the store about an item's contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    columns: Vec<(Status, Vec<ItemId>)>,
}

impl Partition {
    /// Ids in `status`, in display order. Unknown statuses yield an empty slice.
    pub fn sequence(&self, status: Status) -> &[ItemId] {
        self.columns
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, ids)| ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn statuses(&self) -> impl Iterator<Item = Status> + '_ {
        self.columns.iter().map(|(s, _)| *s)
    }

    pub fn columns(&self) -> &[(Status, Vec<ItemId>)] {
        &self.columns
    }

    /// Column and index currently holding `id`.
    pub fn position_of(&self, id: ItemId) -> Option<(Status, usize)> {
        self.columns.iter().find_map(|(status, ids)| {
            ids.iter().position(|&i| i == id).map(|index| (*status, index))
        })
    }

    pub fn len(&self) -> usize {
        self.columns.iter().map(|(_, ids)| ids.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sort rank of an ordering key: present keys ascending, then missing ones.
fn rank(order: Option<i64>) -> (bool, i64) {
    match order {
        Some(key) => (false, key),
        None => (true, 0),
    }
}

/// Group `items` into one sequence per entry of `statuses`.
///
/// Each sequence is sorted by ordering key; items without a key go last, and
/// ties keep the iteration order of `items`. Items whose status is not listed
/// are left out. Repeated entries in `statuses` are collapsed.
///
/// Bucketing is a single pass over `items`. Each column is then sorted, which
/// is linear for a column whose keys are already in order.
pub fn group<'a, I>(items: I, statuses: &[Status]) -> Partition
where
    I: IntoIterator<Item = &'a Todo>,
{
    let mut buckets: Vec<(Status, Vec<(Option<i64>, ItemId)>)> =
        Vec::with_capacity(statuses.len());
    for status in statuses {
        if !buckets.iter().any(|(s, _)| s == status) {
            buckets.push((*status, Vec::new()));
        }
    }

    for item in items {
        if let Some((_, bucket)) = buckets.iter_mut().find(|(s, _)| *s == item.status) {
            bucket.push((item.order, item.id));
        }
    }

    let columns = buckets
        .into_iter()
        .map(|(status, mut bucket)| {
            // Stable merge sort: linear when keys are already ascending, as they
            // are after any reorder; O(k log k) for an unsorted column from the server.
            bucket.sort_by_key(|(order, _)| rank(*order));
            (status, bucket.into_iter().map(|(_, id)| id).collect())
        })
        .collect();

    Partition { columns }
}
