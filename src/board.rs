//! The task board: item store, grouped columns and remote persistence.
//!
//! A move runs in two explicit phases:
//!
//! 1. [`Board::begin_move`] applies the move to the store synchronously and
//!    returns a [`PendingBatch`] holding snapshots of every changed item.
//! 2. [`PendingBatch::persist`] sends one `update` per snapshot concurrently
//!    and waits for all of them; [`Board::settle`] then confirms the move or
//!    reloads the whole board.
//!
//! [`Board::handle_move`] runs both phases back to back. Callers that want
//! several moves in flight drive the phases themselves; outcomes are applied
//! in settle order.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::grouping::{Partition, group};
use crate::reconcile::{BatchId, BatchReport, OverlapPolicy, SyncPhase, Tracker, Verdict};
use crate::remote::RemoteCollection;
use crate::reorder::{MoveDescriptor, MovePlan, apply_move};
use crate::store::ItemStore;
use crate::types::{ItemId, NewTodo, Status, Todo};
use futures::future::join_all;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Shared handle to the todo collection.
pub type TodoRemote = Arc<dyn RemoteCollection<Todo>>;

/// Behavior switches for the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardOptions {
    /// Only write back items whose key or status changed.
    pub skip_unchanged: bool,
    pub overlap: OverlapPolicy,
}

impl Default for BoardOptions {
    fn default() -> Self {
        Self {
            skip_unchanged: true,
            overlap: OverlapPolicy::Allow,
        }
    }
}

impl From<&SyncConfig> for BoardOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            skip_unchanged: config.skip_unchanged,
            overlap: config.overlap,
        }
    }
}

/// A move that has been applied locally and not yet persisted.
///
/// Dropping a batch without settling it leaves its columns registered as
/// busy; hand it to [`Board::abandon`] or reload with [`Board::load`].
#[derive(Clone)]
pub struct PendingBatch {
    id: BatchId,
    plan: MovePlan,
    items: Vec<Todo>,
    remote: TodoRemote,
}

impl PendingBatch {
    pub fn id(&self) -> BatchId {
        self.id
    }

    pub fn plan(&self) -> &MovePlan {
        &self.plan
    }

    /// Snapshots that will be sent, one per changed item.
    pub fn items(&self) -> &[Todo] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Issue every update concurrently and wait until all have settled.
    ///
    /// Calling this again resends the same snapshots.
    pub async fn persist(&self) -> BatchReport {
        let calls = self.items.iter().map(|item| async move {
            let result = self.remote.update(item.id, item).await;
            (item.id, result)
        });
        let results = join_all(calls).await;

        let mut failures = Vec::new();
        for (id, result) in results {
            if let Err(err) = result {
                warn!(batch_id = self.id, item_id = id, error = %err, "Update failed");
                failures.push((id, err));
            }
        }

        BatchReport {
            batch_id: self.id,
            attempted: self.items.iter().map(|t| t.id).collect(),
            failures,
        }
    }
}

impl fmt::Debug for PendingBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingBatch")
            .field("id", &self.id)
            .field("plan", &self.plan)
            .field("items", &self.items)
            .finish_non_exhaustive()
    }
}

/// Board state: the authoritative local store and its grouped projection.
pub struct Board {
    remote: TodoRemote,
    store: ItemStore,
    partition: Partition,
    tracker: Tracker,
    options: BoardOptions,
    last_error: Option<String>,
    loading: bool,
}

impl Board {
    pub fn new(remote: TodoRemote, options: BoardOptions) -> Self {
        Self {
            remote,
            store: ItemStore::new(),
            partition: Partition::default(),
            tracker: Tracker::new(options.overlap),
            options,
            last_error: None,
            loading: false,
        }
    }

    pub fn options(&self) -> BoardOptions {
        self.options
    }

    pub fn store(&self) -> &ItemStore {
        &self.store
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    pub fn get(&self, id: ItemId) -> Option<&Todo> {
        self.store.get(id)
    }

    /// Items in `status`, in display order.
    pub fn sequence(&self, status: Status) -> Vec<&Todo> {
        self.partition
            .sequence(status)
            .iter()
            .filter_map(|id| self.store.get(*id))
            .collect()
    }

    /// Every column in display order.
    pub fn columns(&self) -> Vec<(Status, Vec<&Todo>)> {
        self.partition
            .statuses()
            .map(|status| (status, self.sequence(status)))
            .collect()
    }

    pub fn phase(&self) -> SyncPhase {
        self.tracker.phase()
    }

    /// Message of the most recent failure, for display.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// True while [`Board::load`] awaits the remote.
    ///
    /// `load` borrows the board mutably across the await, so a caller holding
    /// the board always reads `false` here; the flag only matters to code
    /// that runs inside `load` itself.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    fn regroup(&mut self) {
        self.partition = group(self.store.iter(), &Status::ALL);
    }

    fn record_error(&mut self, err: &SyncError) {
        error!(code = ?err.code, details = ?err.details, "{}", err.message);
        self.last_error = Some(err.message.clone());
    }

    /// Replace the store with the remote contents.
    ///
    /// A successful load supersedes every optimistic change, so unsettled
    /// batches are forgotten and the board is confirmed again. On failure the
    /// store is left untouched and the message is kept in
    /// [`Board::last_error`].
    pub async fn load(&mut self) -> SyncResult<()> {
        self.loading = true;
        self.last_error = None;
        let result = self.remote.list().await;
        self.loading = false;

        match result {
            Ok(items) => {
                self.store.replace_all(items);
                self.regroup();
                self.tracker.reset();
                info!(count = self.store.len(), "Board loaded");
                Ok(())
            }
            Err(err) => {
                let err = SyncError::remote(&err);
                self.record_error(&err);
                Err(err)
            }
        }
    }

    /// Create a todo remotely; it joins the store only once the server has
    /// assigned its identity.
    pub async fn create(&mut self, draft: NewTodo) -> SyncResult<Todo> {
        match self.remote.create(&draft).await {
            Ok(todo) => {
                info!(item_id = todo.id, status = %todo.status, "Todo created");
                self.store.upsert_one(todo.clone());
                self.regroup();
                Ok(todo)
            }
            Err(err) => {
                let err =
                    SyncError::remote(&err).with_details(format!("creating '{}'", draft.title));
                self.record_error(&err);
                Err(err)
            }
        }
    }

    /// Save an edited todo. The edit is applied locally first; if the server
    /// rejects it only this item is restored.
    pub async fn update_item(&mut self, item: Todo) -> SyncResult<Todo> {
        let id = item.id;
        let previous = self
            .store
            .get(id)
            .cloned()
            .ok_or_else(|| SyncError::item_not_found(id))?;

        self.store.upsert_one(item.clone());
        self.regroup();

        match self.remote.update(id, &item).await {
            Ok(saved) => {
                debug!(item_id = id, "Todo saved");
                self.store.upsert_one(saved.clone());
                self.regroup();
                Ok(saved)
            }
            Err(err) => {
                self.store.upsert_one(previous);
                self.regroup();
                let err = SyncError::remote(&err).with_item(id);
                self.record_error(&err);
                Err(err)
            }
        }
    }

    /// Delete remotely, then locally once acknowledged.
    pub async fn delete(&mut self, id: ItemId) -> SyncResult<()> {
        if !self.store.contains(id) {
            return Err(SyncError::item_not_found(id));
        }
        match self.remote.delete(id).await {
            Ok(()) => {
                self.store.remove_one(id);
                self.regroup();
                info!(item_id = id, "Todo deleted");
                Ok(())
            }
            Err(err) => {
                let err = SyncError::remote(&err).with_item(id);
                self.record_error(&err);
                Err(err)
            }
        }
    }

    /// Phase one: apply the move locally and snapshot what must be persisted.
    pub fn begin_move(&mut self, mv: MoveDescriptor) -> SyncResult<PendingBatch> {
        let mut touched = vec![mv.from.status];
        if mv.to.status != mv.from.status {
            touched.push(mv.to.status);
        }
        self.tracker.check(&touched)?;

        let plan = apply_move(
            &mut self.store,
            &self.partition,
            &mv,
            self.options.skip_unchanged,
        )?;
        self.regroup();

        let items: Vec<Todo> = plan
            .changed_ids()
            .filter_map(|id| self.store.get(id).cloned())
            .collect();
        let id = self.tracker.begin(plan.statuses());
        debug!(
            batch_id = id,
            item_id = plan.moved,
            updates = items.len(),
            "Move applied, batch pending"
        );

        Ok(PendingBatch {
            id,
            plan,
            items,
            remote: Arc::clone(&self.remote),
        })
    }

    /// Phase two: confirm the batch, or reload everything if any update failed.
    pub async fn settle(&mut self, report: &BatchReport) -> SyncResult<()> {
        match self.tracker.settle(report) {
            Verdict::Confirm => Ok(()),
            Verdict::Reload(batch_err) => {
                warn!(
                    batch_id = report.batch_id,
                    failed = report.failures.len(),
                    attempted = report.attempted.len(),
                    "Batch failed, reloading board"
                );
                match self.remote.list().await {
                    Ok(items) => {
                        self.store.replace_all(items);
                        self.regroup();
                        self.tracker.mark_reloaded();
                        self.record_error(&batch_err);
                        Err(batch_err)
                    }
                    Err(reload_err) => {
                        self.tracker.mark_stale();
                        let err = SyncError::reload_failed(batch_err, &reload_err);
                        self.record_error(&err);
                        Err(err)
                    }
                }
            }
        }
    }

    /// Give up on a batch that will not be settled, freeing its columns.
    ///
    /// Local state keeps the batch's optimistic changes; call [`Board::load`]
    /// to discard them. Returns false if the batch had already settled.
    pub fn abandon(&mut self, batch: &PendingBatch) -> bool {
        let released = self.tracker.release(batch.id);
        if released {
            warn!(batch_id = batch.id, "Batch abandoned before settling");
        }
        released
    }

    /// Apply, persist and settle one move. Resolves once every update has
    /// settled; an empty batch resolves immediately.
    pub async fn handle_move(&mut self, mv: MoveDescriptor) -> SyncResult<BatchReport> {
        let batch = self.begin_move(mv)?;
        let report = batch.persist().await;
        self.settle(&report).await?;
        Ok(report)
    }
}
