//! Integration tests for the board engine.
//!
//! These tests drive `Board` against an in-memory remote collection with
//! scripted failures. Tests are organized by operation.

use async_trait::async_trait;
use std::sync::Arc;
use todo_board::board::{Board, BoardOptions};
use todo_board::error::ErrorCode;
use todo_board::reconcile::{OverlapPolicy, SyncPhase};
use todo_board::remote::memory::RemoteCall;
use todo_board::remote::{InMemoryCollection, RemoteCollection, RemoteError, RemoteResult};
use todo_board::reorder::MoveDescriptor;
use todo_board::types::{ItemId, NewTodo, Status, Todo};

fn todo(id: ItemId, title: &str, status: Status, order: Option<i64>) -> Todo {
    let mut t = NewTodo::new(title).with_status(status).into_todo(id);
    t.order = order;
    t
}

/// Helper to create a loaded board over the given rows.
async fn setup(rows: Vec<Todo>) -> (Arc<InMemoryCollection<Todo>>, Board) {
    setup_with(rows, BoardOptions::default()).await
}

async fn setup_with(
    rows: Vec<Todo>,
    options: BoardOptions,
) -> (Arc<InMemoryCollection<Todo>>, Board) {
    let remote = Arc::new(InMemoryCollection::with_rows(rows));
    let mut board = Board::new(remote.clone(), options);
    board.load().await.expect("initial load");
    remote.clear_calls();
    (remote, board)
}

fn titles(board: &Board, status: Status) -> Vec<String> {
    board
        .sequence(status)
        .iter()
        .map(|t| t.title.clone())
        .collect()
}

fn keys(board: &Board, status: Status) -> Vec<Option<i64>> {
    board.sequence(status).iter().map(|t| t.order).collect()
}

fn abc_pending() -> Vec<Todo> {
    vec![
        todo(1, "A", Status::Pending, Some(0)),
        todo(2, "B", Status::Pending, Some(1)),
        todo(3, "C", Status::Pending, Some(2)),
    ]
}

/// Snapshot of the board as (status, id, title, key) rows for equality checks.
fn snapshot(board: &Board) -> Vec<(Status, ItemId, String, Option<i64>)> {
    board
        .columns()
        .into_iter()
        .flat_map(|(status, todos)| {
            todos
                .into_iter()
                .map(move |t| (status, t.id, t.title.clone(), t.order))
        })
        .collect()
}

mod load_tests {
    use super::*;

    #[tokio::test]
    async fn load_deduplicates_by_identity_last_wins() {
        let (_remote, board) = setup(vec![
            todo(7, "first", Status::Pending, Some(0)),
            todo(8, "other", Status::Pending, Some(1)),
            todo(7, "second", Status::Pending, Some(0)),
        ])
        .await;

        assert_eq!(board.store().len(), 2);
        assert_eq!(board.get(7).unwrap().title, "second");
        assert_eq!(board.phase(), SyncPhase::Confirmed);
    }

    #[tokio::test]
    async fn load_failure_keeps_store_and_records_message() {
        let (remote, mut board) = setup(abc_pending()).await;
        remote.fail_list(RemoteError::transport("connection refused"));

        let err = board.load().await.unwrap_err();

        assert_eq!(err.code, ErrorCode::TransportError);
        assert_eq!(board.last_error(), Some("Error: connection refused"));
        assert_eq!(titles(&board, Status::Pending), vec!["A", "B", "C"]);
        assert!(!board.is_loading());
    }

    #[tokio::test]
    async fn unkeyed_items_sort_after_keyed_ones() {
        let (_remote, board) = setup(vec![
            todo(1, "no-key-1", Status::Completed, None),
            todo(2, "keyed", Status::Completed, Some(3)),
            todo(3, "no-key-2", Status::Completed, None),
        ])
        .await;

        assert_eq!(
            titles(&board, Status::Completed),
            vec!["keyed", "no-key-1", "no-key-2"]
        );
    }
}

mod move_tests {
    use super::*;

    #[tokio::test]
    async fn move_last_to_front_within_column() {
        let (remote, mut board) = setup(abc_pending()).await;

        let report = board
            .handle_move(MoveDescriptor::within(Status::Pending, 2, 0))
            .await
            .expect("move should succeed");

        assert!(report.is_success());
        assert_eq!(titles(&board, Status::Pending), vec!["C", "A", "B"]);
        assert_eq!(keys(&board, Status::Pending), vec![Some(0), Some(1), Some(2)]);
        assert_eq!(board.phase(), SyncPhase::Confirmed);

        let mut sent = remote.update_calls();
        sent.sort();
        assert_eq!(sent, vec![1, 2, 3]);
        assert_eq!(remote.row(3).unwrap().order, Some(0));
    }

    #[tokio::test]
    async fn sole_item_to_empty_column() {
        let (remote, mut board) = setup(vec![todo(1, "A", Status::Pending, Some(0))]).await;

        board
            .handle_move(MoveDescriptor::across(Status::Pending, 0, Status::InProgress, 0))
            .await
            .expect("move should succeed");

        assert!(board.sequence(Status::Pending).is_empty());
        assert_eq!(titles(&board, Status::InProgress), vec!["A"]);
        assert_eq!(keys(&board, Status::InProgress), vec![Some(0)]);
        assert_eq!(board.get(1).unwrap().status, Status::InProgress);

        // Only the moved item is written; the emptied column issues nothing.
        assert_eq!(remote.update_calls(), vec![1]);
        assert_eq!(remote.row(1).unwrap().status, Status::InProgress);
    }

    #[tokio::test]
    async fn cross_move_updates_lengths_and_keys() {
        let (_remote, mut board) = setup(vec![
            todo(1, "A", Status::Pending, Some(0)),
            todo(2, "B", Status::Pending, Some(1)),
            todo(3, "X", Status::Completed, Some(0)),
            todo(4, "Y", Status::Completed, Some(1)),
        ])
        .await;

        board
            .handle_move(
                MoveDescriptor::across(Status::Pending, 1, Status::Completed, 0).with_item(2),
            )
            .await
            .expect("move should succeed");

        assert_eq!(titles(&board, Status::Pending), vec!["A"]);
        assert_eq!(titles(&board, Status::Completed), vec!["B", "X", "Y"]);
        assert_eq!(keys(&board, Status::Pending), vec![Some(0)]);
        assert_eq!(
            keys(&board, Status::Completed),
            vec![Some(0), Some(1), Some(2)]
        );
        assert_eq!(board.get(2).unwrap().status, Status::Completed);
    }

    #[tokio::test]
    async fn move_to_same_slot_is_empty_batch() {
        let (remote, mut board) = setup(abc_pending()).await;

        let report = board
            .handle_move(MoveDescriptor::within(Status::Pending, 1, 1))
            .await
            .expect("no-op move should succeed");

        assert!(report.attempted.is_empty());
        assert!(remote.calls().is_empty());
        assert_eq!(board.phase(), SyncPhase::Confirmed);
    }

    #[tokio::test]
    async fn resend_everything_when_skip_disabled() {
        let options = BoardOptions {
            skip_unchanged: false,
            ..BoardOptions::default()
        };
        let (remote, mut board) = setup_with(abc_pending(), options).await;

        board
            .handle_move(MoveDescriptor::within(Status::Pending, 0, 0))
            .await
            .unwrap();

        assert_eq!(remote.update_calls().len(), 3);
        assert_eq!(titles(&board, Status::Pending), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn invalid_source_index_changes_nothing() {
        let (remote, mut board) = setup(abc_pending()).await;

        let err = board
            .handle_move(MoveDescriptor::within(Status::Pending, 5, 0))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::InvalidMove);
        assert_eq!(titles(&board, Status::Pending), vec!["A", "B", "C"]);
        assert!(remote.calls().is_empty());
        assert_eq!(board.phase(), SyncPhase::Confirmed);
    }

    #[tokio::test]
    async fn resubmitting_a_completed_batch_is_idempotent() {
        let (remote, mut board) = setup(abc_pending()).await;

        let batch = board
            .begin_move(MoveDescriptor::within(Status::Pending, 0, 2))
            .unwrap();
        let report = batch.persist().await;
        board.settle(&report).await.unwrap();
        let after_first = snapshot(&board);
        let rows_after_first = remote.rows();

        let retry = batch.persist().await;
        board.settle(&retry).await.unwrap();

        assert_eq!(snapshot(&board), after_first);
        assert_eq!(remote.rows(), rows_after_first);
        assert_eq!(titles(&board, Status::Pending), vec!["B", "C", "A"]);
    }
}

mod reconcile_tests {
    use super::*;

    #[tokio::test]
    async fn partial_failure_reloads_from_remote() {
        let (remote, mut board) = setup(abc_pending()).await;
        // Second of the three updates fails.
        remote.fail_update(1, RemoteError::rejected(400, "order rejected"));

        let err = board
            .handle_move(MoveDescriptor::within(Status::Pending, 2, 0))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::BatchFailed);
        assert_eq!(err.failed_ids, vec![1]);
        assert_eq!(
            err.details.as_deref(),
            Some("Server returned code 400, error message is: order rejected")
        );
        assert!(remote.calls().contains(&RemoteCall::List));

        // Local state equals a fresh list(), not the optimistic order.
        let mut fresh = Board::new(remote.clone(), BoardOptions::default());
        fresh.load().await.unwrap();
        assert_eq!(snapshot(&board), snapshot(&fresh));
        assert_eq!(board.phase(), SyncPhase::Confirmed);
        assert!(board.last_error().is_some());
    }

    #[tokio::test]
    async fn failed_cross_move_restores_status() {
        let (remote, mut board) = setup(vec![todo(1, "A", Status::Pending, Some(0))]).await;
        remote.fail_update(1, RemoteError::transport("timed out"));

        let err = board
            .handle_move(MoveDescriptor::across(Status::Pending, 0, Status::Completed, 0))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::BatchFailed);
        assert_eq!(board.get(1).unwrap().status, Status::Pending);
        assert_eq!(titles(&board, Status::Pending), vec!["A"]);
        assert!(board.sequence(Status::Completed).is_empty());
    }

    #[tokio::test]
    async fn reload_failure_keeps_optimistic_state_and_stays_unconfirmed() {
        let (remote, mut board) = setup(abc_pending()).await;
        remote.fail_update(2, RemoteError::rejected(500, "db down"));
        remote.fail_list(RemoteError::transport("connection reset"));

        let err = board
            .handle_move(MoveDescriptor::within(Status::Pending, 2, 0))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::ReloadFailed);
        assert_eq!(titles(&board, Status::Pending), vec!["C", "A", "B"]);
        assert_eq!(board.phase(), SyncPhase::Optimistic { pending: 0 });

        remote.clear_failures();
        board.load().await.unwrap();
        assert_eq!(board.phase(), SyncPhase::Confirmed);
    }

    #[tokio::test]
    async fn late_failure_reload_overrides_later_move() {
        let (remote, mut board) = setup(vec![
            todo(1, "A", Status::Pending, Some(0)),
            todo(2, "B", Status::Pending, Some(1)),
            todo(3, "X", Status::Completed, Some(0)),
        ])
        .await;
        remote.fail_update(2, RemoteError::rejected(409, "stale"));

        // First move: B to the front of Pending (its update will fail).
        let first = board
            .begin_move(MoveDescriptor::within(Status::Pending, 1, 0))
            .unwrap();
        // Second move starts before the first settles and sees its optimistic state.
        let second = board
            .begin_move(MoveDescriptor::across(Status::Completed, 0, Status::Pending, 0))
            .unwrap();
        assert_eq!(board.phase(), SyncPhase::Optimistic { pending: 2 });
        assert_eq!(titles(&board, Status::Pending), vec!["X", "B", "A"]);

        // The first batch is rejected; the second one then goes through and
        // settles before the first.
        let first_report = first.persist().await;
        remote.clear_failures();
        let second_report = second.persist().await;
        board.settle(&second_report).await.unwrap();
        assert!(board.settle(&first_report).await.is_err());

        // The reload reflects whatever the remote accepted.
        let mut fresh = Board::new(remote.clone(), BoardOptions::default());
        fresh.load().await.unwrap();
        assert_eq!(snapshot(&board), snapshot(&fresh));
        assert_eq!(board.phase(), SyncPhase::Confirmed);
    }

    #[tokio::test]
    async fn reject_policy_serializes_batches_per_column() {
        let options = BoardOptions {
            overlap: OverlapPolicy::Reject,
            ..BoardOptions::default()
        };
        let (_remote, mut board) = setup_with(
            vec![
                todo(1, "A", Status::Pending, Some(0)),
                todo(2, "B", Status::Pending, Some(1)),
                todo(3, "X", Status::Cancelled, Some(0)),
                todo(4, "Y", Status::Cancelled, Some(1)),
            ],
            options,
        )
        .await;

        let first = board
            .begin_move(MoveDescriptor::within(Status::Pending, 1, 0))
            .unwrap();

        let err = board
            .begin_move(MoveDescriptor::across(Status::Cancelled, 0, Status::Pending, 0))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BatchInFlight);
        assert_eq!(titles(&board, Status::Cancelled), vec!["X", "Y"]);

        // Unrelated column is free.
        board
            .begin_move(MoveDescriptor::within(Status::Cancelled, 1, 0))
            .expect("other column should not be blocked");

        let report = first.persist().await;
        board.settle(&report).await.unwrap();
        assert!(
            board
                .begin_move(MoveDescriptor::within(Status::Pending, 0, 1))
                .is_ok()
        );
    }
}

mod abandoned_batch_tests {
    use super::*;

    fn reject_options() -> BoardOptions {
        BoardOptions {
            overlap: OverlapPolicy::Reject,
            ..BoardOptions::default()
        }
    }

    #[tokio::test]
    async fn load_after_dropped_batch_confirms_and_unblocks() {
        let (remote, mut board) = setup_with(abc_pending(), reject_options()).await;

        let batch = board
            .begin_move(MoveDescriptor::within(Status::Pending, 1, 0))
            .unwrap();
        drop(batch);
        assert_eq!(board.phase(), SyncPhase::Optimistic { pending: 1 });
        assert_eq!(titles(&board, Status::Pending), vec!["B", "A", "C"]);

        board.load().await.unwrap();

        assert_eq!(board.phase(), SyncPhase::Confirmed);
        // Nothing was persisted, so the reload restores the remote order.
        assert_eq!(titles(&board, Status::Pending), vec!["A", "B", "C"]);
        assert!(remote.update_calls().is_empty());
        board
            .begin_move(MoveDescriptor::within(Status::Pending, 1, 0))
            .expect("column should be free after a reload");
    }

    #[tokio::test]
    async fn abandon_frees_columns_without_reloading() {
        let (remote, mut board) = setup_with(abc_pending(), reject_options()).await;

        let batch = board
            .begin_move(MoveDescriptor::within(Status::Pending, 2, 0))
            .unwrap();
        let err = board
            .begin_move(MoveDescriptor::within(Status::Pending, 0, 1))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BatchInFlight);

        assert!(board.abandon(&batch));
        assert!(!board.abandon(&batch));
        assert_eq!(board.phase(), SyncPhase::Confirmed);
        assert_eq!(titles(&board, Status::Pending), vec!["C", "A", "B"]);
        assert!(!remote.calls().contains(&RemoteCall::List));

        board
            .begin_move(MoveDescriptor::within(Status::Pending, 0, 1))
            .expect("abandoned batch should not block the column");
    }

    #[tokio::test]
    async fn pending_batch_debug_lists_snapshots() {
        let (_remote, mut board) = setup(abc_pending()).await;

        let batch = board
            .begin_move(MoveDescriptor::within(Status::Pending, 2, 0))
            .unwrap();
        let rendered = format!("{:?}", batch);

        assert!(rendered.starts_with("PendingBatch"));
        assert!(rendered.contains(&format!("id: {}", batch.id())));
        assert!(rendered.contains("\"C\""));
    }
}

mod single_item_tests {
    use super::*;

    #[tokio::test]
    async fn create_adds_only_after_success() {
        let (remote, mut board) = setup(abc_pending()).await;

        remote.fail_create(RemoteError::rejected(400, "title is required"));
        let err = board.create(NewTodo::new("")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ServerRejected);
        assert_eq!(board.store().len(), 3);

        remote.clear_failures();
        let created = board
            .create(NewTodo::new("D").with_status(Status::InProgress))
            .await
            .unwrap();
        assert_eq!(created.id, 4);
        assert_eq!(titles(&board, Status::InProgress), vec!["D"]);
    }

    #[tokio::test]
    async fn delete_removes_only_after_acknowledgement() {
        let (remote, mut board) = setup(abc_pending()).await;

        remote.fail_delete(2, RemoteError::rejected(403, "forbidden"));
        let err = board.delete(2).await.unwrap_err();
        assert_eq!(err.item_id, Some(2));
        assert_eq!(titles(&board, Status::Pending), vec!["A", "B", "C"]);

        remote.clear_failures();
        board.delete(2).await.unwrap();
        assert_eq!(titles(&board, Status::Pending), vec!["A", "C"]);

        let err = board.delete(2).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ItemNotFound);
    }

    #[tokio::test]
    async fn failed_edit_restores_only_that_item() {
        let (remote, mut board) = setup(abc_pending()).await;
        remote.fail_update(2, RemoteError::rejected(422, "invalid date"));

        let mut edited = board.get(2).unwrap().clone();
        edited.title = "B (renamed)".to_string();
        edited.status = Status::Completed;
        let err = board.update_item(edited).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::ServerRejected);
        assert_eq!(board.get(2).unwrap().title, "B");
        assert_eq!(titles(&board, Status::Pending), vec!["A", "B", "C"]);
        // No reload for a non-batched edit.
        assert!(!remote.calls().contains(&RemoteCall::List));
    }

    #[tokio::test]
    async fn successful_edit_moves_between_columns() {
        let (_remote, mut board) = setup(abc_pending()).await;

        let mut edited = board.get(1).unwrap().clone();
        edited.status = Status::Completed;
        board.update_item(edited).await.unwrap();

        assert_eq!(titles(&board, Status::Pending), vec!["B", "C"]);
        assert_eq!(titles(&board, Status::Completed), vec!["A"]);
    }
}

/// Remote whose updates only complete once every update of the batch has
/// started, proving the batch is issued concurrently rather than in sequence.
struct BarrierRemote {
    inner: InMemoryCollection<Todo>,
    barrier: tokio::sync::Barrier,
}

#[async_trait]
impl RemoteCollection<Todo> for BarrierRemote {
    async fn list(&self) -> RemoteResult<Vec<Todo>> {
        self.inner.list().await
    }

    async fn create(&self, draft: &NewTodo) -> RemoteResult<Todo> {
        self.inner.create(draft).await
    }

    async fn update(&self, id: ItemId, item: &Todo) -> RemoteResult<Todo> {
        self.barrier.wait().await;
        self.inner.update(id, item).await
    }

    async fn delete(&self, id: ItemId) -> RemoteResult<()> {
        self.inner.delete(id).await
    }
}

#[tokio::test]
async fn batch_updates_are_issued_concurrently() {
    let remote = Arc::new(BarrierRemote {
        inner: InMemoryCollection::with_rows(vec![
            todo(1, "A", Status::Pending, Some(0)),
            todo(2, "B", Status::Pending, Some(1)),
            todo(3, "X", Status::Completed, Some(0)),
        ]),
        // Moving A to the top of Completed rewrites B, A and X.
        barrier: tokio::sync::Barrier::new(3),
    });
    let mut board = Board::new(remote.clone(), BoardOptions::default());
    board.load().await.unwrap();

    let result = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        board.handle_move(MoveDescriptor::across(Status::Pending, 0, Status::Completed, 0)),
    )
    .await
    .expect("sequential updates would never pass the barrier");

    let report = result.unwrap();
    assert_eq!(report.attempted.len(), 3);
    assert_eq!(titles(&board, Status::Completed), vec!["A", "X"]);
}
