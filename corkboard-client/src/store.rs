/// Board mirror store with optimistic reconciliation
///
/// Holds one board's column structure and drives every change (local
/// optimistic mutations and inbound remote broadcasts alike) through the
/// same [`engine`](corkboard_shared::board::engine) the server uses. The
/// structural invariants (column_order permutation, one column per task)
/// therefore hold on the mirror exactly as they do server-side.
///
/// # Lifecycle of an optimistic mutation
///
/// ```text
/// apply_local(m) ──> mirror updated, inverse journaled, op id returned
///       │
///       ├─ server 2xx ──> confirm(op_id, version)   (entry dropped)
///       └─ server 4xx ──> reject(op_id)
///                           ├─ newest op: inverse applied
///                           └─ layered ops on top: needs_refresh set,
///                              caller re-fetches authoritative state
/// ```

use corkboard_shared::board::{engine, Column, EngineError};
use corkboard_shared::realtime::BoardEvent;
use uuid::Uuid;

use crate::journal::{Inverse, Journal, OpId};

/// Error type for store operations
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    /// Structural violation from the board engine
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The operation id is not pending in the journal
    #[error("unknown operation id {0}")]
    UnknownOp(OpId),
}

/// A mutation the user performed locally
#[derive(Debug, Clone)]
pub enum LocalMutation {
    /// Append a column (client-generated id so the REST call can echo it)
    CreateColumn { column_id: Uuid, title: String },

    /// Replace the column order
    ReorderColumns { column_order: Vec<Uuid> },

    /// Delete a column and everything in it
    DeleteColumn { column_id: Uuid },

    /// Append a task to a column
    CreateTask { task_id: Uuid, column_id: Uuid },

    /// Move a task (the drag-and-drop path)
    MoveTask {
        task_id: Uuid,
        source_column_id: Uuid,
        dest_column_id: Uuid,
        dest_index: usize,
    },

    /// Delete a task
    DeleteTask { task_id: Uuid },
}

/// Mirror of one board's structure
#[derive(Debug)]
pub struct BoardStore {
    board_id: Uuid,
    columns: Vec<Column>,
    column_order: Vec<Uuid>,
    /// Last board version observed from the server
    version: i64,
    journal: Journal,
    needs_refresh: bool,
}

impl BoardStore {
    /// Creates a mirror from a fetched board document
    pub fn new(board_id: Uuid, columns: Vec<Column>, column_order: Vec<Uuid>, version: i64) -> Self {
        Self {
            board_id,
            columns,
            column_order,
            version,
            journal: Journal::new(),
            needs_refresh: false,
        }
    }

    /// The mirrored board id
    pub fn board_id(&self) -> Uuid {
        self.board_id
    }

    /// Current column structure
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Current column order
    pub fn column_order(&self) -> &[Uuid] {
        &self.column_order
    }

    /// Last server version observed
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Number of unconfirmed optimistic operations
    pub fn pending_ops(&self) -> usize {
        self.journal.len()
    }

    /// Whether the mirror has diverged and must re-fetch server state
    pub fn needs_refresh(&self) -> bool {
        self.needs_refresh
    }

    /// Structural invariant check (column_order permutation, unique tasks)
    pub fn check_invariants(&self) -> bool {
        engine::check_invariants(&self.columns, &self.column_order)
    }

    /// Applies a mutation optimistically, journaling its inverse
    ///
    /// Returns the op id to pass to [`confirm`](Self::confirm) or
    /// [`reject`](Self::reject) once the server responds. A failed engine
    /// application leaves the mirror untouched and journals nothing.
    pub fn apply_local(&mut self, mutation: LocalMutation) -> Result<OpId, StoreError> {
        let inverse = match &mutation {
            LocalMutation::CreateColumn { column_id, .. } => Inverse::RemoveColumn {
                column_id: *column_id,
            },
            LocalMutation::ReorderColumns { .. } => Inverse::RestoreColumnOrder {
                column_order: self.column_order.clone(),
            },
            // Deleting a column drops its task list; there is nothing to
            // rebuild the inverse from.
            LocalMutation::DeleteColumn { .. } => Inverse::Refetch,
            LocalMutation::CreateTask { task_id, .. } => Inverse::RemoveTask { task_id: *task_id },
            LocalMutation::MoveTask { task_id, .. } => {
                let (column_id, index) = engine::locate_task(&self.columns, *task_id)
                    .ok_or(StoreError::Engine(EngineError::UnknownTask(*task_id)))?;
                Inverse::MoveTaskBack {
                    task_id: *task_id,
                    column_id,
                    index,
                }
            }
            LocalMutation::DeleteTask { task_id } => {
                let (column_id, index) = engine::locate_task(&self.columns, *task_id)
                    .ok_or(StoreError::Engine(EngineError::UnknownTask(*task_id)))?;
                Inverse::InsertTaskAt {
                    column_id,
                    index,
                    task_id: *task_id,
                }
            }
        };

        self.apply_mutation(&mutation)?;
        Ok(self.journal.begin(inverse))
    }

    /// Confirms an optimistic operation after the server accepted it
    ///
    /// The optimistic state stays in place; only the journal entry is
    /// dropped. `server_version` is the board version the response carried.
    pub fn confirm(&mut self, op_id: OpId, server_version: i64) -> Result<(), StoreError> {
        if !self.journal.confirm(op_id) {
            return Err(StoreError::UnknownOp(op_id));
        }
        self.version = self.version.max(server_version);
        Ok(())
    }

    /// Discards an optimistic operation after the server rejected it
    ///
    /// If the op is the newest pending one its inverse is applied and the
    /// mirror is exact again. If later mutations were layered on top, the
    /// inverse no longer matches the structure: the store flags
    /// [`needs_refresh`](Self::needs_refresh) and the caller re-fetches.
    pub fn reject(&mut self, op_id: OpId) -> Result<(), StoreError> {
        match self.journal.pop_newest(op_id) {
            Some(Inverse::Refetch) => {
                self.invalidate();
                Ok(())
            }
            Some(inverse) => {
                if self.apply_inverse(&inverse).is_err() {
                    // The mirror diverged from what the inverse assumes.
                    self.invalidate();
                }
                Ok(())
            }
            None if self.journal.contains(op_id) => {
                // Not the newest: layered mutations make the inverse
                // uncomputable. Documented fallback: re-fetch.
                self.invalidate();
                Ok(())
            }
            None => Err(StoreError::UnknownOp(op_id)),
        }
    }

    /// Replays an inbound broadcast from another client
    ///
    /// Structural events carry the board version; a gap in the sequence
    /// (while no optimistic ops are pending) means a missed frame, and the
    /// mirror flags itself for a re-fetch instead of applying a frame whose
    /// predecessors it never saw.
    pub fn apply_remote(&mut self, event: &BoardEvent) {
        let event_version = self.remote_version(event);

        if let Some(v) = event_version {
            if self.journal.is_empty() && v > self.version + 1 {
                tracing::debug!(
                    board_id = %self.board_id,
                    observed = v,
                    expected = self.version + 1,
                    "Version gap in remote events"
                );
                self.invalidate();
                return;
            }
        }

        let applied = self.replay(event);

        if let Some(v) = event_version {
            self.version = self.version.max(v);
        }

        if applied.is_err() {
            self.invalidate();
        }
    }

    /// Board version carried by a structural event of this board, if any
    fn remote_version(&self, event: &BoardEvent) -> Option<i64> {
        match event {
            BoardEvent::ColumnCreated { board_id, version, .. }
            | BoardEvent::ColumnsReordered { board_id, version, .. }
            | BoardEvent::ColumnDeleted { board_id, version, .. }
            | BoardEvent::TaskCreated { board_id, version, .. }
            | BoardEvent::TaskMoved { board_id, version, .. }
            | BoardEvent::TaskDeleted { board_id, version, .. }
                if *board_id == self.board_id =>
            {
                Some(*version)
            }
            _ => None,
        }
    }

    fn replay(&mut self, event: &BoardEvent) -> Result<(), EngineError> {
        match event {
            BoardEvent::ColumnCreated {
                board_id, column, ..
            } if *board_id == self.board_id => engine::push_column(
                &mut self.columns,
                &mut self.column_order,
                column.id,
                &column.title,
            ),
            BoardEvent::ColumnsReordered {
                board_id,
                column_order,
                ..
            } if *board_id == self.board_id => {
                engine::reorder_columns(&mut self.columns, &mut self.column_order, column_order)
            }
            BoardEvent::ColumnDeleted {
                board_id,
                column_id,
                ..
            } if *board_id == self.board_id => {
                engine::remove_column(&mut self.columns, &mut self.column_order, *column_id)
                    .map(|_| ())
            }
            BoardEvent::TaskCreated {
                board_id,
                column_id,
                task,
                ..
            } if *board_id == self.board_id => {
                engine::append_task(&mut self.columns, *column_id, task.id).map(|_| ())
            }
            BoardEvent::TaskMoved {
                board_id,
                task_id,
                source_column_id,
                dest_column_id,
                dest_index,
                ..
            } if *board_id == self.board_id => engine::move_task(
                &mut self.columns,
                *task_id,
                *source_column_id,
                *dest_column_id,
                *dest_index,
            )
            .map(|_| ()),
            BoardEvent::TaskDeleted {
                board_id, task_id, ..
            } if *board_id == self.board_id => {
                engine::remove_task(&mut self.columns, *task_id).map(|_| ())
            }
            // Field edits and comments do not change the structure; project
            // events and foreign boards are not ours.
            _ => Ok(()),
        }
    }

    /// Replaces the mirror with freshly fetched authoritative state
    pub fn refresh(&mut self, columns: Vec<Column>, column_order: Vec<Uuid>, version: i64) {
        self.columns = columns;
        self.column_order = column_order;
        self.version = version;
        self.journal.clear();
        self.needs_refresh = false;
    }

    fn invalidate(&mut self) {
        self.needs_refresh = true;
        self.journal.clear();
    }

    fn apply_mutation(&mut self, mutation: &LocalMutation) -> Result<(), EngineError> {
        match mutation {
            LocalMutation::CreateColumn { column_id, title } => {
                engine::push_column(&mut self.columns, &mut self.column_order, *column_id, title)
            }
            LocalMutation::ReorderColumns { column_order } => {
                engine::reorder_columns(&mut self.columns, &mut self.column_order, column_order)
            }
            LocalMutation::DeleteColumn { column_id } => {
                engine::remove_column(&mut self.columns, &mut self.column_order, *column_id)
                    .map(|_| ())
            }
            LocalMutation::CreateTask { task_id, column_id } => {
                engine::append_task(&mut self.columns, *column_id, *task_id).map(|_| ())
            }
            LocalMutation::MoveTask {
                task_id,
                source_column_id,
                dest_column_id,
                dest_index,
            } => engine::move_task(
                &mut self.columns,
                *task_id,
                *source_column_id,
                *dest_column_id,
                *dest_index,
            )
            .map(|_| ()),
            LocalMutation::DeleteTask { task_id } => {
                engine::remove_task(&mut self.columns, *task_id).map(|_| ())
            }
        }
    }

    fn apply_inverse(&mut self, inverse: &Inverse) -> Result<(), EngineError> {
        match inverse {
            Inverse::RemoveColumn { column_id } => {
                engine::remove_column(&mut self.columns, &mut self.column_order, *column_id)
                    .map(|_| ())
            }
            Inverse::RestoreColumnOrder { column_order } => {
                engine::reorder_columns(&mut self.columns, &mut self.column_order, column_order)
            }
            Inverse::RemoveTask { task_id } => {
                engine::remove_task(&mut self.columns, *task_id).map(|_| ())
            }
            Inverse::InsertTaskAt {
                column_id,
                index,
                task_id,
            } => engine::insert_task_at(&mut self.columns, *column_id, *task_id, *index)
                .map(|_| ()),
            Inverse::MoveTaskBack {
                task_id,
                column_id,
                index,
            } => {
                let (current_column, _) = engine::locate_task(&self.columns, *task_id)
                    .ok_or(EngineError::UnknownTask(*task_id))?;
                engine::move_task(
                    &mut self.columns,
                    *task_id,
                    current_column,
                    *column_id,
                    *index,
                )
                .map(|_| ())
            }
            Inverse::Refetch => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_columns(titles: &[&str]) -> (BoardStore, Vec<Uuid>) {
        let mut columns = Vec::new();
        let mut order = Vec::new();
        let mut ids = Vec::new();
        for title in titles {
            let id = Uuid::new_v4();
            engine::push_column(&mut columns, &mut order, id, title).unwrap();
            ids.push(id);
        }
        (BoardStore::new(Uuid::new_v4(), columns, order, 0), ids)
    }

    fn snapshot(store: &BoardStore) -> (Vec<Column>, Vec<Uuid>) {
        (store.columns().to_vec(), store.column_order().to_vec())
    }

    #[test]
    fn test_optimistic_move_then_confirm_keeps_state() {
        let (mut store, ids) = store_with_columns(&["To Do", "Done"]);
        let task = Uuid::new_v4();
        store
            .apply_local(LocalMutation::CreateTask {
                task_id: task,
                column_id: ids[0],
            })
            .unwrap();

        let op = store
            .apply_local(LocalMutation::MoveTask {
                task_id: task,
                source_column_id: ids[0],
                dest_column_id: ids[1],
                dest_index: 0,
            })
            .unwrap();

        let after_move = snapshot(&store);
        store.confirm(op, 2).unwrap();

        assert_eq!(snapshot(&store), after_move);
        assert_eq!(store.version(), 2);
        assert!(store.check_invariants());
    }

    #[test]
    fn test_rejected_move_restores_exact_prior_structure() {
        let (mut store, ids) = store_with_columns(&["To Do", "Done"]);
        let task_a = Uuid::new_v4();
        let task_b = Uuid::new_v4();
        for t in [task_a, task_b] {
            let op = store
                .apply_local(LocalMutation::CreateTask {
                    task_id: t,
                    column_id: ids[0],
                })
                .unwrap();
            store.confirm(op, 1).unwrap();
        }
        let before = snapshot(&store);

        let op = store
            .apply_local(LocalMutation::MoveTask {
                task_id: task_a,
                source_column_id: ids[0],
                dest_column_id: ids[1],
                dest_index: 0,
            })
            .unwrap();

        assert_ne!(snapshot(&store), before);
        store.reject(op).unwrap();

        assert_eq!(snapshot(&store), before);
        assert!(!store.needs_refresh());
        assert!(store.check_invariants());
    }

    #[test]
    fn test_rejected_delete_reinserts_at_original_index() {
        let (mut store, ids) = store_with_columns(&["To Do"]);
        let tasks: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        for t in &tasks {
            let op = store
                .apply_local(LocalMutation::CreateTask {
                    task_id: *t,
                    column_id: ids[0],
                })
                .unwrap();
            store.confirm(op, 1).unwrap();
        }

        let op = store
            .apply_local(LocalMutation::DeleteTask { task_id: tasks[1] })
            .unwrap();
        store.reject(op).unwrap();

        assert_eq!(store.columns()[0].task_ids, tasks);
    }

    #[test]
    fn test_reject_with_layered_mutations_falls_back_to_refresh() {
        let (mut store, ids) = store_with_columns(&["To Do", "Done"]);
        let task = Uuid::new_v4();
        let op_create = store
            .apply_local(LocalMutation::CreateTask {
                task_id: task,
                column_id: ids[0],
            })
            .unwrap();

        // A second mutation layered on top of the first.
        let _op_move = store
            .apply_local(LocalMutation::MoveTask {
                task_id: task,
                source_column_id: ids[0],
                dest_column_id: ids[1],
                dest_index: 0,
            })
            .unwrap();

        store.reject(op_create).unwrap();

        assert!(store.needs_refresh());
        assert_eq!(store.pending_ops(), 0);
    }

    #[test]
    fn test_rejected_column_delete_requires_refresh() {
        let (mut store, ids) = store_with_columns(&["To Do", "Done"]);
        let task = Uuid::new_v4();
        let op = store
            .apply_local(LocalMutation::CreateTask {
                task_id: task,
                column_id: ids[0],
            })
            .unwrap();
        store.confirm(op, 1).unwrap();

        let op = store
            .apply_local(LocalMutation::DeleteColumn { column_id: ids[0] })
            .unwrap();
        store.reject(op).unwrap();

        // The dropped task list cannot be rebuilt locally.
        assert!(store.needs_refresh());
    }

    #[test]
    fn test_remote_move_replays_like_the_server() {
        let (mut store, ids) = store_with_columns(&["To Do", "Done"]);
        let task = Uuid::new_v4();
        let op = store
            .apply_local(LocalMutation::CreateTask {
                task_id: task,
                column_id: ids[0],
            })
            .unwrap();
        store.confirm(op, 1).unwrap();

        store.apply_remote(&BoardEvent::TaskMoved {
            board_id: store.board_id(),
            task_id: task,
            source_column_id: ids[0],
            dest_column_id: ids[1],
            dest_index: 0,
            version: 2,
        });

        assert!(store.columns()[0].task_ids.is_empty());
        assert_eq!(store.columns()[1].task_ids, vec![task]);
        assert_eq!(store.version(), 2);
        assert!(!store.needs_refresh());
    }

    #[test]
    fn test_remote_version_gap_flags_refresh() {
        let (mut store, ids) = store_with_columns(&["To Do", "Done"]);
        let before = snapshot(&store);

        // Version jumps from 0 to 5: frames were missed.
        store.apply_remote(&BoardEvent::ColumnsReordered {
            board_id: store.board_id(),
            column_order: vec![ids[1], ids[0]],
            version: 5,
        });

        assert!(store.needs_refresh());
        // The gapped frame was not applied.
        assert_eq!(snapshot(&store), before);
    }

    #[test]
    fn test_remote_event_for_other_board_is_ignored() {
        let (mut store, _) = store_with_columns(&["To Do"]);
        let before = snapshot(&store);

        store.apply_remote(&BoardEvent::ColumnsReordered {
            board_id: Uuid::new_v4(),
            column_order: vec![],
            version: 99,
        });

        assert_eq!(snapshot(&store), before);
        assert_eq!(store.version(), 0);
        assert!(!store.needs_refresh());
    }

    #[test]
    fn test_stale_remote_move_invalidates_mirror() {
        let (mut store, ids) = store_with_columns(&["To Do", "Done"]);

        // A move for a task we never saw: mirror is out of sync.
        store.apply_remote(&BoardEvent::TaskMoved {
            board_id: store.board_id(),
            task_id: Uuid::new_v4(),
            source_column_id: ids[0],
            dest_column_id: ids[1],
            dest_index: 0,
            version: 1,
        });

        assert!(store.needs_refresh());
    }

    #[test]
    fn test_refresh_resets_journal_and_flag() {
        let (mut store, ids) = store_with_columns(&["To Do"]);
        let op = store
            .apply_local(LocalMutation::DeleteColumn { column_id: ids[0] })
            .unwrap();
        store.reject(op).unwrap();
        assert!(store.needs_refresh());

        let mut columns = Vec::new();
        let mut order = Vec::new();
        engine::push_column(&mut columns, &mut order, Uuid::new_v4(), "Fresh").unwrap();
        store.refresh(columns, order, 7);

        assert!(!store.needs_refresh());
        assert_eq!(store.version(), 7);
        assert_eq!(store.pending_ops(), 0);
        assert_eq!(store.columns().len(), 1);
    }

    #[test]
    fn test_unknown_op_ids_are_errors() {
        let (mut store, _) = store_with_columns(&["To Do"]);
        assert_eq!(store.confirm(42, 1), Err(StoreError::UnknownOp(42)));
        assert_eq!(store.reject(42), Err(StoreError::UnknownOp(42)));
    }

    #[test]
    fn test_independent_stores_do_not_share_state() {
        let (mut store_a, ids_a) = store_with_columns(&["To Do"]);
        let (store_b, _) = store_with_columns(&["To Do"]);

        store_a
            .apply_local(LocalMutation::CreateTask {
                task_id: Uuid::new_v4(),
                column_id: ids_a[0],
            })
            .unwrap();

        assert_eq!(store_a.columns()[0].task_ids.len(), 1);
        assert!(store_b.columns()[0].task_ids.is_empty());
    }
}
