/// Pure board ordering engine
///
/// Operations over a board's embedded column structure: an ordered `Vec` of
/// [`Column`]s and a `column_order` list that must always be a permutation of
/// the column ids. Within a column, display order is the array order of
/// `task_ids`: there is no separate sort key.
///
/// Every function here is synchronous and side-effect free. Callers own
/// persistence, authorization, and retry policy. The same code runs on the
/// server (inside a transaction, guarded by the board version counter) and in
/// the client mirror store (optimistic application and remote replay).
///
/// # Invariants
///
/// - `column_order` is a permutation of the ids in `columns` (same set, same
///   cardinality) after every successful operation.
/// - A task id appears in exactly one column's `task_ids`, at exactly one
///   position.
/// - Cross-column moves are a single remove-then-insert; no intermediate
///   state with the task in zero or two columns is ever observable.
///
/// # Example
///
/// ```
/// use corkboard_shared::board::engine;
/// use uuid::Uuid;
///
/// let mut columns = Vec::new();
/// let mut order = Vec::new();
///
/// let todo = Uuid::new_v4();
/// engine::push_column(&mut columns, &mut order, todo, "To Do").unwrap();
///
/// let task = Uuid::new_v4();
/// let position = engine::append_task(&mut columns, todo, task).unwrap();
/// assert_eq!(position, 0);
/// ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named bucket within a board holding an ordered list of task ids.
///
/// `order` is a denormalized copy of the column's index in `column_order`;
/// the board-level `column_order` list is authoritative for display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column id
    pub id: Uuid,

    /// Display title
    pub title: String,

    /// Denormalized index within `column_order`
    pub order: i32,

    /// Ordered task ids; array order is the authoritative task position
    pub task_ids: Vec<Uuid>,
}

impl Column {
    /// Creates an empty column with the given id and title
    pub fn new(id: Uuid, title: impl Into<String>, order: i32) -> Self {
        Self {
            id,
            title: title.into(),
            order,
            task_ids: Vec::new(),
        }
    }
}

/// Structural errors reported by the engine
///
/// The persistence layer maps these onto the API taxonomy: unknown ids are
/// NotFound, shape violations are ValidationError, and [`StaleMove`] is a
/// Conflict, a signal for the caller to reconcile, never a silent removal
/// of the wrong element.
///
/// [`StaleMove`]: EngineError::StaleMove
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Column title is empty or whitespace-only
    #[error("column title cannot be empty")]
    EmptyTitle,

    /// Referenced column id does not exist on this board
    #[error("unknown column {0}")]
    UnknownColumn(Uuid),

    /// Referenced task id is not on this board
    #[error("unknown task {0}")]
    UnknownTask(Uuid),

    /// Proposed column_order is not a permutation of the current column ids
    #[error("column order is not a permutation of the board's column ids")]
    NotPermutation,

    /// The task is not in the column the caller claims it is in
    #[error("task {task_id} is not in column {column_id}")]
    StaleMove { task_id: Uuid, column_id: Uuid },
}

/// Appends a new empty column and registers it in `column_order`.
///
/// The caller supplies the id so that the server and a replaying client
/// mirror produce identical structures.
pub fn push_column(
    columns: &mut Vec<Column>,
    column_order: &mut Vec<Uuid>,
    id: Uuid,
    title: &str,
) -> Result<(), EngineError> {
    if title.trim().is_empty() {
        return Err(EngineError::EmptyTitle);
    }

    let order = columns.len() as i32;
    columns.push(Column::new(id, title.trim(), order));
    column_order.push(id);
    Ok(())
}

/// Replaces `column_order` with `new_order`.
///
/// `new_order` must be exactly a permutation of the current column ids:
/// same set, same cardinality, no duplicates. On success each column's
/// denormalized `order` field is rewritten to its index in the new order.
/// On failure the structure is left untouched.
pub fn reorder_columns(
    columns: &mut [Column],
    column_order: &mut Vec<Uuid>,
    new_order: &[Uuid],
) -> Result<(), EngineError> {
    if new_order.len() != columns.len() {
        return Err(EngineError::NotPermutation);
    }

    for id in new_order {
        if !columns.iter().any(|c| c.id == *id) {
            return Err(EngineError::NotPermutation);
        }
    }

    // Same cardinality + every id known + no duplicates == permutation
    let mut seen = Vec::with_capacity(new_order.len());
    for id in new_order {
        if seen.contains(id) {
            return Err(EngineError::NotPermutation);
        }
        seen.push(*id);
    }

    *column_order = new_order.to_vec();
    for column in columns.iter_mut() {
        if let Some(index) = column_order.iter().position(|id| *id == column.id) {
            column.order = index as i32;
        }
    }

    Ok(())
}

/// Removes a column and its `column_order` entry.
///
/// Returns the task ids the column held; the caller owns their cascade
/// deletion. Remaining columns keep their relative order and get their
/// denormalized `order` rewritten.
pub fn remove_column(
    columns: &mut Vec<Column>,
    column_order: &mut Vec<Uuid>,
    column_id: Uuid,
) -> Result<Vec<Uuid>, EngineError> {
    let index = columns
        .iter()
        .position(|c| c.id == column_id)
        .ok_or(EngineError::UnknownColumn(column_id))?;

    let removed = columns.remove(index);
    column_order.retain(|id| *id != column_id);

    for column in columns.iter_mut() {
        if let Some(i) = column_order.iter().position(|id| *id == column.id) {
            column.order = i as i32;
        }
    }

    Ok(removed.task_ids)
}

/// Appends a task id to the end of a column's `task_ids`.
///
/// Returns the task's position (the previous list length).
pub fn append_task(
    columns: &mut [Column],
    column_id: Uuid,
    task_id: Uuid,
) -> Result<usize, EngineError> {
    let column = column_mut(columns, column_id)?;
    let position = column.task_ids.len();
    column.task_ids.push(task_id);
    Ok(position)
}

/// Inserts a task id into a column at `index`, clamped to `[0, len]`.
///
/// Returns the effective insertion index.
pub fn insert_task_at(
    columns: &mut [Column],
    column_id: Uuid,
    task_id: Uuid,
    index: usize,
) -> Result<usize, EngineError> {
    let column = column_mut(columns, column_id)?;
    let index = index.min(column.task_ids.len());
    column.task_ids.insert(index, task_id);
    Ok(index)
}

/// Removes a task id from whichever column holds it (id-based, not
/// positional).
///
/// Returns the `(column_id, index)` the task was removed from.
pub fn remove_task(columns: &mut [Column], task_id: Uuid) -> Result<(Uuid, usize), EngineError> {
    for column in columns.iter_mut() {
        if let Some(index) = column.task_ids.iter().position(|id| *id == task_id) {
            column.task_ids.remove(index);
            return Ok((column.id, index));
        }
    }
    Err(EngineError::UnknownTask(task_id))
}

/// Locates a task, returning the `(column_id, index)` holding it.
pub fn locate_task(columns: &[Column], task_id: Uuid) -> Option<(Uuid, usize)> {
    for column in columns {
        if let Some(index) = column.task_ids.iter().position(|id| *id == task_id) {
            return Some((column.id, index));
        }
    }
    None
}

/// Moves a task from `source_column_id` to `dest_column_id` at `dest_index`.
///
/// Removal is by id: the engine verifies the task currently sits in the
/// claimed source column and reports [`EngineError::StaleMove`] when it does
/// not: the caller-supplied view of the board has drifted and must be
/// reconciled. The insert index is clamped to `[0, len]` of the destination
/// after removal. Source and destination may be the same column.
///
/// Remove-then-insert happens within this single call, so the task is never
/// observable in zero or two columns.
///
/// Returns the effective destination index.
pub fn move_task(
    columns: &mut [Column],
    task_id: Uuid,
    source_column_id: Uuid,
    dest_column_id: Uuid,
    dest_index: usize,
) -> Result<usize, EngineError> {
    // Validate both endpoints before touching anything.
    column_mut(columns, source_column_id)?;
    column_mut(columns, dest_column_id)?;

    let source = column_mut(columns, source_column_id)?;
    let index = source
        .task_ids
        .iter()
        .position(|id| *id == task_id)
        .ok_or(EngineError::StaleMove {
            task_id,
            column_id: source_column_id,
        })?;
    source.task_ids.remove(index);

    let dest = column_mut(columns, dest_column_id)?;
    let index = dest_index.min(dest.task_ids.len());
    dest.task_ids.insert(index, task_id);
    Ok(index)
}

/// Checks the board-level structural invariant: `column_order` is a
/// permutation of the column ids, and no task id appears twice.
pub fn check_invariants(columns: &[Column], column_order: &[Uuid]) -> bool {
    if column_order.len() != columns.len() {
        return false;
    }
    for column in columns {
        if !column_order.contains(&column.id) {
            return false;
        }
    }
    let mut seen = Vec::new();
    for column in columns {
        for id in &column.task_ids {
            if seen.contains(id) {
                return false;
            }
            seen.push(*id);
        }
    }
    true
}

fn column_mut(columns: &mut [Column], column_id: Uuid) -> Result<&mut Column, EngineError> {
    columns
        .iter_mut()
        .find(|c| c.id == column_id)
        .ok_or(EngineError::UnknownColumn(column_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with_columns(titles: &[&str]) -> (Vec<Column>, Vec<Uuid>, Vec<Uuid>) {
        let mut columns = Vec::new();
        let mut order = Vec::new();
        let mut ids = Vec::new();
        for title in titles {
            let id = Uuid::new_v4();
            push_column(&mut columns, &mut order, id, title).unwrap();
            ids.push(id);
        }
        (columns, order, ids)
    }

    #[test]
    fn test_push_column_appends_and_registers() {
        let (columns, order, ids) = board_with_columns(&["To Do", "In Progress", "Done"]);

        assert_eq!(order, ids);
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].title, "To Do");
        assert_eq!(columns[2].order, 2);
        assert!(columns.iter().all(|c| c.task_ids.is_empty()));
        assert!(check_invariants(&columns, &order));
    }

    #[test]
    fn test_push_column_rejects_empty_title() {
        let mut columns = Vec::new();
        let mut order = Vec::new();
        let result = push_column(&mut columns, &mut order, Uuid::new_v4(), "   ");
        assert_eq!(result, Err(EngineError::EmptyTitle));
        assert!(columns.is_empty());
        assert!(order.is_empty());
    }

    #[test]
    fn test_reorder_columns_replaces_order_and_rewrites_indices() {
        let (mut columns, mut order, ids) = board_with_columns(&["To Do", "In Progress", "Done"]);
        let new_order = vec![ids[2], ids[0], ids[1]];

        reorder_columns(&mut columns, &mut order, &new_order).unwrap();

        assert_eq!(order, new_order);
        assert_eq!(columns[0].order, 1); // To Do is now second
        assert_eq!(columns[2].order, 0); // Done is now first
        assert!(check_invariants(&columns, &order));
    }

    #[test]
    fn test_reorder_columns_rejects_missing_id() {
        let (mut columns, mut order, ids) = board_with_columns(&["To Do", "In Progress", "Done"]);
        let before = order.clone();

        let result = reorder_columns(&mut columns, &mut order, &[ids[2], ids[0]]);

        assert_eq!(result, Err(EngineError::NotPermutation));
        assert_eq!(order, before);
    }

    #[test]
    fn test_reorder_columns_rejects_unknown_and_duplicate_ids() {
        let (mut columns, mut order, ids) = board_with_columns(&["A", "B"]);

        let unknown = vec![ids[0], Uuid::new_v4()];
        assert_eq!(
            reorder_columns(&mut columns, &mut order, &unknown),
            Err(EngineError::NotPermutation)
        );

        let duplicate = vec![ids[0], ids[0]];
        assert_eq!(
            reorder_columns(&mut columns, &mut order, &duplicate),
            Err(EngineError::NotPermutation)
        );
        assert_eq!(order, ids);
    }

    #[test]
    fn test_remove_column_returns_orphaned_tasks() {
        let (mut columns, mut order, ids) = board_with_columns(&["To Do", "Done"]);
        let t1 = Uuid::new_v4();
        let t2 = Uuid::new_v4();
        append_task(&mut columns, ids[0], t1).unwrap();
        append_task(&mut columns, ids[0], t2).unwrap();

        let orphans = remove_column(&mut columns, &mut order, ids[0]).unwrap();

        assert_eq!(orphans, vec![t1, t2]);
        assert_eq!(order, vec![ids[1]]);
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].order, 0);
        assert!(check_invariants(&columns, &order));
    }

    #[test]
    fn test_remove_column_unknown_id() {
        let (mut columns, mut order, _) = board_with_columns(&["To Do"]);
        let bogus = Uuid::new_v4();
        assert_eq!(
            remove_column(&mut columns, &mut order, bogus),
            Err(EngineError::UnknownColumn(bogus))
        );
    }

    #[test]
    fn test_append_task_returns_position() {
        let (mut columns, _, ids) = board_with_columns(&["To Do"]);
        let t1 = Uuid::new_v4();
        let t2 = Uuid::new_v4();

        assert_eq!(append_task(&mut columns, ids[0], t1).unwrap(), 0);
        assert_eq!(append_task(&mut columns, ids[0], t2).unwrap(), 1);
        assert_eq!(columns[0].task_ids, vec![t1, t2]);
    }

    #[test]
    fn test_move_task_across_columns() {
        let (mut columns, order, ids) = board_with_columns(&["To Do", "In Progress", "Done"]);
        let task = Uuid::new_v4();
        append_task(&mut columns, ids[0], task).unwrap();

        let index = move_task(&mut columns, task, ids[0], ids[2], 0).unwrap();

        assert_eq!(index, 0);
        assert!(columns[0].task_ids.is_empty());
        assert_eq!(columns[2].task_ids, vec![task]);
        assert!(check_invariants(&columns, &order));
    }

    #[test]
    fn test_move_task_within_column_reorders() {
        let (mut columns, _, ids) = board_with_columns(&["To Do"]);
        let tasks: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        for t in &tasks {
            append_task(&mut columns, ids[0], *t).unwrap();
        }

        // Move the first task to the end.
        move_task(&mut columns, tasks[0], ids[0], ids[0], 2).unwrap();

        assert_eq!(columns[0].task_ids, vec![tasks[1], tasks[2], tasks[0]]);
    }

    #[test]
    fn test_move_task_is_idempotent_at_fixed_destination() {
        let (mut columns, _, ids) = board_with_columns(&["To Do", "Done"]);
        let tasks: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        for t in &tasks {
            append_task(&mut columns, ids[1], *t).unwrap();
        }

        move_task(&mut columns, tasks[2], ids[1], ids[1], 1).unwrap();
        let after_first = columns.clone();
        move_task(&mut columns, tasks[2], ids[1], ids[1], 1).unwrap();

        assert_eq!(columns, after_first);
    }

    #[test]
    fn test_move_task_clamps_destination_index() {
        let (mut columns, _, ids) = board_with_columns(&["To Do", "Done"]);
        let task = Uuid::new_v4();
        append_task(&mut columns, ids[0], task).unwrap();

        let index = move_task(&mut columns, task, ids[0], ids[1], 99).unwrap();

        assert_eq!(index, 0);
        assert_eq!(columns[1].task_ids, vec![task]);
    }

    #[test]
    fn test_move_task_stale_source_is_rejected_without_mutation() {
        let (mut columns, _, ids) = board_with_columns(&["To Do", "Done"]);
        let task = Uuid::new_v4();
        append_task(&mut columns, ids[1], task).unwrap();
        let before = columns.clone();

        // Caller believes the task is still in "To Do"; it has moved.
        let result = move_task(&mut columns, task, ids[0], ids[1], 0);

        assert_eq!(
            result,
            Err(EngineError::StaleMove {
                task_id: task,
                column_id: ids[0],
            })
        );
        assert_eq!(columns, before);
    }

    #[test]
    fn test_move_task_unknown_columns() {
        let (mut columns, _, ids) = board_with_columns(&["To Do"]);
        let task = Uuid::new_v4();
        append_task(&mut columns, ids[0], task).unwrap();
        let bogus = Uuid::new_v4();

        assert_eq!(
            move_task(&mut columns, task, bogus, ids[0], 0),
            Err(EngineError::UnknownColumn(bogus))
        );
        assert_eq!(
            move_task(&mut columns, task, ids[0], bogus, 0),
            Err(EngineError::UnknownColumn(bogus))
        );
    }

    #[test]
    fn test_remove_task_by_id() {
        let (mut columns, _, ids) = board_with_columns(&["To Do", "Done"]);
        let t1 = Uuid::new_v4();
        let t2 = Uuid::new_v4();
        append_task(&mut columns, ids[1], t1).unwrap();
        append_task(&mut columns, ids[1], t2).unwrap();

        let (column_id, index) = remove_task(&mut columns, t2).unwrap();

        assert_eq!(column_id, ids[1]);
        assert_eq!(index, 1);
        assert_eq!(columns[1].task_ids, vec![t1]);
        assert_eq!(
            remove_task(&mut columns, Uuid::nil()),
            Err(EngineError::UnknownTask(Uuid::nil()))
        );
    }

    #[test]
    fn test_insert_task_at_clamps() {
        let (mut columns, _, ids) = board_with_columns(&["To Do"]);
        let t1 = Uuid::new_v4();
        let t2 = Uuid::new_v4();
        append_task(&mut columns, ids[0], t1).unwrap();

        let index = insert_task_at(&mut columns, ids[0], t2, 50).unwrap();

        assert_eq!(index, 1);
        assert_eq!(columns[0].task_ids, vec![t1, t2]);
    }

    #[test]
    fn test_permutation_invariant_under_mixed_operations() {
        let (mut columns, mut order, ids) = board_with_columns(&["A", "B", "C"]);

        let extra = Uuid::new_v4();
        push_column(&mut columns, &mut order, extra, "D").unwrap();
        reorder_columns(&mut columns, &mut order, &[extra, ids[1], ids[0], ids[2]]).unwrap();
        remove_column(&mut columns, &mut order, ids[1]).unwrap();

        assert!(check_invariants(&columns, &order));
        assert_eq!(order, vec![extra, ids[0], ids[2]]);
        assert_eq!(columns.iter().filter(|c| c.order == 0).count(), 1);
    }

    #[test]
    fn test_default_board_scenario() {
        // Create project "Eng" -> default board columns in order, then a task
        // in "To Do" moved to "Done" at index 0.
        let (mut columns, order, ids) = board_with_columns(&["To Do", "In Progress", "Done"]);
        let titles: Vec<&str> = order
            .iter()
            .map(|id| {
                columns
                    .iter()
                    .find(|c| c.id == *id)
                    .map(|c| c.title.as_str())
                    .unwrap()
            })
            .collect();
        assert_eq!(titles, vec!["To Do", "In Progress", "Done"]);

        let task = Uuid::new_v4();
        let position = append_task(&mut columns, ids[0], task).unwrap();
        assert_eq!(position, 0);
        assert_eq!(columns[0].task_ids, vec![task]);

        let index = move_task(&mut columns, task, ids[0], ids[2], 0).unwrap();
        assert_eq!(index, 0);
        assert!(columns[0].task_ids.is_empty());
        assert_eq!(columns[2].task_ids, vec![task]);
    }

    #[test]
    fn test_column_serde_round_trip() {
        let column = Column {
            id: Uuid::new_v4(),
            title: "To Do".to_string(),
            order: 0,
            task_ids: vec![Uuid::new_v4()],
        };

        let json = serde_json::to_string(&column).unwrap();
        let back: Column = serde_json::from_str(&json).unwrap();
        assert_eq!(column, back);
    }
}
