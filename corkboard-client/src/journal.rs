/// Optimistic transaction journal
///
/// Each optimistic mutation records its inverse here before it is applied
/// to the mirror. Confirmation drops the entry; rejection pops it and
/// applies the inverse, but only when the rejected operation is the
/// newest one. Once later mutations are layered on top, the recorded
/// inverse no longer matches the structure it would be applied to, and the
/// store falls back to a full re-fetch instead.

use std::collections::VecDeque;

use uuid::Uuid;

/// Identifier of a pending optimistic operation
pub type OpId = u64;

/// The recorded undo of an optimistic mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inverse {
    /// Undo a column creation
    RemoveColumn { column_id: Uuid },

    /// Undo a column reorder
    RestoreColumnOrder { column_order: Vec<Uuid> },

    /// Undo a task creation
    RemoveTask { task_id: Uuid },

    /// Undo a task deletion
    InsertTaskAt {
        column_id: Uuid,
        index: usize,
        task_id: Uuid,
    },

    /// Undo a move: put the task back where it was
    MoveTaskBack {
        task_id: Uuid,
        column_id: Uuid,
        index: usize,
    },

    /// No computable inverse; rejection forces a re-fetch
    Refetch,
}

/// A journaled optimistic operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    /// Operation id handed back to the caller
    pub op_id: OpId,

    /// How to undo it
    pub inverse: Inverse,
}

/// FIFO journal of pending optimistic operations
#[derive(Debug, Default)]
pub struct Journal {
    entries: VecDeque<JournalEntry>,
    next_id: OpId,
}

impl Journal {
    /// Creates an empty journal
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an operation's inverse; returns its op id
    pub fn begin(&mut self, inverse: Inverse) -> OpId {
        let op_id = self.next_id;
        self.next_id += 1;
        self.entries.push_back(JournalEntry { op_id, inverse });
        op_id
    }

    /// Drops a confirmed operation; returns false if unknown
    pub fn confirm(&mut self, op_id: OpId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.op_id != op_id);
        self.entries.len() != before
    }

    /// Pops the newest entry if it matches `op_id`
    ///
    /// Returns `None` when the op is not the newest (or unknown); the
    /// caller must decide between fallback and error via [`contains`].
    ///
    /// [`contains`]: Journal::contains
    pub fn pop_newest(&mut self, op_id: OpId) -> Option<Inverse> {
        if self.entries.back().map(|e| e.op_id) == Some(op_id) {
            self.entries.pop_back().map(|e| e.inverse)
        } else {
            None
        }
    }

    /// Whether an operation is still pending
    pub fn contains(&self, op_id: OpId) -> bool {
        self.entries.iter().any(|e| e.op_id == op_id)
    }

    /// Number of pending operations
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every pending entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_assigns_increasing_ids() {
        let mut journal = Journal::new();
        let a = journal.begin(Inverse::Refetch);
        let b = journal.begin(Inverse::Refetch);
        assert!(b > a);
        assert_eq!(journal.len(), 2);
    }

    #[test]
    fn test_confirm_removes_entry() {
        let mut journal = Journal::new();
        let a = journal.begin(Inverse::Refetch);
        let b = journal.begin(Inverse::Refetch);

        assert!(journal.confirm(a));
        assert!(!journal.confirm(a));
        assert!(journal.contains(b));
        assert_eq!(journal.len(), 1);
    }

    #[test]
    fn test_pop_newest_only_pops_the_tail() {
        let mut journal = Journal::new();
        let a = journal.begin(Inverse::RemoveTask {
            task_id: Uuid::new_v4(),
        });
        let b = journal.begin(Inverse::Refetch);

        // Not the newest: untouched.
        assert!(journal.pop_newest(a).is_none());
        assert_eq!(journal.len(), 2);

        assert_eq!(journal.pop_newest(b), Some(Inverse::Refetch));
        assert!(journal.pop_newest(a).is_some());
        assert!(journal.is_empty());
    }
}
