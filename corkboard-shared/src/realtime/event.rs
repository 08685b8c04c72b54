/// Mutation event descriptors
///
/// The compact payloads relayed to room subscribers after a mutation is
/// applied. Each variant carries the minimal fields a remote mirror needs to
/// replay the change: for a move, the task id, source and destination
/// columns, and the destination index; structural events also carry the new
/// board version so clients can detect missed updates and re-fetch.
///
/// Wire format is `{"event": "<name>", "data": {...}}`, e.g.:
///
/// ```json
/// {"event":"task:moved","data":{"board_id":"...","task_id":"...",
///  "source_column_id":"...","dest_column_id":"...","dest_index":0,"version":7}}
/// ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::Column;
use crate::models::comment::Comment;
use crate::models::task::Task;

/// Room-scoped mutation descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum BoardEvent {
    /// A column was appended to the board
    #[serde(rename = "column:created")]
    ColumnCreated {
        board_id: Uuid,
        column: Column,
        version: i64,
    },

    /// The board's column order was replaced
    #[serde(rename = "column:reordered")]
    ColumnsReordered {
        board_id: Uuid,
        column_order: Vec<Uuid>,
        version: i64,
    },

    /// A column and all tasks it held were deleted
    #[serde(rename = "column:deleted")]
    ColumnDeleted {
        board_id: Uuid,
        column_id: Uuid,
        removed_task_ids: Vec<Uuid>,
        version: i64,
    },

    /// A task was appended to a column
    #[serde(rename = "task:created")]
    TaskCreated {
        board_id: Uuid,
        column_id: Uuid,
        task: Task,
        version: i64,
    },

    /// Task fields changed (column membership untouched)
    #[serde(rename = "task:updated")]
    TaskUpdated { board_id: Uuid, task: Task },

    /// A task moved between (or within) columns
    #[serde(rename = "task:moved")]
    TaskMoved {
        board_id: Uuid,
        task_id: Uuid,
        source_column_id: Uuid,
        dest_column_id: Uuid,
        dest_index: usize,
        version: i64,
    },

    /// A task was deleted
    #[serde(rename = "task:deleted")]
    TaskDeleted {
        board_id: Uuid,
        column_id: Uuid,
        task_id: Uuid,
        version: i64,
    },

    /// A comment was added to a task
    #[serde(rename = "comment:added")]
    CommentAdded {
        board_id: Uuid,
        task_id: Uuid,
        comment: Comment,
    },

    /// A board was created in the project (project-room scoped)
    #[serde(rename = "board:created")]
    BoardCreated { project_id: Uuid, board_id: Uuid },

    /// A board was deleted (project-room scoped)
    #[serde(rename = "board:deleted")]
    BoardDeleted { project_id: Uuid, board_id: Uuid },

    /// A member joined the project (project-room scoped)
    #[serde(rename = "member:added")]
    MemberAdded { project_id: Uuid, user_id: Uuid },
}

impl BoardEvent {
    /// Short event name for logging
    pub fn name(&self) -> &'static str {
        match self {
            BoardEvent::ColumnCreated { .. } => "column:created",
            BoardEvent::ColumnsReordered { .. } => "column:reordered",
            BoardEvent::ColumnDeleted { .. } => "column:deleted",
            BoardEvent::TaskCreated { .. } => "task:created",
            BoardEvent::TaskUpdated { .. } => "task:updated",
            BoardEvent::TaskMoved { .. } => "task:moved",
            BoardEvent::TaskDeleted { .. } => "task:deleted",
            BoardEvent::CommentAdded { .. } => "comment:added",
            BoardEvent::BoardCreated { .. } => "board:created",
            BoardEvent::BoardDeleted { .. } => "board:deleted",
            BoardEvent::MemberAdded { .. } => "member:added",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_moved_wire_format() {
        let event = BoardEvent::TaskMoved {
            board_id: Uuid::new_v4(),
            task_id: Uuid::new_v4(),
            source_column_id: Uuid::new_v4(),
            dest_column_id: Uuid::new_v4(),
            dest_index: 2,
            version: 7,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "task:moved");
        assert_eq!(json["data"]["dest_index"], 2);
        assert_eq!(json["data"]["version"], 7);
    }

    #[test]
    fn test_event_round_trip() {
        let event = BoardEvent::ColumnsReordered {
            board_id: Uuid::new_v4(),
            column_order: vec![Uuid::new_v4(), Uuid::new_v4()],
            version: 1,
        };

        let json = serde_json::to_string(&event).unwrap();
        let back: BoardEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name(), "column:reordered");
    }

    #[test]
    fn test_event_names_match_wire_tags() {
        let event = BoardEvent::MemberAdded {
            project_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], event.name());
    }
}
