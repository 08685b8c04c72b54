/// Task model and database operations
///
/// Tasks carry a denormalized `(column_id, position)` pair duplicating the
/// authoritative ordering in their column's `task_ids`. Every operation that
/// changes column membership or ordering writes the board document and
/// resynchronizes the affected task rows in one transaction, so the pair can
/// never diverge from `task_ids`.
///
/// Cross-column movement happens only through [`Task::move_to`];
/// create/update never change column membership as a side effect.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     board_id UUID NOT NULL REFERENCES boards(id),
///     project_id UUID NOT NULL REFERENCES projects(id),
///     column_id UUID NOT NULL,
///     position INTEGER NOT NULL DEFAULT 0,
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     assigned_to UUID[] NOT NULL DEFAULT '{}',
///     due_date TIMESTAMPTZ,
///     labels JSONB NOT NULL DEFAULT '[]',
///     created_by UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::board::engine;
use crate::models::board::{delete_tasks_cascade, Board};
use crate::models::ModelError;

const TASK_COLUMNS: &str = "id, board_id, project_id, column_id, position, title, description, \
     assigned_to, due_date, labels, created_by, created_at, updated_at";

/// A colored label attached to a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Label text
    pub name: String,

    /// Display color (e.g. "#ff6b6b")
    pub color: String,
}

/// Task model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Owning board
    pub board_id: Uuid,

    /// Owning project (denormalized for access checks)
    pub project_id: Uuid,

    /// Column currently holding this task; matches the column whose
    /// `task_ids` contains the id
    pub column_id: Uuid,

    /// Index within that column's `task_ids`
    pub position: i32,

    /// Display title
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// Assigned user ids
    pub assigned_to: Vec<Uuid>,

    /// Optional due date
    pub due_date: Option<DateTime<Utc>>,

    /// Labels
    pub labels: Json<Vec<Label>>,

    /// User who created the task (null if the user was deleted)
    pub created_by: Option<Uuid>,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new task
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTask {
    /// Board to create the task on
    pub board_id: Uuid,

    /// Column to append the task to
    pub column_id: Uuid,

    /// Display title
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// Assigned user ids
    #[serde(default)]
    pub assigned_to: Vec<Uuid>,

    /// Optional due date
    pub due_date: Option<DateTime<Utc>>,

    /// Labels
    #[serde(default)]
    pub labels: Vec<Label>,

    /// Creating user
    pub created_by: Option<Uuid>,
}

/// Input for updating task fields
///
/// Absent fields are left unchanged. Column membership and position are
/// deliberately not here; they move only through [`Task::move_to`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTask {
    /// New title
    pub title: Option<String>,

    /// New description
    pub description: Option<String>,

    /// New assignee set
    pub assigned_to: Option<Vec<Uuid>>,

    /// New due date
    pub due_date: Option<DateTime<Utc>>,

    /// New labels
    pub labels: Option<Vec<Label>>,
}

impl Task {
    /// Creates a task appended to the end of a column
    ///
    /// The task id is pushed onto the column's `task_ids` and the row is
    /// inserted with `position` equal to the column's previous length, in
    /// one transaction guarded by the board version.
    ///
    /// # Errors
    ///
    /// - [`ModelError::NotFound`] if the board is missing
    /// - [`ModelError::Engine`] if the column is unknown on that board
    /// - [`ModelError::Conflict`] if the board changed concurrently
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<(Self, Board), ModelError> {
        let board = Board::find_by_id(pool, data.board_id)
            .await?
            .ok_or(ModelError::NotFound("board"))?;

        let task_id = Uuid::new_v4();
        let mut columns = board.columns.0;
        let column_order = board.column_order.0;
        let position = engine::append_task(&mut columns, data.column_id, task_id)?;

        let mut tx = pool.begin().await?;
        let updated_board =
            Board::persist_document(&mut *tx, board.id, board.version, &columns, &column_order)
                .await?;

        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (id, board_id, project_id, column_id, position, title,
                               description, assigned_to, due_date, labels, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {TASK_COLUMNS}
            "#,
        ))
        .bind(task_id)
        .bind(board.id)
        .bind(board.project_id)
        .bind(data.column_id)
        .bind(position as i32)
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.assigned_to)
        .bind(data.due_date)
        .bind(Json(data.labels.clone()))
        .bind(data.created_by)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((task, updated_board))
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists all tasks of a board, ordered by column and position
    pub async fn list_by_board(pool: &PgPool, board_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE board_id = $1 ORDER BY column_id, position"
        ))
        .bind(board_id)
        .fetch_all(pool)
        .await
    }

    /// Updates task fields without touching column membership
    pub async fn update(pool: &PgPool, id: Uuid, data: UpdateTask) -> Result<Self, ModelError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                assigned_to = COALESCE($4, assigned_to),
                due_date = COALESCE($5, due_date),
                labels = COALESCE($6, labels),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.assigned_to)
        .bind(data.due_date)
        .bind(data.labels.map(Json))
        .fetch_optional(pool)
        .await?;

        task.ok_or(ModelError::NotFound("task"))
    }

    /// Moves a task between (or within) columns
    ///
    /// The single remove-then-insert of the engine is persisted as one
    /// board-document write plus a position resync of the affected columns,
    /// all inside one transaction. Removal is by id: if the task is no
    /// longer in `source_column_id` the caller's view has drifted and the
    /// operation fails with a conflict-class error instead of touching the
    /// wrong element.
    ///
    /// Returns the updated task and board.
    pub async fn move_to(
        pool: &PgPool,
        task_id: Uuid,
        source_column_id: Uuid,
        dest_column_id: Uuid,
        dest_index: usize,
    ) -> Result<(Self, Board), ModelError> {
        let task = Self::find_by_id(pool, task_id)
            .await?
            .ok_or(ModelError::NotFound("task"))?;
        let board = Board::find_by_id(pool, task.board_id)
            .await?
            .ok_or(ModelError::NotFound("board"))?;

        let mut columns = board.columns.0;
        let column_order = board.column_order.0;
        engine::move_task(&mut columns, task_id, source_column_id, dest_column_id, dest_index)?;

        let mut tx = pool.begin().await?;
        let updated_board =
            Board::persist_document(&mut *tx, board.id, board.version, &columns, &column_order)
                .await?;

        // Resync (column_id, position) for both affected columns from the
        // authoritative task_ids ordering.
        for column in updated_board.columns.0.iter() {
            if column.id == source_column_id || column.id == dest_column_id {
                resync_positions(&mut tx, column.id, &column.task_ids).await?;
            }
        }

        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(task_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((task, updated_board))
    }

    /// Deletes a task, removing its id from the owning column's `task_ids`
    ///
    /// Returns the updated board and the column the task was removed from.
    pub async fn delete(pool: &PgPool, task_id: Uuid) -> Result<(Board, Uuid), ModelError> {
        let task = Self::find_by_id(pool, task_id)
            .await?
            .ok_or(ModelError::NotFound("task"))?;
        let board = Board::find_by_id(pool, task.board_id)
            .await?
            .ok_or(ModelError::NotFound("board"))?;

        let mut columns = board.columns.0;
        let column_order = board.column_order.0;
        let (column_id, _) = engine::remove_task(&mut columns, task_id)?;

        let mut tx = pool.begin().await?;
        let updated_board =
            Board::persist_document(&mut *tx, board.id, board.version, &columns, &column_order)
                .await?;

        delete_tasks_cascade(&mut tx, &[task_id]).await?;

        if let Some(column) = updated_board.columns.0.iter().find(|c| c.id == column_id) {
            resync_positions(&mut tx, column.id, &column.task_ids).await?;
        }

        tx.commit().await?;
        Ok((updated_board, column_id))
    }
}

/// Rewrites `(column_id, position)` of the listed tasks from their index in
/// the column's `task_ids`
async fn resync_positions(
    tx: &mut Transaction<'_, Postgres>,
    column_id: Uuid,
    task_ids: &[Uuid],
) -> Result<(), sqlx::Error> {
    if task_ids.is_empty() {
        return Ok(());
    }

    sqlx::query(
        r#"
        UPDATE tasks
        SET column_id = $1,
            position = (u.ord - 1)::int,
            updated_at = NOW()
        FROM (SELECT id, ord FROM unnest($2::uuid[]) WITH ORDINALITY AS t(id, ord)) AS u
        WHERE tasks.id = u.id
        "#,
    )
    .bind(column_id)
    .bind(task_ids)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_serde_round_trip() {
        let label = Label {
            name: "bug".to_string(),
            color: "#ff6b6b".to_string(),
        };
        let json = serde_json::to_string(&label).unwrap();
        let back: Label = serde_json::from_str(&json).unwrap();
        assert_eq!(label, back);
    }

    #[test]
    fn test_create_task_defaults() {
        let json = serde_json::json!({
            "board_id": Uuid::new_v4(),
            "column_id": Uuid::new_v4(),
            "title": "Fix bug",
        });
        let data: CreateTask = serde_json::from_value(json).unwrap();
        assert!(data.assigned_to.is_empty());
        assert!(data.labels.is_empty());
        assert!(data.due_date.is_none());
    }

    #[test]
    fn test_update_task_absent_fields_are_none() {
        let data: UpdateTask = serde_json::from_str("{\"title\": \"New\"}").unwrap();
        assert_eq!(data.title.as_deref(), Some("New"));
        assert!(data.description.is_none());
        assert!(data.assigned_to.is_none());
        assert!(data.labels.is_none());
    }

    // Database-backed tests live in tests/board_store_tests.rs and require
    // a running PostgreSQL instance.
}
