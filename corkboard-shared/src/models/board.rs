/// Board model and database operations
///
/// A board is stored as one row embedding its column structure: `columns`
/// (ordered list of [`Column`]) and `column_order` (a permutation of the
/// column ids) as JSONB, plus a `version` counter. Every document write is
/// conditional on the version that was read:
///
/// ```sql
/// UPDATE boards SET columns = $3, column_order = $4, version = version + 1
/// WHERE id = $1 AND version = $2
/// ```
///
/// Zero rows affected means another request won the race; the caller gets
/// [`ModelError::Conflict`] and owns retry/reconcile policy. Writes that
/// also touch task rows (column deletion cascades, position resync) run in
/// one transaction with the document write.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE boards (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id),
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     columns JSONB NOT NULL DEFAULT '[]',
///     column_order JSONB NOT NULL DEFAULT '[]',
///     version BIGINT NOT NULL DEFAULT 0,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::board::{engine, Column};
use crate::models::ModelError;

/// Titles of the columns every project's default board starts with
pub const DEFAULT_COLUMN_TITLES: [&str; 3] = ["To Do", "In Progress", "Done"];

const BOARD_COLUMNS: &str =
    "id, project_id, title, description, columns, column_order, version, created_at, updated_at";

/// Board document embedding its column structure
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Board {
    /// Unique board ID
    pub id: Uuid,

    /// Owning project
    pub project_id: Uuid,

    /// Display title
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// Ordered column list
    pub columns: Json<Vec<Column>>,

    /// Display order; always a permutation of the column ids
    pub column_order: Json<Vec<Uuid>>,

    /// Optimistic concurrency counter, bumped on every document write
    pub version: i64,

    /// When the board was created
    pub created_at: DateTime<Utc>,

    /// When the board was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new board
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBoard {
    /// Owning project
    pub project_id: Uuid,

    /// Display title
    pub title: String,

    /// Optional description
    pub description: Option<String>,
}

impl Board {
    /// Creates a board with no columns
    pub async fn create(pool: &PgPool, data: CreateBoard) -> Result<Self, ModelError> {
        let mut conn = pool.acquire().await?;
        Self::insert(&mut *conn, data, Vec::new()).await
    }

    /// Creates a board pre-populated with the default three columns
    ///
    /// Used by the project creation path, which must never produce a
    /// zero-column board. Runs on a connection so the caller can wrap it in
    /// the project-creation transaction.
    pub async fn create_with_default_columns(
        conn: &mut PgConnection,
        data: CreateBoard,
    ) -> Result<Self, ModelError> {
        let mut columns = Vec::new();
        let mut column_order = Vec::new();
        for title in DEFAULT_COLUMN_TITLES {
            engine::push_column(&mut columns, &mut column_order, Uuid::new_v4(), title)?;
        }
        Self::insert(conn, data, columns).await
    }

    async fn insert(
        conn: &mut PgConnection,
        data: CreateBoard,
        columns: Vec<Column>,
    ) -> Result<Self, ModelError> {
        let column_order: Vec<Uuid> = columns.iter().map(|c| c.id).collect();
        let board = sqlx::query_as::<_, Board>(&format!(
            r#"
            INSERT INTO boards (project_id, title, description, columns, column_order)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {BOARD_COLUMNS}
            "#,
        ))
        .bind(data.project_id)
        .bind(data.title)
        .bind(data.description)
        .bind(Json(columns))
        .bind(Json(column_order))
        .fetch_one(conn)
        .await?;

        Ok(board)
    }

    /// Finds a board by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Board>(&format!(
            "SELECT {BOARD_COLUMNS} FROM boards WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Lists boards of a project, oldest first
    pub async fn list_by_project(pool: &PgPool, project_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Board>(&format!(
            "SELECT {BOARD_COLUMNS} FROM boards WHERE project_id = $1 ORDER BY created_at ASC"
        ))
        .bind(project_id)
        .fetch_all(pool)
        .await
    }

    /// Appends a new empty column to the board
    ///
    /// Returns the updated board and the new column's id.
    pub async fn add_column(
        pool: &PgPool,
        board_id: Uuid,
        title: &str,
    ) -> Result<(Self, Uuid), ModelError> {
        let board = Self::find_by_id(pool, board_id)
            .await?
            .ok_or(ModelError::NotFound("board"))?;

        let mut columns = board.columns.0;
        let mut column_order = board.column_order.0;
        let column_id = Uuid::new_v4();
        engine::push_column(&mut columns, &mut column_order, column_id, title)?;

        let mut conn = pool.acquire().await?;
        let updated =
            Self::persist_document(&mut *conn, board_id, board.version, &columns, &column_order)
                .await?;
        Ok((updated, column_id))
    }

    /// Replaces the board's column order
    ///
    /// `new_order` must be an exact permutation of the current column ids;
    /// otherwise the board is left unchanged and a shape error is returned.
    pub async fn reorder_columns(
        pool: &PgPool,
        board_id: Uuid,
        new_order: &[Uuid],
    ) -> Result<Self, ModelError> {
        let board = Self::find_by_id(pool, board_id)
            .await?
            .ok_or(ModelError::NotFound("board"))?;

        let mut columns = board.columns.0;
        let mut column_order = board.column_order.0;
        engine::reorder_columns(&mut columns, &mut column_order, new_order)?;

        let mut conn = pool.acquire().await?;
        Self::persist_document(&mut *conn, board_id, board.version, &columns, &column_order).await
    }

    /// Deletes a column and cascades its tasks
    ///
    /// Every task whose id was in the column's `task_ids` is deleted along
    /// with its comments, in the same transaction as the document write.
    /// Returns the updated board and the deleted task ids.
    pub async fn delete_column(
        pool: &PgPool,
        board_id: Uuid,
        column_id: Uuid,
    ) -> Result<(Self, Vec<Uuid>), ModelError> {
        let board = Self::find_by_id(pool, board_id)
            .await?
            .ok_or(ModelError::NotFound("board"))?;

        let mut columns = board.columns.0;
        let mut column_order = board.column_order.0;
        let orphaned = engine::remove_column(&mut columns, &mut column_order, column_id)?;

        let mut tx = pool.begin().await?;
        let updated =
            Self::persist_document(&mut *tx, board_id, board.version, &columns, &column_order)
                .await?;
        delete_tasks_cascade(&mut tx, &orphaned).await?;
        tx.commit().await?;

        Ok((updated, orphaned))
    }

    /// Deletes the board, cascading its tasks and their comments
    pub async fn delete(pool: &PgPool, board_id: Uuid) -> Result<(), ModelError> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM comments
            WHERE task_id IN (SELECT id FROM tasks WHERE board_id = $1)
            "#,
        )
        .bind(board_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM tasks WHERE board_id = $1")
            .bind(board_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM boards WHERE id = $1")
            .bind(board_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ModelError::NotFound("board"));
        }

        tx.commit().await?;
        Ok(())
    }

    /// Writes the board document, conditional on the version the caller read
    ///
    /// The losing side of a concurrent write sees zero rows affected and
    /// gets [`ModelError::Conflict`].
    pub(crate) async fn persist_document(
        conn: &mut PgConnection,
        board_id: Uuid,
        expected_version: i64,
        columns: &[Column],
        column_order: &[Uuid],
    ) -> Result<Self, ModelError> {
        let board = sqlx::query_as::<_, Board>(&format!(
            r#"
            UPDATE boards
            SET columns = $3,
                column_order = $4,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $2
            RETURNING {BOARD_COLUMNS}
            "#,
        ))
        .bind(board_id)
        .bind(expected_version)
        .bind(Json(columns.to_vec()))
        .bind(Json(column_order.to_vec()))
        .fetch_optional(conn)
        .await?;

        board.ok_or(ModelError::Conflict)
    }
}

/// Deletes task rows and their comments (column/board cascade path)
pub(crate) async fn delete_tasks_cascade(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    task_ids: &[Uuid],
) -> Result<(), sqlx::Error> {
    if task_ids.is_empty() {
        return Ok(());
    }

    sqlx::query("DELETE FROM comments WHERE task_id = ANY($1)")
        .bind(task_ids)
        .execute(&mut **tx)
        .await?;

    sqlx::query("DELETE FROM tasks WHERE id = ANY($1)")
        .bind(task_ids)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_column_titles_order() {
        assert_eq!(DEFAULT_COLUMN_TITLES, ["To Do", "In Progress", "Done"]);
    }

    #[test]
    fn test_board_document_serde_round_trip() {
        let column = Column::new(Uuid::new_v4(), "To Do", 0);
        let board = Board {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            title: "Sprint 12".to_string(),
            description: None,
            column_order: Json(vec![column.id]),
            columns: Json(vec![column]),
            version: 3,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&board).unwrap();
        assert_eq!(json["version"], 3);
        assert_eq!(json["columns"][0]["title"], "To Do");
        assert_eq!(json["column_order"][0], json["columns"][0]["id"]);
    }

    // Database-backed tests live in tests/board_store_tests.rs and require
    // a running PostgreSQL instance.
}
