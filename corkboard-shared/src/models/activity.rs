/// Activity model: append-only audit records
///
/// An activity row is written after a state mutation commits: who did what
/// to which entity, in which project, with a free-form JSON payload. Rows
/// are never updated; they are deleted only by the project deletion cascade.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE activities (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id),
///     board_id UUID,
///     actor_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     action VARCHAR(64) NOT NULL,
///     entity_type VARCHAR(32) NOT NULL,
///     entity_id UUID NOT NULL,
///     payload JSONB NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

/// Immutable audit record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Activity {
    /// Unique activity ID
    pub id: Uuid,

    /// Project the mutation happened in
    pub project_id: Uuid,

    /// Board, when the mutation was board-scoped
    pub board_id: Option<Uuid>,

    /// Acting user (null if the user was deleted)
    pub actor_id: Option<Uuid>,

    /// Action kind, e.g. "task.moved", "column.created"
    pub action: String,

    /// Entity type, e.g. "task", "board", "comment"
    pub entity_type: String,

    /// Entity id
    pub entity_id: Uuid,

    /// Free-form context for the action
    pub payload: JsonValue,

    /// When the activity was recorded
    pub created_at: DateTime<Utc>,
}

/// Input for recording an activity
#[derive(Debug, Clone)]
pub struct RecordActivity {
    pub project_id: Uuid,
    pub board_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
    pub action: &'static str,
    pub entity_type: &'static str,
    pub entity_id: Uuid,
    pub payload: JsonValue,
}

impl Activity {
    /// Appends an activity record
    pub async fn record(pool: &PgPool, data: RecordActivity) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Activity>(
            r#"
            INSERT INTO activities (project_id, board_id, actor_id, action,
                                    entity_type, entity_id, payload)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, project_id, board_id, actor_id, action,
                      entity_type, entity_id, payload, created_at
            "#,
        )
        .bind(data.project_id)
        .bind(data.board_id)
        .bind(data.actor_id)
        .bind(data.action)
        .bind(data.entity_type)
        .bind(data.entity_id)
        .bind(data.payload)
        .fetch_one(pool)
        .await
    }

    /// Lists activities of a project, newest first, with pagination
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Activity>(
            r#"
            SELECT id, project_id, board_id, actor_id, action,
                   entity_type, entity_id, payload, created_at
            FROM activities
            WHERE project_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(project_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }
}
