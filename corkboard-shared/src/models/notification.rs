/// Notification model
///
/// Notifications are simple inserts triggered as side effects of writes:
/// task assignment, comment @mentions, member additions. Only the `read`
/// flag is mutable.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE notifications (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     recipient_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     sender_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     kind VARCHAR(64) NOT NULL,
///     message TEXT NOT NULL,
///     entity_type VARCHAR(32) NOT NULL,
///     entity_id UUID NOT NULL,
///     project_id UUID,
///     read BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::ModelError;

/// Per-user notification
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    /// Unique notification ID
    pub id: Uuid,

    /// Receiving user
    pub recipient_id: Uuid,

    /// User whose action triggered the notification
    pub sender_id: Option<Uuid>,

    /// Kind, e.g. "task.assigned", "comment.mention", "member.added"
    pub kind: String,

    /// Human-readable message
    pub message: String,

    /// Referenced entity type
    pub entity_type: String,

    /// Referenced entity id
    pub entity_id: Uuid,

    /// Project context, when applicable
    pub project_id: Option<Uuid>,

    /// Whether the recipient has read it
    pub read: bool,

    /// When the notification was created
    pub created_at: DateTime<Utc>,
}

/// Input for creating notifications
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub sender_id: Option<Uuid>,
    pub kind: &'static str,
    pub message: String,
    pub entity_type: &'static str,
    pub entity_id: Uuid,
    pub project_id: Option<Uuid>,
}

impl Notification {
    /// Inserts one notification per recipient
    ///
    /// The sender is filtered out; nobody is notified about their own
    /// action. Returns the number of rows inserted.
    pub async fn notify(
        pool: &PgPool,
        recipients: &[Uuid],
        data: NewNotification,
    ) -> Result<u64, sqlx::Error> {
        let recipients: Vec<Uuid> = recipients
            .iter()
            .copied()
            .filter(|r| Some(*r) != data.sender_id)
            .collect();

        if recipients.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO notifications (recipient_id, sender_id, kind, message,
                                       entity_type, entity_id, project_id)
            SELECT r, $2, $3, $4, $5, $6, $7 FROM unnest($1::uuid[]) AS r
            "#,
        )
        .bind(&recipients)
        .bind(data.sender_id)
        .bind(data.kind)
        .bind(&data.message)
        .bind(data.entity_type)
        .bind(data.entity_id)
        .bind(data.project_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Lists a user's notifications, newest first
    pub async fn list_by_recipient(
        pool: &PgPool,
        recipient_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, recipient_id, sender_id, kind, message,
                   entity_type, entity_id, project_id, read, created_at
            FROM notifications
            WHERE recipient_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(recipient_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// Marks one notification as read
    ///
    /// Scoped to the recipient so users cannot touch each other's rows.
    pub async fn mark_read(
        pool: &PgPool,
        id: Uuid,
        recipient_id: Uuid,
    ) -> Result<Self, ModelError> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            UPDATE notifications
            SET read = TRUE
            WHERE id = $1 AND recipient_id = $2
            RETURNING id, recipient_id, sender_id, kind, message,
                      entity_type, entity_id, project_id, read, created_at
            "#,
        )
        .bind(id)
        .bind(recipient_id)
        .fetch_optional(pool)
        .await?;

        notification.ok_or(ModelError::NotFound("notification"))
    }

    /// Marks all of a user's notifications as read; returns the count
    pub async fn mark_all_read(pool: &PgPool, recipient_id: Uuid) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("UPDATE notifications SET read = TRUE WHERE recipient_id = $1 AND NOT read")
                .bind(recipient_id)
                .execute(pool)
                .await?;

        Ok(result.rows_affected())
    }
}
