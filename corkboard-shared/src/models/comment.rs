/// Comment model and @mention extraction
///
/// Comment content is scanned for `@handle` tokens; tokens that resolve to
/// real users become the comment's `mentions` set. Unknown handles stay
/// plain text. Mentioned users are notified by the API layer after the
/// insert succeeds.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE comments (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     task_id UUID NOT NULL REFERENCES tasks(id),
///     author_id UUID NOT NULL REFERENCES users(id),
///     content TEXT NOT NULL,
///     mentions UUID[] NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::user::User;
use crate::models::ModelError;

/// Longest handle the mention scanner will accept
const MAX_HANDLE_LEN: usize = 64;

/// Comment on a task
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    /// Unique comment ID
    pub id: Uuid,

    /// Task the comment belongs to
    pub task_id: Uuid,

    /// Authoring user
    pub author_id: Uuid,

    /// Comment text
    pub content: String,

    /// Users mentioned via @handle tokens in `content`
    pub mentions: Vec<Uuid>,

    /// When the comment was created
    pub created_at: DateTime<Utc>,

    /// When the comment was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a comment
#[derive(Debug, Clone, Deserialize)]
pub struct CreateComment {
    /// Task to comment on
    pub task_id: Uuid,

    /// Authoring user
    pub author_id: Uuid,

    /// Comment text
    pub content: String,
}

impl Comment {
    /// Creates a comment, resolving @mentions against user handles
    pub async fn create(pool: &PgPool, data: CreateComment) -> Result<Self, ModelError> {
        let handles = extract_mention_handles(&data.content);
        let mentions: Vec<Uuid> = if handles.is_empty() {
            Vec::new()
        } else {
            User::find_by_handles(pool, &handles)
                .await?
                .into_iter()
                .map(|u| u.id)
                .collect()
        };

        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (task_id, author_id, content, mentions)
            VALUES ($1, $2, $3, $4)
            RETURNING id, task_id, author_id, content, mentions, created_at, updated_at
            "#,
        )
        .bind(data.task_id)
        .bind(data.author_id)
        .bind(&data.content)
        .bind(&mentions)
        .fetch_one(pool)
        .await?;

        Ok(comment)
    }

    /// Finds a comment by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, task_id, author_id, content, mentions, created_at, updated_at
            FROM comments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Lists comments of a task, oldest first
    pub async fn list_by_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, task_id, author_id, content, mentions, created_at, updated_at
            FROM comments
            WHERE task_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    /// Replaces the comment's content, re-extracting mentions
    pub async fn update_content(
        pool: &PgPool,
        id: Uuid,
        content: &str,
    ) -> Result<Self, ModelError> {
        let handles = extract_mention_handles(content);
        let mentions: Vec<Uuid> = if handles.is_empty() {
            Vec::new()
        } else {
            User::find_by_handles(pool, &handles)
                .await?
                .into_iter()
                .map(|u| u.id)
                .collect()
        };

        let comment = sqlx::query_as::<_, Comment>(
            r#"
            UPDATE comments
            SET content = $2, mentions = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING id, task_id, author_id, content, mentions, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(content)
        .bind(&mentions)
        .fetch_optional(pool)
        .await?;

        comment.ok_or(ModelError::NotFound("comment"))
    }

    /// Deletes a comment
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), ModelError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ModelError::NotFound("comment"));
        }
        Ok(())
    }
}

/// Extracts candidate mention handles from comment text
///
/// A mention is an `@` at the start of the text or after a non-word
/// character, followed by one or more word characters (ASCII alphanumeric or
/// underscore). Handles are returned deduplicated, in order of first
/// appearance, without the `@`.
pub fn extract_mention_handles(content: &str) -> Vec<String> {
    let mut handles: Vec<String> = Vec::new();
    let bytes = content.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'@' {
            let preceded_by_word = i > 0 && is_word_byte(bytes[i - 1]);
            if !preceded_by_word {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && is_word_byte(bytes[end]) {
                    end += 1;
                }
                if end > start && end - start <= MAX_HANDLE_LEN {
                    // Safe: the scanned range is pure ASCII
                    let handle = content[start..end].to_string();
                    if !handles.contains(&handle) {
                        handles.push(handle);
                    }
                }
                i = end;
                continue;
            }
        }
        i += 1;
    }

    handles
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_single_mention() {
        assert_eq!(extract_mention_handles("ping @ada about this"), vec!["ada"]);
    }

    #[test]
    fn test_extract_mention_at_start_and_end() {
        assert_eq!(
            extract_mention_handles("@ada please review, thanks @grace"),
            vec!["ada", "grace"]
        );
    }

    #[test]
    fn test_mentions_are_deduplicated_in_first_appearance_order() {
        assert_eq!(
            extract_mention_handles("@grace then @ada then @grace again"),
            vec!["grace", "ada"]
        );
    }

    #[test]
    fn test_punctuation_terminates_handle() {
        assert_eq!(extract_mention_handles("cc @ada, @grace."), vec!["ada", "grace"]);
        assert_eq!(extract_mention_handles("(@ada)"), vec!["ada"]);
    }

    #[test]
    fn test_email_addresses_are_not_mentions() {
        assert!(extract_mention_handles("mail me at ada@example.com").is_empty());
    }

    #[test]
    fn test_bare_and_double_at_are_ignored() {
        assert!(extract_mention_handles("just an @ sign").is_empty());
        assert_eq!(extract_mention_handles("weird @@ada case"), vec!["ada"]);
    }

    #[test]
    fn test_underscore_and_digits_in_handles() {
        assert_eq!(extract_mention_handles("hi @ada_99!"), vec!["ada_99"]);
    }

    #[test]
    fn test_overlong_handle_is_ignored() {
        let long = format!("@{}", "a".repeat(MAX_HANDLE_LEN + 1));
        assert!(extract_mention_handles(&long).is_empty());
    }

    #[test]
    fn test_no_mentions() {
        assert!(extract_mention_handles("nothing to see here").is_empty());
        assert!(extract_mention_handles("").is_empty());
    }
}
