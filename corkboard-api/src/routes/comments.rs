/// Comment endpoints
///
/// # Endpoints
///
/// - `POST /v1/comments`: create comment; `@handle` tokens in the content
///   are resolved to users, who get a mention notification (201)
/// - `GET /v1/tasks/:id/comments`: comments of a task
/// - `PUT /v1/comments/:id`: edit (author, or admin/owner as moderator)
/// - `DELETE /v1/comments/:id`: delete (author, or admin/owner)

use crate::app::{origin_from_headers, AppState};
use crate::error::{ApiError, ApiResult};
use crate::routes::projects::{notify, record_activity};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use corkboard_shared::auth::access;
use corkboard_shared::auth::middleware::AuthContext;
use corkboard_shared::models::activity::RecordActivity;
use corkboard_shared::models::comment::{Comment, CreateComment};
use corkboard_shared::models::notification::NewNotification;
use corkboard_shared::realtime::{BoardEvent, RoomId};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

/// Create comment request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    /// Task to comment on
    pub task_id: Uuid,

    /// Comment text; scanned for @handle mentions
    #[validate(length(min = 1, max = 10000))]
    pub content: String,
}

/// Update comment request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommentRequest {
    /// Replacement text; mentions are re-extracted
    #[validate(length(min = 1, max = 10000))]
    pub content: String,
}

/// Create comment endpoint handler
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    headers: HeaderMap,
    Json(request): Json<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    request.validate().map_err(ApiError::from)?;
    let (task, _) = access::require_task_member(&state.db, request.task_id, auth.user_id).await?;

    let comment = Comment::create(
        &state.db,
        CreateComment {
            task_id: request.task_id,
            author_id: auth.user_id,
            content: request.content,
        },
    )
    .await?;

    tracing::info!(
        comment_id = %comment.id,
        task_id = %task.id,
        mentions = comment.mentions.len(),
        "Comment created"
    );

    record_activity(
        &state,
        RecordActivity {
            project_id: task.project_id,
            board_id: Some(task.board_id),
            actor_id: Some(auth.user_id),
            action: "comment.created",
            entity_type: "comment",
            entity_id: comment.id,
            payload: json!({ "task_id": task.id }),
        },
    )
    .await;

    if !comment.mentions.is_empty() {
        notify(
            &state,
            &comment.mentions,
            NewNotification {
                sender_id: Some(auth.user_id),
                kind: "comment.mention",
                message: format!("You were mentioned on \"{}\"", task.title),
                entity_type: "comment",
                entity_id: comment.id,
                project_id: Some(task.project_id),
            },
        )
        .await;
    }

    state.broadcast(
        RoomId::Board(task.board_id),
        origin_from_headers(&headers),
        &BoardEvent::CommentAdded {
            board_id: task.board_id,
            task_id: task.id,
            comment: comment.clone(),
        },
    );

    Ok((StatusCode::CREATED, Json(comment)))
}

/// List task comments endpoint handler
pub async fn list_task_comments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Comment>>> {
    access::require_task_member(&state.db, task_id, auth.user_id).await?;

    let comments = Comment::list_by_task(&state.db, task_id).await?;
    Ok(Json(comments))
}

/// Update comment endpoint handler (author or admin/owner)
pub async fn update_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(comment_id): Path<Uuid>,
    Json(request): Json<UpdateCommentRequest>,
) -> ApiResult<Json<Comment>> {
    request.validate().map_err(ApiError::from)?;

    let comment = Comment::find_by_id(&state.db, comment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("comment not found".to_string()))?;
    let (_, role) = access::require_task_member(&state.db, comment.task_id, auth.user_id).await?;
    access::require_author_or_manager(role, comment.author_id, auth.user_id, "comment")?;

    let comment = Comment::update_content(&state.db, comment_id, &request.content).await?;
    Ok(Json(comment))
}

/// Delete comment endpoint handler (author or admin/owner)
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(comment_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let comment = Comment::find_by_id(&state.db, comment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("comment not found".to_string()))?;
    let (_, role) = access::require_task_member(&state.db, comment.task_id, auth.user_id).await?;
    access::require_author_or_manager(role, comment.author_id, auth.user_id, "comment")?;

    Comment::delete(&state.db, comment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
