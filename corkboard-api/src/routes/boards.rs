/// Board and column endpoints
///
/// # Endpoints
///
/// - `POST /v1/boards`: create board (201)
/// - `GET /v1/boards/:id`: board document plus a `tasks` array
/// - `DELETE /v1/boards/:id`: cascade delete (admin/owner)
/// - `POST /v1/boards/:id/columns`: append column
/// - `PUT /v1/boards/:id/columns/reorder`: replace column order (422 on a
///   non-permutation list; the board is left unchanged)
/// - `DELETE /v1/boards/:id/columns/:column_id`: delete column, cascading
///   its tasks
///
/// Every successful mutation broadcasts a descriptor to the board room
/// (board lifecycle events go to the project room) after the write commits.

use crate::app::{origin_from_headers, AppState};
use crate::error::{ApiError, ApiResult};
use crate::routes::projects::record_activity;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use corkboard_shared::auth::access;
use corkboard_shared::auth::middleware::AuthContext;
use corkboard_shared::models::activity::RecordActivity;
use corkboard_shared::models::board::{Board, CreateBoard};
use corkboard_shared::models::project::ProjectRole;
use corkboard_shared::models::task::Task;
use corkboard_shared::realtime::{BoardEvent, RoomId};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

/// Create board request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBoardRequest {
    /// Owning project
    pub project_id: Uuid,

    /// Board title
    #[validate(length(min = 1, max = 255))]
    pub title: String,

    /// Optional description
    pub description: Option<String>,
}

/// Create column request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateColumnRequest {
    /// Column title
    #[validate(length(min = 1, max = 255))]
    pub title: String,
}

/// Reorder columns request
#[derive(Debug, Deserialize)]
pub struct ReorderColumnsRequest {
    /// Proposed order; must be a permutation of the board's column ids
    pub column_order: Vec<Uuid>,
}

/// Board document plus its tasks
#[derive(Debug, Serialize)]
pub struct BoardDetail {
    #[serde(flatten)]
    pub board: Board,

    /// All tasks whose board matches
    pub tasks: Vec<Task>,
}

/// Create board endpoint handler
pub async fn create_board(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    headers: HeaderMap,
    Json(request): Json<CreateBoardRequest>,
) -> ApiResult<(StatusCode, Json<Board>)> {
    request.validate().map_err(ApiError::from)?;
    access::require_project_member(&state.db, request.project_id, auth.user_id).await?;

    let board = Board::create(
        &state.db,
        CreateBoard {
            project_id: request.project_id,
            title: request.title,
            description: request.description,
        },
    )
    .await?;

    tracing::info!(board_id = %board.id, project_id = %board.project_id, "Board created");

    record_activity(
        &state,
        RecordActivity {
            project_id: board.project_id,
            board_id: Some(board.id),
            actor_id: Some(auth.user_id),
            action: "board.created",
            entity_type: "board",
            entity_id: board.id,
            payload: json!({ "title": board.title }),
        },
    )
    .await;

    state.broadcast(
        RoomId::Project(board.project_id),
        origin_from_headers(&headers),
        &BoardEvent::BoardCreated {
            project_id: board.project_id,
            board_id: board.id,
        },
    );

    Ok((StatusCode::CREATED, Json(board)))
}

/// Get board endpoint handler
///
/// Returns the board document with an added `tasks` array.
pub async fn get_board(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(board_id): Path<Uuid>,
) -> ApiResult<Json<BoardDetail>> {
    let (board, _) = access::require_board_member(&state.db, board_id, auth.user_id).await?;
    let tasks = Task::list_by_board(&state.db, board_id).await?;

    Ok(Json(BoardDetail { board, tasks }))
}

/// Delete board endpoint handler (admin/owner)
pub async fn delete_board(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(board_id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let (board, _) = access::require_board_member(&state.db, board_id, auth.user_id).await?;
    access::require_project_role(&state.db, board.project_id, auth.user_id, ProjectRole::Admin)
        .await?;

    Board::delete(&state.db, board_id).await?;
    tracing::info!(board_id = %board_id, actor = %auth.user_id, "Board deleted");

    record_activity(
        &state,
        RecordActivity {
            project_id: board.project_id,
            board_id: Some(board_id),
            actor_id: Some(auth.user_id),
            action: "board.deleted",
            entity_type: "board",
            entity_id: board_id,
            payload: json!({ "title": board.title }),
        },
    )
    .await;

    state.broadcast(
        RoomId::Project(board.project_id),
        origin_from_headers(&headers),
        &BoardEvent::BoardDeleted {
            project_id: board.project_id,
            board_id,
        },
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Create column endpoint handler
pub async fn create_column(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(board_id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<CreateColumnRequest>,
) -> ApiResult<Json<Board>> {
    request.validate().map_err(ApiError::from)?;
    access::require_board_member(&state.db, board_id, auth.user_id).await?;

    let (board, column_id) = Board::add_column(&state.db, board_id, &request.title).await?;

    let column = board
        .columns
        .0
        .iter()
        .find(|c| c.id == column_id)
        .cloned()
        .ok_or_else(|| ApiError::InternalError("created column missing from board".to_string()))?;

    record_activity(
        &state,
        RecordActivity {
            project_id: board.project_id,
            board_id: Some(board.id),
            actor_id: Some(auth.user_id),
            action: "column.created",
            entity_type: "column",
            entity_id: column_id,
            payload: json!({ "title": column.title }),
        },
    )
    .await;

    state.broadcast(
        RoomId::Board(board.id),
        origin_from_headers(&headers),
        &BoardEvent::ColumnCreated {
            board_id: board.id,
            column,
            version: board.version,
        },
    );

    Ok(Json(board))
}

/// Reorder columns endpoint handler
pub async fn reorder_columns(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(board_id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<ReorderColumnsRequest>,
) -> ApiResult<Json<Board>> {
    access::require_board_member(&state.db, board_id, auth.user_id).await?;

    let board = Board::reorder_columns(&state.db, board_id, &request.column_order).await?;

    record_activity(
        &state,
        RecordActivity {
            project_id: board.project_id,
            board_id: Some(board.id),
            actor_id: Some(auth.user_id),
            action: "column.reordered",
            entity_type: "board",
            entity_id: board.id,
            payload: json!({ "column_order": request.column_order }),
        },
    )
    .await;

    state.broadcast(
        RoomId::Board(board.id),
        origin_from_headers(&headers),
        &BoardEvent::ColumnsReordered {
            board_id: board.id,
            column_order: board.column_order.0.clone(),
            version: board.version,
        },
    );

    Ok(Json(board))
}

/// Delete column endpoint handler
///
/// Cascades every task the column held (a delete, not a move).
pub async fn delete_column(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((board_id, column_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
) -> ApiResult<Json<Board>> {
    access::require_board_member(&state.db, board_id, auth.user_id).await?;

    let (board, removed_task_ids) = Board::delete_column(&state.db, board_id, column_id).await?;

    tracing::info!(
        board_id = %board.id,
        column_id = %column_id,
        removed_tasks = removed_task_ids.len(),
        "Column deleted"
    );

    record_activity(
        &state,
        RecordActivity {
            project_id: board.project_id,
            board_id: Some(board.id),
            actor_id: Some(auth.user_id),
            action: "column.deleted",
            entity_type: "column",
            entity_id: column_id,
            payload: json!({ "removed_task_ids": removed_task_ids }),
        },
    )
    .await;

    state.broadcast(
        RoomId::Board(board.id),
        origin_from_headers(&headers),
        &BoardEvent::ColumnDeleted {
            board_id: board.id,
            column_id,
            removed_task_ids,
            version: board.version,
        },
    );

    Ok(Json(board))
}
