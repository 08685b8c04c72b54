/// Task endpoints
///
/// # Endpoints
///
/// - `POST /v1/tasks`: create task, appended to its column (201)
/// - `GET /v1/tasks/:id`: fetch task
/// - `PUT /v1/tasks/:id`: update fields (never moves columns)
/// - `PUT /v1/tasks/:id/move`: the remove-then-insert move; 409 when the
///   caller's view of the board is stale or the version check loses a race
/// - `DELETE /v1/tasks/:id`: delete, removing the id from its column
///
/// Moves are the only way a task changes columns. The handler broadcasts a
/// `task:moved` descriptor carrying exactly what a remote mirror needs:
/// task id, source column, destination column, destination index, and the
/// new board version.

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
use corkboard_shared::models::board::Board;
use corkboard_shared::models::notification::NewNotification;
use corkboard_shared::models::task::{CreateTask, Label, Task, UpdateTask};
use corkboard_shared::realtime::{BoardEvent, RoomId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    /// Board to create the task on
    pub board_id: Uuid,

    /// Column to append to
    pub column_id: Uuid,

    /// Task title
    #[validate(length(min = 1, max = 255))]
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
}

/// Update task request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    /// New title
    #[validate(length(min = 1, max = 255))]
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

/// Move task request
#[derive(Debug, Deserialize)]
pub struct MoveTaskRequest {
    /// Column the client believes currently holds the task
    pub source_column_id: Uuid,

    /// Destination column
    pub dest_column_id: Uuid,

    /// Destination index (clamped to the column length)
    pub dest_index: usize,
}

/// Move task response: the task and the updated board document
#[derive(Debug, Serialize)]
pub struct MoveTaskResponse {
    pub task: Task,
    pub board: Board,
}

/// Create task endpoint handler
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    headers: HeaderMap,
    Json(request): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    request.validate().map_err(ApiError::from)?;
    access::require_board_member(&state.db, request.board_id, auth.user_id).await?;

    let (task, board) = Task::create(
        &state.db,
        CreateTask {
            board_id: request.board_id,
            column_id: request.column_id,
            title: request.title,
            description: request.description,
            assigned_to: request.assigned_to.clone(),
            due_date: request.due_date,
            labels: request.labels,
            created_by: Some(auth.user_id),
        },
    )
    .await?;

    tracing::info!(task_id = %task.id, board_id = %board.id, "Task created");

    record_activity(
        &state,
        RecordActivity {
            project_id: task.project_id,
            board_id: Some(board.id),
            actor_id: Some(auth.user_id),
            action: "task.created",
            entity_type: "task",
            entity_id: task.id,
            payload: json!({ "title": task.title, "column_id": task.column_id }),
        },
    )
    .await;

    if !request.assigned_to.is_empty() {
        notify(
            &state,
            &request.assigned_to,
            NewNotification {
                sender_id: Some(auth.user_id),
                kind: "task.assigned",
                message: format!("You were assigned to \"{}\"", task.title),
                entity_type: "task",
                entity_id: task.id,
                project_id: Some(task.project_id),
            },
        )
        .await;
    }

    state.broadcast(
        RoomId::Board(board.id),
        origin_from_headers(&headers),
        &BoardEvent::TaskCreated {
            board_id: board.id,
            column_id: task.column_id,
            task: task.clone(),
            version: board.version,
        },
    );

    Ok((StatusCode::CREATED, Json(task)))
}

/// Get task endpoint handler
pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let (task, _) = access::require_task_member(&state.db, task_id, auth.user_id).await?;
    Ok(Json(task))
}

/// Update task endpoint handler
///
/// Field edits only; column membership never changes here.
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    request.validate().map_err(ApiError::from)?;
    let (before, _) = access::require_task_member(&state.db, task_id, auth.user_id).await?;

    let newly_assigned: Vec<Uuid> = request
        .assigned_to
        .as_deref()
        .unwrap_or_default()
        .iter()
        .copied()
        .filter(|id| !before.assigned_to.contains(id))
        .collect();

    let task = Task::update(
        &state.db,
        task_id,
        UpdateTask {
            title: request.title,
            description: request.description,
            assigned_to: request.assigned_to,
            due_date: request.due_date,
            labels: request.labels,
        },
    )
    .await?;

    record_activity(
        &state,
        RecordActivity {
            project_id: task.project_id,
            board_id: Some(task.board_id),
            actor_id: Some(auth.user_id),
            action: "task.updated",
            entity_type: "task",
            entity_id: task.id,
            payload: json!({ "title": task.title }),
        },
    )
    .await;

    if !newly_assigned.is_empty() {
        notify(
            &state,
            &newly_assigned,
            NewNotification {
                sender_id: Some(auth.user_id),
                kind: "task.assigned",
                message: format!("You were assigned to \"{}\"", task.title),
                entity_type: "task",
                entity_id: task.id,
                project_id: Some(task.project_id),
            },
        )
        .await;
    }

    state.broadcast(
        RoomId::Board(task.board_id),
        origin_from_headers(&headers),
        &BoardEvent::TaskUpdated {
            board_id: task.board_id,
            task: task.clone(),
        },
    );

    Ok(Json(task))
}

/// Move task endpoint handler
///
/// Performs the remove-then-insert described by the state engine. Removal
/// is by id; a caller whose view of the board has drifted gets 409 and
/// re-fetches instead of silently moving the wrong element.
pub async fn move_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<MoveTaskRequest>,
) -> ApiResult<Json<MoveTaskResponse>> {
    access::require_task_member(&state.db, task_id, auth.user_id).await?;

    let (task, board) = Task::move_to(
        &state.db,
        task_id,
        request.source_column_id,
        request.dest_column_id,
        request.dest_index,
    )
    .await?;

    tracing::info!(
        task_id = %task.id,
        source = %request.source_column_id,
        dest = %request.dest_column_id,
        dest_index = request.dest_index,
        "Task moved"
    );

    record_activity(
        &state,
        RecordActivity {
            project_id: task.project_id,
            board_id: Some(board.id),
            actor_id: Some(auth.user_id),
            action: "task.moved",
            entity_type: "task",
            entity_id: task.id,
            payload: json!({
                "source_column_id": request.source_column_id,
                "dest_column_id": request.dest_column_id,
                "dest_index": request.dest_index,
            }),
        },
    )
    .await;

    state.broadcast(
        RoomId::Board(board.id),
        origin_from_headers(&headers),
        &BoardEvent::TaskMoved {
            board_id: board.id,
            task_id: task.id,
            source_column_id: request.source_column_id,
            dest_column_id: request.dest_column_id,
            dest_index: task.position as usize,
            version: board.version,
        },
    );

    Ok(Json(MoveTaskResponse { task, board }))
}

/// Delete task endpoint handler
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let (task, _) = access::require_task_member(&state.db, task_id, auth.user_id).await?;

    let (board, column_id) = Task::delete(&state.db, task_id).await?;
    tracing::info!(task_id = %task_id, board_id = %board.id, "Task deleted");

    record_activity(
        &state,
        RecordActivity {
            project_id: task.project_id,
            board_id: Some(board.id),
            actor_id: Some(auth.user_id),
            action: "task.deleted",
            entity_type: "task",
            entity_id: task_id,
            payload: json!({ "title": task.title }),
        },
    )
    .await;

    state.broadcast(
        RoomId::Board(board.id),
        origin_from_headers(&headers),
        &BoardEvent::TaskDeleted {
            board_id: board.id,
            column_id,
            task_id,
            version: board.version,
        },
    );

    Ok(StatusCode::NO_CONTENT)
}
