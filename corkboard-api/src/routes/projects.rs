/// Project endpoints and member management
///
/// # Endpoints
///
/// - `POST /v1/projects`: create project (+ default board, 201)
/// - `GET /v1/projects`: projects the requester is a member of
/// - `GET /v1/projects/:id`: project with members
/// - `DELETE /v1/projects/:id`: full cascade (admin/owner)
/// - `POST /v1/projects/:id/members`: add member (admin/owner)
/// - `PUT /v1/projects/:id/members/:user_id`: change role (admin/owner)
/// - `DELETE /v1/projects/:id/members/:user_id`: remove member (admin/owner)
///
/// The owner row is immutable and non-removable; the model layer enforces
/// it regardless of the requester's role.

use crate::app::{origin_from_headers, AppState};
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use corkboard_shared::auth::access;
use corkboard_shared::auth::middleware::AuthContext;
use corkboard_shared::models::activity::{Activity, RecordActivity};
use corkboard_shared::models::board::Board;
use corkboard_shared::models::notification::{NewNotification, Notification};
use corkboard_shared::models::project::{
    CreateProject, Project, ProjectMember, ProjectRole,
};
use corkboard_shared::realtime::{BoardEvent, RoomId};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

/// Create project request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    /// Project name
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    /// Optional description
    pub description: Option<String>,
}

/// Create project response: the project and its default board
#[derive(Debug, Serialize)]
pub struct CreateProjectResponse {
    pub project: Project,
    pub board: Board,
}

/// Project with its member list
#[derive(Debug, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub members: Vec<ProjectMember>,
}

/// Add member request
#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    /// User to add
    pub user_id: Uuid,

    /// Role to grant (admin or member; owner is never grantable)
    pub role: ProjectRole,
}

/// Change role request
#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    /// New role (admin or member)
    pub role: ProjectRole,
}

/// Create project endpoint handler
///
/// Also creates the default board ("To Do" / "In Progress" / "Done") and
/// the owner membership in one transaction.
pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<CreateProjectResponse>)> {
    request.validate().map_err(ApiError::from)?;

    let (project, board) = Project::create(
        &state.db,
        CreateProject {
            name: request.name,
            description: request.description,
            owner_id: auth.user_id,
        },
    )
    .await?;

    tracing::info!(project_id = %project.id, board_id = %board.id, "Project created");

    record_activity(
        &state,
        RecordActivity {
            project_id: project.id,
            board_id: Some(board.id),
            actor_id: Some(auth.user_id),
            action: "project.created",
            entity_type: "project",
            entity_id: project.id,
            payload: json!({ "name": project.name }),
        },
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(CreateProjectResponse { project, board }),
    ))
}

/// List projects endpoint handler
pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Project>>> {
    let projects = Project::list_for_user(&state.db, auth.user_id).await?;
    Ok(Json(projects))
}

/// Get project endpoint handler
pub async fn get_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<ProjectDetail>> {
    access::require_project_member(&state.db, project_id, auth.user_id).await?;

    let project = Project::find_by_id(&state.db, project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("project not found".to_string()))?;
    let members = ProjectMember::list(&state.db, project_id).await?;

    Ok(Json(ProjectDetail { project, members }))
}

/// Delete project endpoint handler (admin/owner)
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    access::require_project_role(&state.db, project_id, auth.user_id, ProjectRole::Admin).await?;

    Project::delete(&state.db, project_id).await?;
    tracing::info!(project_id = %project_id, actor = %auth.user_id, "Project deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Add member endpoint handler (admin/owner)
pub async fn add_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<AddMemberRequest>,
) -> ApiResult<Json<ProjectDetail>> {
    access::require_project_role(&state.db, project_id, auth.user_id, ProjectRole::Admin).await?;

    ProjectMember::add(&state.db, project_id, request.user_id, request.role).await?;

    record_activity(
        &state,
        RecordActivity {
            project_id,
            board_id: None,
            actor_id: Some(auth.user_id),
            action: "member.added",
            entity_type: "project",
            entity_id: project_id,
            payload: json!({ "user_id": request.user_id, "role": request.role }),
        },
    )
    .await;

    notify(
        &state,
        &[request.user_id],
        NewNotification {
            sender_id: Some(auth.user_id),
            kind: "member.added",
            message: "You were added to a project".to_string(),
            entity_type: "project",
            entity_id: project_id,
            project_id: Some(project_id),
        },
    )
    .await;

    state.broadcast(
        RoomId::Project(project_id),
        origin_from_headers(&headers),
        &BoardEvent::MemberAdded {
            project_id,
            user_id: request.user_id,
        },
    );

    project_detail(&state, project_id).await
}

/// Change member role endpoint handler (admin/owner)
pub async fn change_member_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, user_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<ChangeRoleRequest>,
) -> ApiResult<Json<ProjectDetail>> {
    access::require_project_role(&state.db, project_id, auth.user_id, ProjectRole::Admin).await?;

    ProjectMember::change_role(&state.db, project_id, user_id, request.role).await?;

    project_detail(&state, project_id).await
}

/// Remove member endpoint handler (admin/owner)
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    access::require_project_role(&state.db, project_id, auth.user_id, ProjectRole::Admin).await?;

    ProjectMember::remove(&state.db, project_id, user_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn project_detail(state: &AppState, project_id: Uuid) -> ApiResult<Json<ProjectDetail>> {
    let project = Project::find_by_id(&state.db, project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("project not found".to_string()))?;
    let members = ProjectMember::list(&state.db, project_id).await?;
    Ok(Json(ProjectDetail { project, members }))
}

/// Records an activity; failures are logged, never surfaced, because the
/// primary mutation already committed.
pub(crate) async fn record_activity(state: &AppState, data: RecordActivity) {
    if let Err(e) = Activity::record(&state.db, data).await {
        tracing::warn!(error = %e, "Failed to record activity");
    }
}

/// Inserts notifications; failures are logged, never surfaced.
pub(crate) async fn notify(state: &AppState, recipients: &[Uuid], data: NewNotification) {
    if let Err(e) = Notification::notify(&state.db, recipients, data).await {
        tracing::warn!(error = %e, "Failed to insert notifications");
    }
}
