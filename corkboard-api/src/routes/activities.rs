/// Activity feed endpoint
///
/// # Endpoint
///
/// `GET /v1/activities?project_id=<uuid>&limit=<n>&offset=<n>`
///
/// Returns the project's append-only audit feed, newest first. Membership
/// is required; the feed never crosses project boundaries.

use crate::app::AppState;
use crate::error::ApiResult;
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use corkboard_shared::auth::access;
use corkboard_shared::auth::middleware::AuthContext;
use corkboard_shared::models::activity::Activity;
use serde::Deserialize;
use uuid::Uuid;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

/// Activity feed query parameters
#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    /// Project whose feed to read
    pub project_id: Uuid,

    /// Page size (default 50, max 200)
    pub limit: Option<i64>,

    /// Page offset
    pub offset: Option<i64>,
}

/// List activities endpoint handler
pub async fn list_activities(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ActivityQuery>,
) -> ApiResult<Json<Vec<Activity>>> {
    access::require_project_member(&state.db, query.project_id, auth.user_id).await?;

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = query.offset.unwrap_or(0).max(0);

    let activities =
        Activity::list_by_project(&state.db, query.project_id, limit, offset).await?;
    Ok(Json(activities))
}
