/// Notification endpoints
///
/// # Endpoints
///
/// - `GET /v1/notifications`: the requester's notifications, newest first
/// - `PUT /v1/notifications/:id/read`: mark one as read
/// - `PUT /v1/notifications/read-all`: mark all as read, returns the count
///
/// Rows are recipient-scoped; a user can only ever see or flag their own.

use crate::app::AppState;
use crate::error::ApiResult;
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use corkboard_shared::auth::middleware::AuthContext;
use corkboard_shared::models::notification::Notification;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

/// Notification list query parameters
#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    /// Page size (default 50, max 200)
    pub limit: Option<i64>,

    /// Page offset
    pub offset: Option<i64>,
}

/// Response for read-all
#[derive(Debug, Serialize)]
pub struct ReadAllResponse {
    /// Number of notifications flipped to read
    pub marked_read: u64,
}

/// List notifications endpoint handler
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<NotificationQuery>,
) -> ApiResult<Json<Vec<Notification>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = query.offset.unwrap_or(0).max(0);

    let notifications =
        Notification::list_by_recipient(&state.db, auth.user_id, limit, offset).await?;
    Ok(Json(notifications))
}

/// Mark one notification read endpoint handler
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(notification_id): Path<Uuid>,
) -> ApiResult<Json<Notification>> {
    let notification = Notification::mark_read(&state.db, notification_id, auth.user_id).await?;
    Ok(Json(notification))
}

/// Mark all notifications read endpoint handler
pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ReadAllResponse>> {
    let marked_read = Notification::mark_all_read(&state.db, auth.user_id).await?;
    Ok(Json(ReadAllResponse { marked_read }))
}
