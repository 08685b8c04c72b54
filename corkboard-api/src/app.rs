/// Application state and router builder
///
/// This module defines the shared application state and provides a function
/// to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use corkboard_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config, None);
/// let app = corkboard_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use axum::{
    extract::Request,
    http::{header, HeaderMap, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{delete, get, post, put},
    Router,
};
use corkboard_shared::auth::{jwt, middleware::AuthContext};
use corkboard_shared::realtime::{BoardEvent, RedisFanout, RoomId, RoomRegistry};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use uuid::Uuid;

/// Header a client sets to identify its WebSocket connection on REST
/// mutations, so its own broadcast is not echoed back to it
pub const CONNECTION_ID_HEADER: &str = "x-connection-id";

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Room registry for the real-time relay
    pub rooms: RoomRegistry,

    /// Cross-instance fan-out; None when Redis is not configured
    pub fanout: Option<RedisFanout>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config, fanout: Option<RedisFanout>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            rooms: RoomRegistry::new(),
            fanout,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Broadcasts a mutation descriptor to a room
    ///
    /// Runs after the mutation is durably applied; fire-and-forget relative
    /// to the HTTP response. The frame also goes out through Redis so other
    /// server instances can deliver it to their local subscribers.
    pub fn broadcast(&self, room: RoomId, origin: Uuid, event: &BoardEvent) {
        let json = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(event = event.name(), error = %e, "Failed to serialize event");
                return;
            }
        };

        let delivered = self.rooms.publish_raw(room, origin, json.clone());
        tracing::debug!(event = event.name(), delivered, "Broadcast room event");

        if let Some(fanout) = self.fanout.clone() {
            tokio::spawn(async move {
                fanout.publish(room, origin, json).await;
            });
        }
    }
}

/// Reads the originating connection id from request headers
///
/// Missing or malformed values map to the nil UUID, which no live
/// connection uses, so the frame is delivered to everyone in the room.
pub fn origin_from_headers(headers: &HeaderMap) -> Uuid {
    headers
        .get(CONNECTION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .unwrap_or(Uuid::nil())
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                          # Health check (public)
/// └── /v1/
///     ├── /auth/                       # register, login, refresh (public)
///     ├── /projects/…                  # projects and members
///     ├── /boards/…                    # boards, columns, reorder
///     ├── /tasks/…                     # tasks, move, comments
///     ├── /comments/…                  # comment edit/delete
///     ├── /activities                  # project activity feed
///     ├── /notifications/…             # notification list, read flags
///     └── /ws                          # WebSocket (token at handshake)
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    let project_routes = Router::new()
        .route("/", post(routes::projects::create_project))
        .route("/", get(routes::projects::list_projects))
        .route("/:id", get(routes::projects::get_project))
        .route("/:id", delete(routes::projects::delete_project))
        .route("/:id/members", post(routes::projects::add_member))
        .route("/:id/members/:user_id", put(routes::projects::change_member_role))
        .route("/:id/members/:user_id", delete(routes::projects::remove_member));

    let board_routes = Router::new()
        .route("/", post(routes::boards::create_board))
        .route("/:id", get(routes::boards::get_board))
        .route("/:id", delete(routes::boards::delete_board))
        .route("/:id/columns", post(routes::boards::create_column))
        .route("/:id/columns/reorder", put(routes::boards::reorder_columns))
        .route("/:id/columns/:column_id", delete(routes::boards::delete_column));

    let task_routes = Router::new()
        .route("/", post(routes::tasks::create_task))
        .route("/:id", get(routes::tasks::get_task))
        .route("/:id", put(routes::tasks::update_task))
        .route("/:id", delete(routes::tasks::delete_task))
        .route("/:id/move", put(routes::tasks::move_task))
        .route("/:id/comments", get(routes::comments::list_task_comments));

    let comment_routes = Router::new()
        .route("/", post(routes::comments::create_comment))
        .route("/:id", put(routes::comments::update_comment))
        .route("/:id", delete(routes::comments::delete_comment));

    let notification_routes = Router::new()
        .route("/", get(routes::notifications::list_notifications))
        .route("/read-all", put(routes::notifications::mark_all_read))
        .route("/:id/read", put(routes::notifications::mark_read));

    // Authenticated API surface
    let authed = Router::new()
        .nest("/projects", project_routes)
        .nest("/boards", board_routes)
        .nest("/tasks", task_routes)
        .nest("/comments", comment_routes)
        .nest("/notifications", notification_routes)
        .route("/activities", get(routes::activities::list_activities))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    // The WebSocket endpoint authenticates at handshake time (token query
    // parameter or Authorization header), not through the middleware.
    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .merge(authed)
        .route("/ws", get(routes::ws::ws_handler));

    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// JWT authentication middleware layer
///
/// Extracts and validates the bearer token from the Authorization header,
/// then injects [`AuthContext`] into request extensions.
async fn jwt_auth_layer(
    state: axum::extract::State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, crate::error::ApiError> {
    let token =
        corkboard_shared::auth::middleware::extract_bearer_token(req.headers())?.to_string();

    let claims = jwt::validate_access_token(&token, state.jwt_secret())?;

    let auth_context = AuthContext::from_jwt(claims.sub);
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(origin_from_headers(&headers), Uuid::nil());

        let id = Uuid::new_v4();
        headers.insert(
            CONNECTION_ID_HEADER,
            HeaderValue::from_str(&id.to_string()).unwrap(),
        );
        assert_eq!(origin_from_headers(&headers), id);

        headers.insert(CONNECTION_ID_HEADER, HeaderValue::from_static("not-a-uuid"));
        assert_eq!(origin_from_headers(&headers), Uuid::nil());
    }
}
