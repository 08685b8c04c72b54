/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers return `Result<T, ApiError>` which automatically converts
/// to appropriate HTTP status codes.
///
/// # Taxonomy
///
/// - `NotFound` (404): entity or a link in its resolution chain is missing
/// - `Forbidden` (403): authenticated but not authorized
/// - `ValidationError` (422): malformed input (empty title, non-permutation
///   reorder list)
/// - `Conflict` (409): the optimistic version check lost a race, or a move
///   was issued against a stale view of the board
/// - `InternalError` (500): unexpected/storage failure
///
/// Access-control and validation failures are detected before any mutation,
/// so an error response never leaves partial state behind.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use corkboard_shared::auth::access::AccessError;
use corkboard_shared::auth::jwt::JwtError;
use corkboard_shared::auth::middleware::AuthError;
use corkboard_shared::auth::password::PasswordError;
use corkboard_shared::board::EngineError;
use corkboard_shared::models::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409) - concurrent board mutation, duplicate email
    Conflict(String),

    /// Unprocessable entity (422) - validation errors
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "not_found", "conflict")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if let Some(constraint) = db_err.constraint() {
                    if constraint.contains("email") {
                        return ApiError::Conflict("Email already exists".to_string());
                    }
                    if constraint.contains("handle") {
                        return ApiError::Conflict("Handle already taken".to_string());
                    }
                    return ApiError::Conflict(format!("Constraint violation: {}", constraint));
                }
                ApiError::InternalError(format!("Database error: {}", db_err))
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

/// Convert board engine errors to API errors
///
/// Unknown ids are structural NotFound; shape violations are validation
/// failures; a stale move is a conflict the client reconciles by
/// re-fetching.
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::UnknownColumn(id) => ApiError::NotFound(format!("Column {} not found", id)),
            EngineError::UnknownTask(id) => ApiError::NotFound(format!("Task {} not found", id)),
            EngineError::EmptyTitle => ApiError::ValidationError(vec![ValidationErrorDetail {
                field: "title".to_string(),
                message: "Title cannot be empty".to_string(),
            }]),
            EngineError::NotPermutation => {
                ApiError::ValidationError(vec![ValidationErrorDetail {
                    field: "column_order".to_string(),
                    message: "column_order must be a permutation of the board's column ids"
                        .to_string(),
                }])
            }
            EngineError::StaleMove { .. } => ApiError::Conflict(
                "The board changed concurrently; re-fetch and retry the move".to_string(),
            ),
        }
    }
}

/// Convert model errors to API errors
impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::NotFound(what) => ApiError::NotFound(format!("{} not found", what)),
            ModelError::Engine(engine) => engine.into(),
            ModelError::Conflict => ApiError::Conflict(
                "The board was modified concurrently; re-fetch and retry".to_string(),
            ),
            ModelError::Invalid(msg) => ApiError::BadRequest(msg.to_string()),
            ModelError::Database(db) => db.into(),
        }
    }
}

/// Convert access-control errors to API errors
impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::NotFound(what) => ApiError::NotFound(format!("{} not found", what)),
            AccessError::NotMember => {
                ApiError::Forbidden("Not a member of this project".to_string())
            }
            AccessError::InsufficientRole { required } => {
                ApiError::Forbidden(format!("This operation requires the {} role", required))
            }
            AccessError::NotAuthor(what) => ApiError::Forbidden(format!(
                "Only the author or a project admin may modify this {}",
                what
            )),
            AccessError::Database(db) => db.into(),
        }
    }
}

/// Convert auth errors to API errors
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => {
                ApiError::Unauthorized("Missing credentials".to_string())
            }
            AuthError::InvalidFormat(msg) => ApiError::BadRequest(msg),
            AuthError::InvalidToken(msg) => ApiError::Unauthorized(msg),
        }
    }
}

/// Convert JWT errors to API errors
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::InvalidIssuer { .. } => {
                ApiError::Unauthorized("Invalid token issuer".to_string())
            }
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}

/// Convert password errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

/// Convert validator errors to API errors
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| ValidationErrorDetail {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("invalid value for {}", field)),
                })
            })
            .collect();

        ApiError::ValidationError(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("Task not found".to_string());
        assert_eq!(err.to_string(), "Not found: Task not found");
    }

    #[test]
    fn test_engine_error_mapping() {
        let id = Uuid::new_v4();
        assert!(matches!(
            ApiError::from(EngineError::UnknownColumn(id)),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(EngineError::EmptyTitle),
            ApiError::ValidationError(_)
        ));
        assert!(matches!(
            ApiError::from(EngineError::NotPermutation),
            ApiError::ValidationError(_)
        ));
        assert!(matches!(
            ApiError::from(EngineError::StaleMove {
                task_id: id,
                column_id: id,
            }),
            ApiError::Conflict(_)
        ));
    }

    #[test]
    fn test_model_error_mapping() {
        assert!(matches!(
            ApiError::from(ModelError::Conflict),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            ApiError::from(ModelError::NotFound("board")),
            ApiError::NotFound(_)
        ));
    }

    #[test]
    fn test_access_error_mapping() {
        assert!(matches!(
            ApiError::from(AccessError::NotMember),
            ApiError::Forbidden(_)
        ));
        assert!(matches!(
            ApiError::from(AccessError::NotFound("task")),
            ApiError::NotFound(_)
        ));
    }
}
