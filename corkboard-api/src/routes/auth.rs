/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/register`: create an account, returns user + tokens
/// - `POST /v1/auth/login`: verify credentials, returns user + tokens
/// - `POST /v1/auth/refresh`: exchange a refresh token for fresh tokens
///
/// Passwords are hashed with Argon2id; tokens are HS256 JWTs. Login
/// failures are deliberately indistinguishable between "no such user" and
/// "wrong password".

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{extract::State, http::StatusCode, Json};
use corkboard_shared::auth::jwt::{create_token, validate_token, Claims, TokenType};
use corkboard_shared::auth::password::{hash_password, validate_password_strength, verify_password};
use corkboard_shared::models::user::{CreateUser, User};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Registration request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Email address
    #[validate(email)]
    pub email: String,

    /// Plaintext password (validated for strength)
    pub password: String,

    /// Display name
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    /// Unique short handle used for @mentions
    #[validate(length(min = 2, max = 64))]
    pub handle: String,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email address
    pub email: String,

    /// Plaintext password
    pub password: String,
}

/// Refresh request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token obtained at login
    pub refresh_token: String,
}

/// Token pair response
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    /// Short-lived access token
    pub access_token: String,

    /// Long-lived refresh token
    pub refresh_token: String,
}

/// Authentication response: user plus tokens
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// The authenticated user
    pub user: User,

    /// Token pair
    #[serde(flatten)]
    pub tokens: TokenResponse,
}

fn issue_tokens(user_id: uuid::Uuid, secret: &str) -> ApiResult<TokenResponse> {
    let access = create_token(&Claims::new(user_id, TokenType::Access), secret)?;
    let refresh = create_token(&Claims::new(user_id, TokenType::Refresh), secret)?;
    Ok(TokenResponse {
        access_token: access,
        refresh_token: refresh,
    })
}

/// Register endpoint handler
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    request.validate().map_err(ApiError::from)?;
    validate_password_strength(&request.password).map_err(ApiError::BadRequest)?;

    let password_hash = hash_password(&request.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            email: request.email.to_lowercase(),
            password_hash,
            name: request.name,
            handle: request.handle.to_lowercase(),
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, "User registered");

    let tokens = issue_tokens(user.id, state.jwt_secret())?;
    Ok((StatusCode::CREATED, Json(AuthResponse { user, tokens })))
}

/// Login endpoint handler
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let user = User::find_by_email(&state.db, &request.email.to_lowercase())
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    let valid = verify_password(&request.password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    tracing::info!(user_id = %user.id, "User logged in");

    let tokens = issue_tokens(user.id, state.jwt_secret())?;
    Ok(Json(AuthResponse { user, tokens }))
}

/// Refresh endpoint handler
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let claims = validate_token(&request.refresh_token, state.jwt_secret())?;

    if claims.token_type != TokenType::Refresh {
        return Err(ApiError::Unauthorized(
            "Expected a refresh token".to_string(),
        ));
    }

    let tokens = issue_tokens(claims.sub, state.jwt_secret())?;
    Ok(Json(tokens))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_validation() {
        let valid = RegisterRequest {
            email: "ada@example.com".to_string(),
            password: "MyP@ssw0rd!".to_string(),
            name: "Ada".to_string(),
            handle: "ada".to_string(),
        };
        assert!(valid.validate().is_ok());

        let bad_email = RegisterRequest {
            email: "not-an-email".to_string(),
            password: "MyP@ssw0rd!".to_string(),
            name: "Ada".to_string(),
            handle: "ada".to_string(),
        };
        assert!(bad_email.validate().is_err());

        let short_handle = RegisterRequest {
            email: "ada@example.com".to_string(),
            password: "MyP@ssw0rd!".to_string(),
            name: "Ada".to_string(),
            handle: "a".to_string(),
        };
        assert!(short_handle.validate().is_err());
    }
}
