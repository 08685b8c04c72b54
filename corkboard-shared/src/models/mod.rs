/// Database models for Corkboard
///
/// This module contains all database models and their CRUD operations.
///
/// # Models
///
/// - `user`: User accounts
/// - `project`: Projects and member management with roles
/// - `board`: Board documents embedding the column structure
/// - `task`: Tasks with denormalized (column_id, position)
/// - `comment`: Task comments with @mention extraction
/// - `activity`: Append-only audit records
/// - `notification`: Per-user notifications with a read flag
///
/// # Example
///
/// ```no_run
/// use corkboard_shared::models::user::{CreateUser, User};
/// use corkboard_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     email: "ada@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     name: "Ada".to_string(),
///     handle: "ada".to_string(),
/// }).await?;
/// # Ok(())
/// # }
/// ```

use crate::board::EngineError;

pub mod activity;
pub mod board;
pub mod comment;
pub mod notification;
pub mod project;
pub mod task;
pub mod user;

/// Error type shared by model operations that go beyond plain row CRUD
///
/// The API layer maps these onto HTTP statuses: `NotFound` → 404, engine
/// shape violations → 422, `StaleMove`/`Conflict` → 409, `Invalid` → 400,
/// database failures → 500.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Entity or a link in its resolution chain is missing
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Structural violation reported by the board engine
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The board was modified concurrently; the version check lost the race
    #[error("board was modified concurrently")]
    Conflict,

    /// Malformed request at the model level
    #[error("{0}")]
    Invalid(&'static str),

    /// Underlying database failure
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
