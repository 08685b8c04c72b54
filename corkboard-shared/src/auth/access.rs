/// Access control: membership and role resolution
///
/// Every entity resolves to its owning project before a permission verdict:
/// task → board → project, board → project. A missing link anywhere in the
/// chain is `NotFound`; a chain that resolves but fails the membership or
/// role check is a `Forbidden`-class error. These checks are read-only and
/// run before any mutation, so a rejected request never leaves partial
/// state behind.
///
/// # Permission Model
///
/// 1. **Membership**: the requester must be in the project's member list for
///    any read or write.
/// 2. **Role**: destructive/administrative operations (delete board, delete
///    project, member management) require admin or owner.
/// 3. **Authorship**: comments are editable by their author, or by
///    admin/owner as moderators.
///
/// # Example
///
/// ```no_run
/// use corkboard_shared::auth::access;
/// use corkboard_shared::models::project::ProjectRole;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, board_id: Uuid, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// // Resolve board -> project and require membership
/// let (board, role) = access::require_board_member(&pool, board_id, user_id).await?;
///
/// // Destructive path needs admin or owner
/// if !role.can_manage() {
///     // reject
/// }
/// # Ok(())
/// # }
/// ```

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::board::Board;
use crate::models::project::{Project, ProjectMember, ProjectRole};
use crate::models::task::Task;

/// Error type for access checks
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    /// A link in the resolution chain is missing
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Requester is not a member of the owning project
    #[error("not a member of this project")]
    NotMember,

    /// Requester's role is insufficient for the operation
    #[error("insufficient role: requires {required}")]
    InsufficientRole { required: &'static str },

    /// Requester is neither the author nor a project manager
    #[error("only the author or a project admin may modify this {0}")]
    NotAuthor(&'static str),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Requires the user to be a member of the project; returns their role
pub async fn require_project_member(
    pool: &PgPool,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<ProjectRole, AccessError> {
    if Project::find_by_id(pool, project_id).await?.is_none() {
        return Err(AccessError::NotFound("project"));
    }

    ProjectMember::get_role(pool, project_id, user_id)
        .await?
        .ok_or(AccessError::NotMember)
}

/// Requires the user to hold `required` (or higher) in the project
pub async fn require_project_role(
    pool: &PgPool,
    project_id: Uuid,
    user_id: Uuid,
    required: ProjectRole,
) -> Result<ProjectRole, AccessError> {
    let role = require_project_member(pool, project_id, user_id).await?;

    if !role.has_permission(&required) {
        return Err(AccessError::InsufficientRole {
            required: required.as_str(),
        });
    }

    Ok(role)
}

/// Resolves a board to its project and requires membership
///
/// Returns the board alongside the requester's role so handlers do not
/// re-fetch it.
pub async fn require_board_member(
    pool: &PgPool,
    board_id: Uuid,
    user_id: Uuid,
) -> Result<(Board, ProjectRole), AccessError> {
    let board = Board::find_by_id(pool, board_id)
        .await?
        .ok_or(AccessError::NotFound("board"))?;

    let role = require_project_member(pool, board.project_id, user_id).await?;
    Ok((board, role))
}

/// Resolves a task to its project and requires membership
pub async fn require_task_member(
    pool: &PgPool,
    task_id: Uuid,
    user_id: Uuid,
) -> Result<(Task, ProjectRole), AccessError> {
    let task = Task::find_by_id(pool, task_id)
        .await?
        .ok_or(AccessError::NotFound("task"))?;

    let role = require_project_member(pool, task.project_id, user_id).await?;
    Ok((task, role))
}

/// Author-only operations: allowed for the author, or for admin/owner
pub fn require_author_or_manager(
    role: ProjectRole,
    author_id: Uuid,
    user_id: Uuid,
    what: &'static str,
) -> Result<(), AccessError> {
    if author_id == user_id || role.can_manage() {
        Ok(())
    } else {
        Err(AccessError::NotAuthor(what))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_may_modify_own_comment() {
        let author = Uuid::new_v4();
        assert!(require_author_or_manager(ProjectRole::Member, author, author, "comment").is_ok());
    }

    #[test]
    fn test_manager_may_moderate_any_comment() {
        let author = Uuid::new_v4();
        let admin = Uuid::new_v4();
        assert!(require_author_or_manager(ProjectRole::Admin, author, admin, "comment").is_ok());
        assert!(require_author_or_manager(ProjectRole::Owner, author, admin, "comment").is_ok());
    }

    #[test]
    fn test_plain_member_cannot_modify_others_comment() {
        let author = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let result = require_author_or_manager(ProjectRole::Member, author, stranger, "comment");
        assert!(matches!(result, Err(AccessError::NotAuthor("comment"))));
    }

    // Chain resolution tests require a database and live in
    // tests/board_store_tests.rs.
}
