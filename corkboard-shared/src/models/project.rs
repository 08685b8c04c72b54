/// Project model, membership, and role-based access rules
///
/// Projects own boards and carry a member list with roles. The owner is
/// always present in `project_members` with role `owner`; that row is
/// immutable and non-removable through member management.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE project_role AS ENUM ('owner', 'admin', 'member');
///
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     description TEXT,
///     owner_id UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE project_members (
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     role project_role NOT NULL DEFAULT 'member',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (project_id, user_id)
/// );
/// ```
///
/// # Roles
///
/// - **owner**: full control, delete project, manage members
/// - **admin**: manage members, delete boards, moderate comments
/// - **member**: create and move tasks, comment

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::board::{Board, CreateBoard};
use crate::models::ModelError;

/// RBAC roles for project memberships
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProjectRole {
    /// Full control: delete project, manage all members
    Owner,

    /// Can manage members and perform destructive board operations
    Admin,

    /// Can create, edit, and move tasks; comment
    Member,
}

impl ProjectRole {
    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::Owner => "owner",
            ProjectRole::Admin => "admin",
            ProjectRole::Member => "member",
        }
    }

    /// Checks if this role has the permission level of the required role
    ///
    /// Hierarchy: Owner > Admin > Member
    pub fn has_permission(&self, required: &ProjectRole) -> bool {
        self.permission_level() >= required.permission_level()
    }

    /// Can manage members and run destructive operations
    pub fn can_manage(&self) -> bool {
        matches!(self, ProjectRole::Owner | ProjectRole::Admin)
    }

    fn permission_level(&self) -> u8 {
        match self {
            ProjectRole::Owner => 3,
            ProjectRole::Admin => 2,
            ProjectRole::Member => 1,
        }
    }
}

/// Project model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    /// Unique project ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// Owning user; mirrored in project_members with role owner
    pub owner_id: Uuid,

    /// When the project was created
    pub created_at: DateTime<Utc>,

    /// When the project was last updated
    pub updated_at: DateTime<Utc>,
}

/// Project membership row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectMember {
    /// Project ID
    pub project_id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// Role within the project
    pub role: ProjectRole,

    /// When the membership was created
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new project
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProject {
    /// Display name
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// Owner (the requesting user)
    pub owner_id: Uuid,
}

impl Project {
    /// Creates a project, its owner membership, and the default board
    ///
    /// One transaction: the project can never exist without its owner row,
    /// and the default board always carries the three default columns.
    pub async fn create(pool: &PgPool, data: CreateProject) -> Result<(Self, Board), ModelError> {
        let mut tx = pool.begin().await?;

        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (name, description, owner_id)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, owner_id, created_at, updated_at
            "#,
        )
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.owner_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO project_members (project_id, user_id, role)
            VALUES ($1, $2, 'owner')
            "#,
        )
        .bind(project.id)
        .bind(data.owner_id)
        .execute(&mut *tx)
        .await?;

        let board = Board::create_with_default_columns(
            &mut *tx,
            CreateBoard {
                project_id: project.id,
                title: data.name.clone(),
                description: None,
            },
        )
        .await?;

        tx.commit().await?;
        Ok((project, board))
    }

    /// Finds a project by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            r#"
            SELECT id, name, description, owner_id, created_at, updated_at
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Lists projects where the user is a member, newest first
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            r#"
            SELECT p.id, p.name, p.description, p.owner_id, p.created_at, p.updated_at
            FROM projects p
            JOIN project_members m ON m.project_id = p.id
            WHERE m.user_id = $1
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Deletes the project and everything referencing it
    ///
    /// Explicit cascade in one transaction: comments of the project's tasks,
    /// tasks, boards, activities, notifications, then the members and the
    /// project row itself.
    pub async fn delete(pool: &PgPool, project_id: Uuid) -> Result<(), ModelError> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM comments
            WHERE task_id IN (SELECT id FROM tasks WHERE project_id = $1)
            "#,
        )
        .bind(project_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM tasks WHERE project_id = $1")
            .bind(project_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM boards WHERE project_id = $1")
            .bind(project_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM activities WHERE project_id = $1")
            .bind(project_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM notifications WHERE project_id = $1")
            .bind(project_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM project_members WHERE project_id = $1")
            .bind(project_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(project_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ModelError::NotFound("project"));
        }

        tx.commit().await?;
        Ok(())
    }
}

impl ProjectMember {
    /// Adds a user to a project
    ///
    /// The `owner` role cannot be granted through member management; it only
    /// exists via project creation.
    pub async fn add(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<Self, ModelError> {
        if role == ProjectRole::Owner {
            return Err(ModelError::Invalid("the owner role cannot be granted"));
        }

        if Self::get_role(pool, project_id, user_id).await?.is_some() {
            return Err(ModelError::Invalid("user is already a member"));
        }

        let member = sqlx::query_as::<_, ProjectMember>(
            r#"
            INSERT INTO project_members (project_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING project_id, user_id, role, created_at
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(pool)
        .await?;

        Ok(member)
    }

    /// Changes a member's role
    ///
    /// The owner's role is immutable.
    pub async fn change_role(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<Self, ModelError> {
        if role == ProjectRole::Owner {
            return Err(ModelError::Invalid("the owner role cannot be granted"));
        }

        let current = Self::get_role(pool, project_id, user_id)
            .await?
            .ok_or(ModelError::NotFound("member"))?;

        if current == ProjectRole::Owner {
            return Err(ModelError::Invalid("the owner's role cannot be changed"));
        }

        let member = sqlx::query_as::<_, ProjectMember>(
            r#"
            UPDATE project_members
            SET role = $3
            WHERE project_id = $1 AND user_id = $2
            RETURNING project_id, user_id, role, created_at
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(pool)
        .await?;

        Ok(member)
    }

    /// Removes a member from a project
    ///
    /// The owner is non-removable.
    pub async fn remove(pool: &PgPool, project_id: Uuid, user_id: Uuid) -> Result<(), ModelError> {
        let current = Self::get_role(pool, project_id, user_id)
            .await?
            .ok_or(ModelError::NotFound("member"))?;

        if current == ProjectRole::Owner {
            return Err(ModelError::Invalid("the project owner cannot be removed"));
        }

        sqlx::query("DELETE FROM project_members WHERE project_id = $1 AND user_id = $2")
            .bind(project_id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Gets a user's role in a project, if any
    pub async fn get_role(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ProjectRole>, sqlx::Error> {
        let role: Option<(ProjectRole,)> = sqlx::query_as(
            "SELECT role FROM project_members WHERE project_id = $1 AND user_id = $2",
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(role.map(|(r,)| r))
    }

    /// Lists all members of a project
    pub async fn list(pool: &PgPool, project_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ProjectMember>(
            r#"
            SELECT project_id, user_id, role, created_at
            FROM project_members
            WHERE project_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_as_str() {
        assert_eq!(ProjectRole::Owner.as_str(), "owner");
        assert_eq!(ProjectRole::Admin.as_str(), "admin");
        assert_eq!(ProjectRole::Member.as_str(), "member");
    }

    #[test]
    fn test_role_hierarchy() {
        assert!(ProjectRole::Owner.has_permission(&ProjectRole::Admin));
        assert!(ProjectRole::Owner.has_permission(&ProjectRole::Owner));
        assert!(ProjectRole::Admin.has_permission(&ProjectRole::Member));
        assert!(!ProjectRole::Admin.has_permission(&ProjectRole::Owner));
        assert!(!ProjectRole::Member.has_permission(&ProjectRole::Admin));
    }

    #[test]
    fn test_can_manage() {
        assert!(ProjectRole::Owner.can_manage());
        assert!(ProjectRole::Admin.can_manage());
        assert!(!ProjectRole::Member.can_manage());
    }

    #[test]
    fn test_role_serde_lowercase() {
        assert_eq!(serde_json::to_string(&ProjectRole::Admin).unwrap(), "\"admin\"");
        let role: ProjectRole = serde_json::from_str("\"member\"").unwrap();
        assert_eq!(role, ProjectRole::Member);
    }
}
