use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// An atomic named capability, e.g. `grades:edit`. Seeded at system setup
/// and rarely mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Permission {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// A named bundle of permissions. `school_id = NULL` marks a global/system
/// role that applies across tenants; otherwise the role belongs to one
/// school. Roles are soft-deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub school_id: Option<Uuid>,
    pub is_system_role: bool,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoleWithPermissions {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<Permission>,
}

/// A user's role within one school, with the invitation trail.
/// `school_id = NULL` marks a global assignment through a tenant-null role.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SchoolMembership {
    pub id: Uuid,
    pub user_id: Uuid,
    pub school_id: Option<Uuid>,
    pub role_id: Uuid,
    pub is_active: bool,
    pub is_validated: bool,
    pub invited_by: Option<Uuid>,
    pub invited_at: chrono::DateTime<chrono::Utc>,
    pub accepted_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

// DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateRoleDto {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,
    #[validate(length(max = 500, message = "Description must not exceed 500 characters"))]
    pub description: Option<String>,
    /// School the role belongs to. Global callers may omit it to create a
    /// global role; tenant-scoped callers always create roles in their own
    /// school.
    pub school_id: Option<Uuid>,
    /// Permission IDs to grant on creation
    pub permission_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateRoleDto {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Description must not exceed 500 characters"))]
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignPermissionsDto {
    pub permission_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct InviteUserDto {
    /// Email of an existing user to invite into the school
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    pub role_id: Uuid,
    /// Target school. Global callers must name one; tenant-scoped callers
    /// may omit it and always invite into their own school.
    pub school_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AcceptInvitationDto {
    pub school_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RoleFilterParams {
    /// Filter by school (global callers only; tenant callers are pinned)
    pub school_id: Option<Uuid>,
    /// Restrict to global/system roles
    pub is_system_role: Option<bool>,
    #[serde(flatten)]
    pub pagination: crate::utils::pagination::PaginationParams,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PermissionFilterParams {
    /// Filter by category
    pub category: Option<String>,
    #[serde(flatten)]
    pub pagination: crate::utils::pagination::PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedRolesResponse {
    pub data: Vec<RoleWithPermissions>,
    pub meta: crate::utils::pagination::PaginationMeta,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedPermissionsResponse {
    pub data: Vec<Permission>,
    pub meta: crate::utils::pagination::PaginationMeta,
}
