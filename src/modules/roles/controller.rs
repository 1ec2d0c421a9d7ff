use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::middleware::permissions::{
    RequireRolesAssign, RequireRolesCreate, RequireRolesDelete, RequireRolesUpdate,
};
use crate::middleware::tenant::RoleContext;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::validator::ValidatedJson;

use super::model::{
    AcceptInvitationDto, AssignPermissionsDto, CreateRoleDto, InviteUserDto,
    PaginatedPermissionsResponse, PaginatedRolesResponse, Permission, PermissionFilterParams,
    RoleFilterParams, RoleWithPermissions, SchoolMembership, UpdateRoleDto,
};
use super::service;

// ============ Permission catalog ============

#[utoipa::path(
    get,
    path = "/api/roles/permissions",
    params(
        ("category" = Option<String>, Query, description = "Filter by permission category"),
        ("page" = Option<i64>, Query, description = "Page number"),
        ("limit" = Option<i64>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "List of permissions", body = PaginatedPermissionsResponse),
        (status = 403, description = "Forbidden")
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
pub async fn get_permissions(
    State(state): State<AppState>,
    Query(params): Query<PermissionFilterParams>,
) -> Result<Json<PaginatedPermissionsResponse>, AppError> {
    let result = service::get_all_permissions(&state.db, params).await?;
    Ok(Json(result))
}

#[utoipa::path(
    get,
    path = "/api/roles/permissions/{id}",
    params(("id" = Uuid, Path, description = "Permission ID")),
    responses(
        (status = 200, description = "Permission details", body = Permission),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Permission not found")
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
pub async fn get_permission_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Permission>, AppError> {
    let permission = service::get_permission_by_id(&state.db, id).await?;
    Ok(Json(permission))
}

// ============ Roles ============

#[utoipa::path(
    post,
    path = "/api/roles",
    request_body = CreateRoleDto,
    responses(
        (status = 201, description = "Role created", body = RoleWithPermissions),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Name already in use in this scope")
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
pub async fn create_role(
    State(state): State<AppState>,
    _guard: RequireRolesCreate,
    ctx: RoleContext,
    ValidatedJson(dto): ValidatedJson<CreateRoleDto>,
) -> Result<(StatusCode, Json<RoleWithPermissions>), AppError> {
    let role = service::create_role(&state.db, dto, &ctx).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

#[utoipa::path(
    get,
    path = "/api/roles",
    params(
        ("school_id" = Option<Uuid>, Query, description = "Filter by school"),
        ("is_system_role" = Option<bool>, Query, description = "Restrict to global roles"),
        ("page" = Option<i64>, Query, description = "Page number"),
        ("limit" = Option<i64>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "List of roles with their permissions", body = PaginatedRolesResponse),
        (status = 403, description = "Forbidden")
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
pub async fn get_roles(
    State(state): State<AppState>,
    ctx: RoleContext,
    Query(params): Query<RoleFilterParams>,
) -> Result<Json<PaginatedRolesResponse>, AppError> {
    let result = service::get_roles(&state.db, params, &ctx).await?;
    Ok(Json(result))
}

#[utoipa::path(
    get,
    path = "/api/roles/{id}",
    params(("id" = Uuid, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role with its permissions", body = RoleWithPermissions),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Role not found")
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
pub async fn get_role_by_id(
    State(state): State<AppState>,
    ctx: RoleContext,
    Path(id): Path<Uuid>,
) -> Result<Json<RoleWithPermissions>, AppError> {
    let role = service::get_role_by_id(&state.db, id, &ctx).await?;
    Ok(Json(role))
}

#[utoipa::path(
    put,
    path = "/api/roles/{id}",
    params(("id" = Uuid, Path, description = "Role ID")),
    request_body = UpdateRoleDto,
    responses(
        (status = 200, description = "Role updated", body = RoleWithPermissions),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Role not found")
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
pub async fn update_role(
    State(state): State<AppState>,
    _guard: RequireRolesUpdate,
    ctx: RoleContext,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateRoleDto>,
) -> Result<Json<RoleWithPermissions>, AppError> {
    let role = service::update_role(&state.db, id, dto, &ctx).await?;
    Ok(Json(role))
}

#[utoipa::path(
    delete,
    path = "/api/roles/{id}",
    params(("id" = Uuid, Path, description = "Role ID")),
    responses(
        (status = 204, description = "Role deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Role not found")
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
pub async fn delete_role(
    State(state): State<AppState>,
    _guard: RequireRolesDelete,
    ctx: RoleContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service::delete_role(&state.db, id, &ctx).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============ Role permissions ============

#[utoipa::path(
    post,
    path = "/api/roles/{id}/permissions",
    params(("id" = Uuid, Path, description = "Role ID")),
    request_body = AssignPermissionsDto,
    responses(
        (status = 200, description = "Permissions granted", body = RoleWithPermissions),
        (status = 400, description = "Invalid permission IDs"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Role not found")
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
pub async fn assign_permissions(
    State(state): State<AppState>,
    _guard: RequireRolesUpdate,
    ctx: RoleContext,
    Path(role_id): Path<Uuid>,
    Json(dto): Json<AssignPermissionsDto>,
) -> Result<Json<RoleWithPermissions>, AppError> {
    let role = service::assign_permissions_to_role(&state.db, role_id, dto, &ctx).await?;
    Ok(Json(role))
}

#[utoipa::path(
    delete,
    path = "/api/roles/{id}/permissions/{permission_id}",
    params(
        ("id" = Uuid, Path, description = "Role ID"),
        ("permission_id" = Uuid, Path, description = "Permission ID")
    ),
    responses(
        (status = 200, description = "Permission removed", body = RoleWithPermissions),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Role not found")
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
pub async fn remove_permission(
    State(state): State<AppState>,
    _guard: RequireRolesUpdate,
    ctx: RoleContext,
    Path((role_id, permission_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<RoleWithPermissions>, AppError> {
    let role =
        service::remove_permission_from_role(&state.db, role_id, permission_id, &ctx).await?;
    Ok(Json(role))
}

// ============ Memberships ============

#[utoipa::path(
    post,
    path = "/api/memberships",
    request_body = InviteUserDto,
    responses(
        (status = 201, description = "Invitation created", body = SchoolMembership),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User or role not found"),
        (status = 409, description = "User already has a role in this school")
    ),
    tag = "Memberships",
    security(("bearer_auth" = []))
)]
pub async fn invite_user(
    State(state): State<AppState>,
    _guard: RequireRolesAssign,
    ctx: RoleContext,
    ValidatedJson(dto): ValidatedJson<InviteUserDto>,
) -> Result<(StatusCode, Json<SchoolMembership>), AppError> {
    let membership =
        service::invite_user(&state.db, state.email_config.clone(), dto, &ctx).await?;
    Ok((StatusCode::CREATED, Json(membership)))
}

#[utoipa::path(
    post,
    path = "/api/memberships/accept",
    request_body = AcceptInvitationDto,
    responses(
        (status = 200, description = "Invitation accepted", body = SchoolMembership),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No pending invitation")
    ),
    tag = "Memberships",
    security(("bearer_auth" = []))
)]
pub async fn accept_invitation(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(dto): Json<AcceptInvitationDto>,
) -> Result<Json<SchoolMembership>, AppError> {
    let user_id = auth_user.user_id()?;
    let membership = service::accept_invitation(&state.db, user_id, dto.school_id).await?;
    Ok(Json(membership))
}

#[derive(Debug, serde::Deserialize, utoipa::ToSchema)]
pub struct RevokeMembershipParams {
    pub school_id: Option<Uuid>,
}

#[utoipa::path(
    delete,
    path = "/api/memberships/{user_id}",
    params(
        ("user_id" = Uuid, Path, description = "User ID"),
        ("school_id" = Option<Uuid>, Query, description = "School (global callers only)")
    ),
    responses(
        (status = 204, description = "Membership revoked"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "No membership found")
    ),
    tag = "Memberships",
    security(("bearer_auth" = []))
)]
pub async fn revoke_membership(
    State(state): State<AppState>,
    _guard: RequireRolesAssign,
    ctx: RoleContext,
    Path(user_id): Path<Uuid>,
    Query(params): Query<RevokeMembershipParams>,
) -> Result<StatusCode, AppError> {
    service::revoke_membership(&state.db, user_id, params.school_id, &ctx).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/users/{id}/memberships",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User's school memberships", body = Vec<SchoolMembership>),
        (status = 403, description = "Forbidden")
    ),
    tag = "Memberships",
    security(("bearer_auth" = []))
)]
pub async fn get_user_memberships(
    State(state): State<AppState>,
    _guard: RequireRolesAssign,
    ctx: RoleContext,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<SchoolMembership>>, AppError> {
    let memberships = service::get_user_memberships(&state.db, user_id, &ctx).await?;
    Ok(Json(memberships))
}
