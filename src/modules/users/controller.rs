use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::middleware::permissions::{RequireUsersCreate, RequireUsersRead, RequireUsersUpdate};
use crate::middleware::tenant::RoleContext;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::validator::ValidatedJson;

use super::model::{
    ChangePasswordDto, CreateUserDto, PaginatedUsersResponse, UpdateUserDto, User, UserFilterParams,
};
use super::service;

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserDto,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Email already in use")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn create_user(
    State(state): State<AppState>,
    _guard: RequireUsersCreate,
    ValidatedJson(dto): ValidatedJson<CreateUserDto>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = service::create_user(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    get,
    path = "/api/users",
    params(
        ("search" = Option<String>, Query, description = "Substring match on name or email"),
        ("school_id" = Option<Uuid>, Query, description = "Restrict to members of this school"),
        ("page" = Option<i64>, Query, description = "Page number"),
        ("limit" = Option<i64>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "List of users", body = PaginatedUsersResponse),
        (status = 403, description = "Forbidden")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn get_users(
    State(state): State<AppState>,
    _guard: RequireUsersRead,
    ctx: RoleContext,
    Query(params): Query<UserFilterParams>,
) -> Result<Json<PaginatedUsersResponse>, AppError> {
    let result = service::get_users(&state.db, params, &ctx).await?;
    Ok(Json(result))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = User),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    State(state): State<AppState>,
    _guard: RequireUsersRead,
    ctx: RoleContext,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    let user = service::get_user_scoped(&state.db, id, &ctx).await?;
    Ok(Json(user))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserDto,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    State(state): State<AppState>,
    _guard: RequireUsersUpdate,
    ctx: RoleContext,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateUserDto>,
) -> Result<Json<User>, AppError> {
    // Visibility check first so scoped admins cannot probe other tenants.
    service::get_user_scoped(&state.db, id, &ctx).await?;
    let user = service::update_user(&state.db, id, dto).await?;
    Ok(Json(user))
}

#[utoipa::path(
    put,
    path = "/api/users/me/password",
    request_body = ChangePasswordDto,
    responses(
        (status = 204, description = "Password changed"),
        (status = 401, description = "Current password incorrect")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn change_own_password(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<ChangePasswordDto>,
) -> Result<StatusCode, AppError> {
    let user_id = auth_user.user_id()?;
    service::change_password(&state.db, user_id, dto).await?;
    Ok(StatusCode::NO_CONTENT)
}
