use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::middleware::permissions::{
    RequireSchoolsCreate, RequireSchoolsDelete, RequireSchoolsRead, RequireSchoolsUpdate,
};
use crate::middleware::tenant::RoleContext;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::validator::ValidatedJson;

use super::model::{
    CreateSchoolDto, PaginatedSchoolsResponse, School, SchoolFilterParams, UpdateSchoolDto,
};
use super::service;

#[utoipa::path(
    post,
    path = "/api/schools",
    request_body = CreateSchoolDto,
    responses(
        (status = 201, description = "School created", body = School),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Name already in use")
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
pub async fn create_school(
    State(state): State<AppState>,
    _guard: RequireSchoolsCreate,
    ctx: RoleContext,
    ValidatedJson(dto): ValidatedJson<CreateSchoolDto>,
) -> Result<(StatusCode, Json<School>), AppError> {
    let school = service::create_school(&state.db, dto, &ctx).await?;
    Ok((StatusCode::CREATED, Json(school)))
}

#[utoipa::path(
    get,
    path = "/api/schools",
    params(
        ("search" = Option<String>, Query, description = "Substring match on name"),
        ("is_active" = Option<bool>, Query, description = "Filter by active flag"),
        ("page" = Option<i64>, Query, description = "Page number"),
        ("limit" = Option<i64>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "List of schools", body = PaginatedSchoolsResponse),
        (status = 403, description = "Forbidden")
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
pub async fn get_schools(
    State(state): State<AppState>,
    _guard: RequireSchoolsRead,
    ctx: RoleContext,
    Query(params): Query<SchoolFilterParams>,
) -> Result<Json<PaginatedSchoolsResponse>, AppError> {
    let result = service::get_schools(&state.db, params, &ctx).await?;
    Ok(Json(result))
}

#[utoipa::path(
    get,
    path = "/api/schools/{id}",
    params(("id" = Uuid, Path, description = "School ID")),
    responses(
        (status = 200, description = "School details", body = School),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "School not found")
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
pub async fn get_school(
    State(state): State<AppState>,
    _guard: RequireSchoolsRead,
    ctx: RoleContext,
    Path(id): Path<Uuid>,
) -> Result<Json<School>, AppError> {
    let school = service::get_school_by_id(&state.db, id, &ctx).await?;
    Ok(Json(school))
}

#[utoipa::path(
    put,
    path = "/api/schools/{id}",
    params(("id" = Uuid, Path, description = "School ID")),
    request_body = UpdateSchoolDto,
    responses(
        (status = 200, description = "School updated", body = School),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "School not found")
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
pub async fn update_school(
    State(state): State<AppState>,
    _guard: RequireSchoolsUpdate,
    ctx: RoleContext,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateSchoolDto>,
) -> Result<Json<School>, AppError> {
    let school = service::update_school(&state.db, id, dto, &ctx).await?;
    Ok(Json(school))
}

#[utoipa::path(
    delete,
    path = "/api/schools/{id}",
    params(("id" = Uuid, Path, description = "School ID")),
    responses(
        (status = 204, description = "School deactivated"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "School not found")
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
pub async fn deactivate_school(
    State(state): State<AppState>,
    _guard: RequireSchoolsDelete,
    ctx: RoleContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service::deactivate_school(&state.db, id, &ctx).await?;
    Ok(StatusCode::NO_CONTENT)
}
