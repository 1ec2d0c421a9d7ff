use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::middleware::permissions::{
    RequireParentsCreate, RequireParentsDelete, RequireParentsLink, RequireParentsRead,
    RequireParentsUpdate,
};
use crate::middleware::tenant::RoleContext;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::validator::ValidatedJson;

use super::model::{
    CreateParentDto, LinkStudentDto, PaginatedParentsResponse, Parent, ParentFilterParams,
    ParentWithStudents, UpdateParentDto,
};
use super::service;

#[utoipa::path(
    post,
    path = "/api/parents",
    request_body = CreateParentDto,
    responses(
        (status = 201, description = "Parent created", body = Parent),
        (status = 403, description = "Forbidden")
    ),
    tag = "Parents",
    security(("bearer_auth" = []))
)]
pub async fn create_parent(
    State(state): State<AppState>,
    _guard: RequireParentsCreate,
    ctx: RoleContext,
    ValidatedJson(dto): ValidatedJson<CreateParentDto>,
) -> Result<(StatusCode, Json<Parent>), AppError> {
    let parent = service::create_parent(&state.db, dto, &ctx).await?;
    Ok((StatusCode::CREATED, Json(parent)))
}

#[utoipa::path(
    get,
    path = "/api/parents",
    params(
        ("search" = Option<String>, Query, description = "Substring match on name or email"),
        ("school_id" = Option<Uuid>, Query, description = "School filter (global callers only)"),
        ("page" = Option<i64>, Query, description = "Page number"),
        ("limit" = Option<i64>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "List of parents", body = PaginatedParentsResponse),
        (status = 403, description = "Forbidden")
    ),
    tag = "Parents",
    security(("bearer_auth" = []))
)]
pub async fn get_parents(
    State(state): State<AppState>,
    _guard: RequireParentsRead,
    ctx: RoleContext,
    Query(params): Query<ParentFilterParams>,
) -> Result<Json<PaginatedParentsResponse>, AppError> {
    let result = service::get_parents(&state.db, params, &ctx).await?;
    Ok(Json(result))
}

#[utoipa::path(
    get,
    path = "/api/parents/{id}",
    params(("id" = Uuid, Path, description = "Parent ID")),
    responses(
        (status = 200, description = "Parent with linked students", body = ParentWithStudents),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Parent not found")
    ),
    tag = "Parents",
    security(("bearer_auth" = []))
)]
pub async fn get_parent(
    State(state): State<AppState>,
    _guard: RequireParentsRead,
    ctx: RoleContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ParentWithStudents>, AppError> {
    let parent = service::get_parent_by_id(&state.db, id, &ctx).await?;
    Ok(Json(parent))
}

#[utoipa::path(
    put,
    path = "/api/parents/{id}",
    params(("id" = Uuid, Path, description = "Parent ID")),
    request_body = UpdateParentDto,
    responses(
        (status = 200, description = "Parent updated", body = Parent),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Parent not found")
    ),
    tag = "Parents",
    security(("bearer_auth" = []))
)]
pub async fn update_parent(
    State(state): State<AppState>,
    _guard: RequireParentsUpdate,
    ctx: RoleContext,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateParentDto>,
) -> Result<Json<Parent>, AppError> {
    let parent = service::update_parent(&state.db, id, dto, &ctx).await?;
    Ok(Json(parent))
}

#[utoipa::path(
    delete,
    path = "/api/parents/{id}",
    params(("id" = Uuid, Path, description = "Parent ID")),
    responses(
        (status = 204, description = "Parent deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Parent not found")
    ),
    tag = "Parents",
    security(("bearer_auth" = []))
)]
pub async fn delete_parent(
    State(state): State<AppState>,
    _guard: RequireParentsDelete,
    ctx: RoleContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service::delete_parent(&state.db, id, &ctx).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/parents/{id}/students",
    params(("id" = Uuid, Path, description = "Parent ID")),
    request_body = LinkStudentDto,
    responses(
        (status = 200, description = "Student linked", body = ParentWithStudents),
        (status = 400, description = "Student and parent in different schools"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Parent or student not found")
    ),
    tag = "Parents",
    security(("bearer_auth" = []))
)]
pub async fn link_student(
    State(state): State<AppState>,
    _guard: RequireParentsLink,
    ctx: RoleContext,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<LinkStudentDto>,
) -> Result<Json<ParentWithStudents>, AppError> {
    let parent =
        service::link_student(&state.db, id, dto.student_id, &dto.relationship, &ctx).await?;
    Ok(Json(parent))
}

#[utoipa::path(
    delete,
    path = "/api/parents/{id}/students/{student_id}",
    params(
        ("id" = Uuid, Path, description = "Parent ID"),
        ("student_id" = Uuid, Path, description = "Student ID")
    ),
    responses(
        (status = 204, description = "Student unlinked"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Link not found")
    ),
    tag = "Parents",
    security(("bearer_auth" = []))
)]
pub async fn unlink_student(
    State(state): State<AppState>,
    _guard: RequireParentsLink,
    ctx: RoleContext,
    Path((parent_id, student_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    service::unlink_student(&state.db, parent_id, student_id, &ctx).await?;
    Ok(StatusCode::NO_CONTENT)
}
