use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::middleware::permissions::{
    RequireStudentsCreate, RequireStudentsDelete, RequireStudentsRead, RequireStudentsUpdate,
};
use crate::middleware::tenant::RoleContext;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::validator::ValidatedJson;

use super::model::{
    CreateStudentDto, PaginatedStudentsResponse, Student, StudentFilterParams, UpdateStudentDto,
};
use super::service;

#[utoipa::path(
    post,
    path = "/api/students",
    request_body = CreateStudentDto,
    responses(
        (status = 201, description = "Student created", body = Student),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Admission number already in use")
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
pub async fn create_student(
    State(state): State<AppState>,
    _guard: RequireStudentsCreate,
    ctx: RoleContext,
    ValidatedJson(dto): ValidatedJson<CreateStudentDto>,
) -> Result<(StatusCode, Json<Student>), AppError> {
    let student = service::create_student(&state.db, dto, &ctx).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

#[utoipa::path(
    get,
    path = "/api/students",
    params(
        ("search" = Option<String>, Query, description = "Substring match on name or admission number"),
        ("level" = Option<String>, Query, description = "Filter by level"),
        ("is_active" = Option<bool>, Query, description = "Filter by active flag"),
        ("school_id" = Option<Uuid>, Query, description = "School filter (global callers only)"),
        ("page" = Option<i64>, Query, description = "Page number"),
        ("limit" = Option<i64>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "List of students", body = PaginatedStudentsResponse),
        (status = 403, description = "Forbidden")
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
pub async fn get_students(
    State(state): State<AppState>,
    _guard: RequireStudentsRead,
    ctx: RoleContext,
    Query(params): Query<StudentFilterParams>,
) -> Result<Json<PaginatedStudentsResponse>, AppError> {
    let result = service::get_students(&state.db, params, &ctx).await?;
    Ok(Json(result))
}

#[utoipa::path(
    get,
    path = "/api/students/{id}",
    params(("id" = Uuid, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student details", body = Student),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Student not found")
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
pub async fn get_student(
    State(state): State<AppState>,
    _guard: RequireStudentsRead,
    ctx: RoleContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Student>, AppError> {
    let student = service::get_student_by_id(&state.db, id, &ctx).await?;
    Ok(Json(student))
}

#[utoipa::path(
    put,
    path = "/api/students/{id}",
    params(("id" = Uuid, Path, description = "Student ID")),
    request_body = UpdateStudentDto,
    responses(
        (status = 200, description = "Student updated", body = Student),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Student not found")
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
pub async fn update_student(
    State(state): State<AppState>,
    _guard: RequireStudentsUpdate,
    ctx: RoleContext,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateStudentDto>,
) -> Result<Json<Student>, AppError> {
    let student = service::update_student(&state.db, id, dto, &ctx).await?;
    Ok(Json(student))
}

#[utoipa::path(
    delete,
    path = "/api/students/{id}",
    params(("id" = Uuid, Path, description = "Student ID")),
    responses(
        (status = 204, description = "Student deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Student not found")
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
pub async fn delete_student(
    State(state): State<AppState>,
    _guard: RequireStudentsDelete,
    ctx: RoleContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service::delete_student(&state.db, id, &ctx).await?;
    Ok(StatusCode::NO_CONTENT)
}
