use anyhow::anyhow;
use sqlx::{PgPool, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::tenant::RoleContext;
use crate::utils::errors::AppError;
use crate::utils::pagination::PaginationMeta;

use super::model::{
    CreateStudentDto, PaginatedStudentsResponse, Student, StudentFilterParams, UpdateStudentDto,
};

const STUDENT_COLUMNS: &str = "id, school_id, first_name, last_name, admission_number, \
     date_of_birth, level, is_active, created_at, updated_at";

#[instrument(skip(db, dto), fields(admission_number = %dto.admission_number))]
pub async fn create_student(
    db: &PgPool,
    dto: CreateStudentDto,
    ctx: &RoleContext,
) -> Result<Student, AppError> {
    let school_id = ctx.effective_school_id(dto.school_id)?;

    let student: Student = sqlx::query_as(&format!(
        r#"INSERT INTO students (school_id, first_name, last_name, admission_number, date_of_birth, level)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {STUDENT_COLUMNS}"#
    ))
    .bind(school_id)
    .bind(&dto.first_name)
    .bind(&dto.last_name)
    .bind(&dto.admission_number)
    .bind(dto.date_of_birth)
    .bind(&dto.level)
    .fetch_one(db)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => AppError::conflict(
            anyhow!("A student with this admission number already exists in this school"),
        ),
        _ => AppError::from(e),
    })?;

    Ok(student)
}

#[instrument(skip(db))]
pub async fn get_students(
    db: &PgPool,
    params: StudentFilterParams,
    ctx: &RoleContext,
) -> Result<PaginatedStudentsResponse, AppError> {
    let limit = params.pagination.limit();
    let offset = params.pagination.offset();

    let school_filter = if ctx.is_global {
        params.school_id
    } else {
        Some(ctx.effective_school_id(params.school_id)?)
    };

    let mut query = QueryBuilder::new(format!("SELECT {STUDENT_COLUMNS} FROM students WHERE 1=1"));
    let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM students WHERE 1=1");

    for qb in [&mut query, &mut count_query] {
        if let Some(school_id) = school_filter {
            qb.push(" AND school_id = ").push_bind(school_id);
        }
        if let Some(search) = &params.search {
            let pattern = format!("%{}%", search);
            qb.push(" AND (first_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR last_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR admission_number ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(level) = &params.level {
            qb.push(" AND level = ").push_bind(level.clone());
        }
        if let Some(is_active) = params.is_active {
            qb.push(" AND is_active = ").push_bind(is_active);
        }
    }

    query
        .push(" ORDER BY last_name, first_name LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let students: Vec<Student> = query.build_query_as().fetch_all(db).await?;
    let total: i64 = count_query.build_query_scalar().fetch_one(db).await?;

    let has_more = offset + (students.len() as i64) < total;
    Ok(PaginatedStudentsResponse {
        data: students,
        meta: PaginationMeta {
            total,
            limit,
            offset: Some(offset),
            page: params.pagination.page(),
            has_more,
        },
    })
}

#[instrument(skip(db))]
pub async fn get_student_by_id(
    db: &PgPool,
    id: Uuid,
    ctx: &RoleContext,
) -> Result<Student, AppError> {
    let student: Student = sqlx::query_as(&format!(
        "SELECT {STUDENT_COLUMNS} FROM students WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::not_found(anyhow!("Student not found")))?;

    if !ctx.is_global && Some(student.school_id) != ctx.school_id {
        // Cross-tenant lookups read as absent rows.
        return Err(AppError::not_found(anyhow!("Student not found")));
    }

    Ok(student)
}

#[instrument(skip(db, dto))]
pub async fn update_student(
    db: &PgPool,
    id: Uuid,
    dto: UpdateStudentDto,
    ctx: &RoleContext,
) -> Result<Student, AppError> {
    let existing = get_student_by_id(db, id, ctx).await?;

    let first_name = dto.first_name.unwrap_or(existing.first_name);
    let last_name = dto.last_name.unwrap_or(existing.last_name);
    let date_of_birth = dto.date_of_birth.or(existing.date_of_birth);
    let level = dto.level.or(existing.level);
    let is_active = dto.is_active.unwrap_or(existing.is_active);

    let student: Student = sqlx::query_as(&format!(
        r#"UPDATE students
        SET first_name = $1, last_name = $2, date_of_birth = $3, level = $4, is_active = $5,
            updated_at = NOW()
        WHERE id = $6
        RETURNING {STUDENT_COLUMNS}"#
    ))
    .bind(&first_name)
    .bind(&last_name)
    .bind(date_of_birth)
    .bind(&level)
    .bind(is_active)
    .bind(id)
    .fetch_one(db)
    .await?;

    Ok(student)
}

#[instrument(skip(db))]
pub async fn delete_student(db: &PgPool, id: Uuid, ctx: &RoleContext) -> Result<(), AppError> {
    // Visibility check doubles as the tenancy check.
    let _ = get_student_by_id(db, id, ctx).await?;

    sqlx::query("DELETE FROM students WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;

    Ok(())
}
