use anyhow::anyhow;
use sqlx::{PgPool, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::tenant::RoleContext;
use crate::modules::students::model::Student;
use crate::modules::students::service::get_student_by_id;
use crate::utils::errors::AppError;
use crate::utils::pagination::PaginationMeta;

use super::model::{
    CreateParentDto, PaginatedParentsResponse, Parent, ParentFilterParams, ParentWithStudents,
    UpdateParentDto,
};

const PARENT_COLUMNS: &str =
    "id, school_id, first_name, last_name, email, phone, created_at, updated_at";

#[instrument(skip(db, dto))]
pub async fn create_parent(
    db: &PgPool,
    dto: CreateParentDto,
    ctx: &RoleContext,
) -> Result<Parent, AppError> {
    let school_id = ctx.effective_school_id(dto.school_id)?;

    let parent: Parent = sqlx::query_as(&format!(
        r#"INSERT INTO parents (school_id, first_name, last_name, email, phone)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {PARENT_COLUMNS}"#
    ))
    .bind(school_id)
    .bind(&dto.first_name)
    .bind(&dto.last_name)
    .bind(dto.email.as_ref().map(|e| e.to_lowercase()))
    .bind(&dto.phone)
    .fetch_one(db)
    .await?;

    Ok(parent)
}

#[instrument(skip(db))]
pub async fn get_parents(
    db: &PgPool,
    params: ParentFilterParams,
    ctx: &RoleContext,
) -> Result<PaginatedParentsResponse, AppError> {
    let limit = params.pagination.limit();
    let offset = params.pagination.offset();

    let school_filter = if ctx.is_global {
        params.school_id
    } else {
        Some(ctx.effective_school_id(params.school_id)?)
    };

    let mut query = QueryBuilder::new(format!("SELECT {PARENT_COLUMNS} FROM parents WHERE 1=1"));
    let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM parents WHERE 1=1");

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
                .push(" OR email ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }

    query
        .push(" ORDER BY last_name, first_name LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let parents: Vec<Parent> = query.build_query_as().fetch_all(db).await?;
    let total: i64 = count_query.build_query_scalar().fetch_one(db).await?;

    let has_more = offset + (parents.len() as i64) < total;
    Ok(PaginatedParentsResponse {
        data: parents,
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
pub async fn get_parent_by_id(
    db: &PgPool,
    id: Uuid,
    ctx: &RoleContext,
) -> Result<ParentWithStudents, AppError> {
    let parent: Parent = sqlx::query_as(&format!(
        "SELECT {PARENT_COLUMNS} FROM parents WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::not_found(anyhow!("Parent not found")))?;

    if !ctx.is_global && Some(parent.school_id) != ctx.school_id {
        return Err(AppError::not_found(anyhow!("Parent not found")));
    }

    let students = get_linked_students(db, parent.id).await?;
    Ok(ParentWithStudents { parent, students })
}

#[instrument(skip(db, dto))]
pub async fn update_parent(
    db: &PgPool,
    id: Uuid,
    dto: UpdateParentDto,
    ctx: &RoleContext,
) -> Result<Parent, AppError> {
    let existing = get_parent_by_id(db, id, ctx).await?.parent;

    let first_name = dto.first_name.unwrap_or(existing.first_name);
    let last_name = dto.last_name.unwrap_or(existing.last_name);
    let email = dto.email.map(|e| e.to_lowercase()).or(existing.email);
    let phone = dto.phone.or(existing.phone);

    let parent: Parent = sqlx::query_as(&format!(
        r#"UPDATE parents
        SET first_name = $1, last_name = $2, email = $3, phone = $4, updated_at = NOW()
        WHERE id = $5
        RETURNING {PARENT_COLUMNS}"#
    ))
    .bind(&first_name)
    .bind(&last_name)
    .bind(&email)
    .bind(&phone)
    .bind(id)
    .fetch_one(db)
    .await?;

    Ok(parent)
}

#[instrument(skip(db))]
pub async fn delete_parent(db: &PgPool, id: Uuid, ctx: &RoleContext) -> Result<(), AppError> {
    let _ = get_parent_by_id(db, id, ctx).await?;

    sqlx::query("DELETE FROM parents WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;

    Ok(())
}

// ============ Student links ============

async fn get_linked_students(db: &PgPool, parent_id: Uuid) -> Result<Vec<Student>, AppError> {
    let students = sqlx::query_as(
        r#"
        SELECT s.id, s.school_id, s.first_name, s.last_name, s.admission_number,
               s.date_of_birth, s.level, s.is_active, s.created_at, s.updated_at
        FROM students s
        INNER JOIN student_parents sp ON sp.student_id = s.id
        WHERE sp.parent_id = $1
        ORDER BY s.last_name, s.first_name
        "#,
    )
    .bind(parent_id)
    .fetch_all(db)
    .await?;

    Ok(students)
}

/// Links a student to a parent. Both must belong to the same school.
#[instrument(skip(db))]
pub async fn link_student(
    db: &PgPool,
    parent_id: Uuid,
    student_id: Uuid,
    relationship: &str,
    ctx: &RoleContext,
) -> Result<ParentWithStudents, AppError> {
    let parent = get_parent_by_id(db, parent_id, ctx).await?.parent;
    let student = get_student_by_id(db, student_id, ctx).await?;

    if student.school_id != parent.school_id {
        return Err(AppError::bad_request(anyhow!(
            "Student and parent belong to different schools"
        )));
    }

    sqlx::query(
        r#"INSERT INTO student_parents (student_id, parent_id, relationship)
        VALUES ($1, $2, $3)
        ON CONFLICT (student_id, parent_id) DO UPDATE SET relationship = EXCLUDED.relationship"#,
    )
    .bind(student_id)
    .bind(parent_id)
    .bind(relationship)
    .execute(db)
    .await?;

    let students = get_linked_students(db, parent_id).await?;
    Ok(ParentWithStudents { parent, students })
}

#[instrument(skip(db))]
pub async fn unlink_student(
    db: &PgPool,
    parent_id: Uuid,
    student_id: Uuid,
    ctx: &RoleContext,
) -> Result<(), AppError> {
    let _ = get_parent_by_id(db, parent_id, ctx).await?;

    let result = sqlx::query(
        "DELETE FROM student_parents WHERE student_id = $1 AND parent_id = $2",
    )
    .bind(student_id)
    .bind(parent_id)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found(anyhow!(
            "Student is not linked to this parent"
        )));
    }

    Ok(())
}
