use anyhow::anyhow;
use sqlx::{PgPool, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::tenant::RoleContext;
use crate::utils::errors::AppError;
use crate::utils::pagination::PaginationMeta;

use super::model::{CreateSchoolDto, PaginatedSchoolsResponse, School, SchoolFilterParams, UpdateSchoolDto};

const SCHOOL_COLUMNS: &str =
    "id, name, address, contact_email, contact_phone, is_active, created_at, updated_at";

#[instrument(skip(db, dto), fields(name = %dto.name))]
pub async fn create_school(
    db: &PgPool,
    dto: CreateSchoolDto,
    ctx: &RoleContext,
) -> Result<School, AppError> {
    // Tenants are onboarded by global operators only.
    if !ctx.is_global {
        return Err(AppError::forbidden("Only global operators can create schools"));
    }

    let school: School = sqlx::query_as(&format!(
        r#"INSERT INTO schools (name, address, contact_email, contact_phone)
        VALUES ($1, $2, $3, $4)
        RETURNING {SCHOOL_COLUMNS}"#
    ))
    .bind(&dto.name)
    .bind(&dto.address)
    .bind(&dto.contact_email)
    .bind(&dto.contact_phone)
    .fetch_one(db)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::conflict(anyhow!("A school with this name already exists"))
        }
        _ => AppError::from(e),
    })?;

    Ok(school)
}

#[instrument(skip(db))]
pub async fn get_schools(
    db: &PgPool,
    params: SchoolFilterParams,
    ctx: &RoleContext,
) -> Result<PaginatedSchoolsResponse, AppError> {
    let limit = params.pagination.limit();
    let offset = params.pagination.offset();

    let mut query = QueryBuilder::new(format!("SELECT {SCHOOL_COLUMNS} FROM schools WHERE 1=1"));
    let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM schools WHERE 1=1");

    for qb in [&mut query, &mut count_query] {
        if !ctx.is_global {
            // Tenant-scoped callers only see their own school.
            let own = ctx.effective_school_id(None)?;
            qb.push(" AND id = ").push_bind(own);
        }
        if let Some(search) = &params.search {
            qb.push(" AND name ILIKE ").push_bind(format!("%{}%", search));
        }
        if let Some(is_active) = params.is_active {
            qb.push(" AND is_active = ").push_bind(is_active);
        }
    }

    query
        .push(" ORDER BY name LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let schools: Vec<School> = query.build_query_as().fetch_all(db).await?;
    let total: i64 = count_query.build_query_scalar().fetch_one(db).await?;

    let has_more = offset + (schools.len() as i64) < total;
    Ok(PaginatedSchoolsResponse {
        data: schools,
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
pub async fn get_school_by_id(db: &PgPool, id: Uuid, ctx: &RoleContext) -> Result<School, AppError> {
    if !ctx.is_global {
        // Resolving another tenant's school is a plain 404, not a 403,
        // so school ids are not probeable.
        let own = ctx.effective_school_id(None)?;
        if own != id {
            return Err(AppError::not_found(anyhow!("School not found")));
        }
    }

    sqlx::query_as(&format!("SELECT {SCHOOL_COLUMNS} FROM schools WHERE id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("School not found")))
}

#[instrument(skip(db, dto))]
pub async fn update_school(
    db: &PgPool,
    id: Uuid,
    dto: UpdateSchoolDto,
    ctx: &RoleContext,
) -> Result<School, AppError> {
    let existing = get_school_by_id(db, id, ctx).await?;

    let name = dto.name.unwrap_or(existing.name);
    let address = dto.address.or(existing.address);
    let contact_email = dto.contact_email.or(existing.contact_email);
    let contact_phone = dto.contact_phone.or(existing.contact_phone);

    let school: School = sqlx::query_as(&format!(
        r#"UPDATE schools
        SET name = $1, address = $2, contact_email = $3, contact_phone = $4, updated_at = NOW()
        WHERE id = $5
        RETURNING {SCHOOL_COLUMNS}"#
    ))
    .bind(&name)
    .bind(&address)
    .bind(&contact_email)
    .bind(&contact_phone)
    .bind(id)
    .fetch_one(db)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::conflict(anyhow!("A school with this name already exists"))
        }
        _ => AppError::from(e),
    })?;

    Ok(school)
}

#[instrument(skip(db))]
pub async fn deactivate_school(db: &PgPool, id: Uuid, ctx: &RoleContext) -> Result<(), AppError> {
    if !ctx.is_global {
        return Err(AppError::forbidden("Only global operators can deactivate schools"));
    }

    let result = sqlx::query("UPDATE schools SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found(anyhow!("School not found")));
    }

    Ok(())
}
