use anyhow::anyhow;
use sqlx::{PgPool, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::tenant::RoleContext;
use crate::utils::errors::AppError;
use crate::utils::pagination::PaginationMeta;
use crate::utils::password::{hash_password, verify_password};

use super::model::{
    ChangePasswordDto, CreateUserDto, PaginatedUsersResponse, UpdateUserDto, User, UserFilterParams,
};

const USER_COLUMNS: &str = "id, first_name, last_name, email, created_at, updated_at";

#[instrument(skip(db, dto), fields(email = %dto.email))]
pub async fn create_user(db: &PgPool, dto: CreateUserDto) -> Result<User, AppError> {
    let hashed = hash_password(&dto.password)?;

    let user: User = sqlx::query_as(&format!(
        r#"INSERT INTO users (first_name, last_name, email, password)
        VALUES ($1, $2, $3, $4)
        RETURNING {USER_COLUMNS}"#
    ))
    .bind(&dto.first_name)
    .bind(&dto.last_name)
    .bind(dto.email.to_lowercase())
    .bind(&hashed)
    .fetch_one(db)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::conflict(anyhow!("A user with this email already exists"))
        }
        _ => AppError::from(e),
    })?;

    Ok(user)
}

#[instrument(skip(db))]
pub async fn get_users(
    db: &PgPool,
    params: UserFilterParams,
    ctx: &RoleContext,
) -> Result<PaginatedUsersResponse, AppError> {
    let limit = params.pagination.limit();
    let offset = params.pagination.offset();

    // Tenant-scoped callers only see members of their own school.
    let school_filter = if ctx.is_global {
        params.school_id
    } else {
        Some(ctx.effective_school_id(params.school_id)?)
    };

    let mut query = QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users u WHERE 1=1"));
    let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM users u WHERE 1=1");

    for qb in [&mut query, &mut count_query] {
        if let Some(school_id) = school_filter {
            qb.push(
                " AND EXISTS (SELECT 1 FROM user_school_roles usr \
                 WHERE usr.user_id = u.id AND usr.school_id = ",
            )
            .push_bind(school_id)
            .push(")");
        }
        if let Some(search) = &params.search {
            let pattern = format!("%{}%", search);
            qb.push(" AND (u.first_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR u.last_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR u.email ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }

    query
        .push(" ORDER BY u.last_name, u.first_name LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let users: Vec<User> = query.build_query_as().fetch_all(db).await?;
    let total: i64 = count_query.build_query_scalar().fetch_one(db).await?;

    let has_more = offset + (users.len() as i64) < total;
    Ok(PaginatedUsersResponse {
        data: users,
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
pub async fn get_user_by_id(db: &PgPool, id: Uuid) -> Result<User, AppError> {
    sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::not_found(anyhow!("User not found")))
}

/// Like [`get_user_by_id`], but tenant-scoped callers only resolve users
/// holding a membership in their school; anyone else is a plain 404.
#[instrument(skip(db))]
pub async fn get_user_scoped(db: &PgPool, id: Uuid, ctx: &RoleContext) -> Result<User, AppError> {
    let user = get_user_by_id(db, id).await?;

    if !ctx.is_global {
        let school_id = ctx.effective_school_id(None)?;
        let is_member: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM user_school_roles WHERE user_id = $1 AND school_id = $2)",
        )
        .bind(id)
        .bind(school_id)
        .fetch_one(db)
        .await?;

        if !is_member {
            return Err(AppError::not_found(anyhow!("User not found")));
        }
    }

    Ok(user)
}

#[instrument(skip(db, dto))]
pub async fn update_user(db: &PgPool, id: Uuid, dto: UpdateUserDto) -> Result<User, AppError> {
    let existing = get_user_by_id(db, id).await?;

    let first_name = dto.first_name.unwrap_or(existing.first_name);
    let last_name = dto.last_name.unwrap_or(existing.last_name);
    let email = dto
        .email
        .map(|e| e.to_lowercase())
        .unwrap_or(existing.email);

    let user: User = sqlx::query_as(&format!(
        r#"UPDATE users SET first_name = $1, last_name = $2, email = $3, updated_at = NOW()
        WHERE id = $4
        RETURNING {USER_COLUMNS}"#
    ))
    .bind(&first_name)
    .bind(&last_name)
    .bind(&email)
    .bind(id)
    .fetch_one(db)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::conflict(anyhow!("A user with this email already exists"))
        }
        _ => AppError::from(e),
    })?;

    Ok(user)
}

#[instrument(skip(db, dto))]
pub async fn change_password(
    db: &PgPool,
    user_id: Uuid,
    dto: ChangePasswordDto,
) -> Result<(), AppError> {
    let current_hash: Option<String> = sqlx::query_scalar("SELECT password FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(db)
        .await?;

    let current_hash = current_hash.ok_or_else(|| AppError::not_found(anyhow!("User not found")))?;

    if !verify_password(&dto.current_password, &current_hash)? {
        return Err(AppError::unauthorized("Current password is incorrect"));
    }

    let new_hash = hash_password(&dto.new_password)?;
    sqlx::query("UPDATE users SET password = $1, updated_at = NOW() WHERE id = $2")
        .bind(&new_hash)
        .bind(user_id)
        .execute(db)
        .await?;

    Ok(())
}
