use anyhow::anyhow;
use sqlx::{PgPool, QueryBuilder};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::config::email::EmailConfig;
use crate::middleware::tenant::RoleContext;
use crate::utils::email::EmailService;
use crate::utils::errors::AppError;
use crate::utils::pagination::PaginationMeta;

use super::model::{
    AssignPermissionsDto, CreateRoleDto, InviteUserDto, PaginatedPermissionsResponse,
    PaginatedRolesResponse, Permission, PermissionFilterParams, Role, RoleFilterParams,
    RoleWithPermissions, SchoolMembership, UpdateRoleDto,
};

const PERMISSION_COLUMNS: &str =
    "id, name, description, category, is_active, created_at, updated_at";
const ROLE_COLUMNS: &str =
    "id, name, description, school_id, is_system_role, is_active, created_at, updated_at";
const MEMBERSHIP_COLUMNS: &str = "id, user_id, school_id, role_id, is_active, is_validated, \
     invited_by, invited_at, accepted_at, created_at";

// ============ Permissions ============

#[instrument(skip(db))]
pub async fn get_all_permissions(
    db: &PgPool,
    params: PermissionFilterParams,
) -> Result<PaginatedPermissionsResponse, AppError> {
    let limit = params.pagination.limit();
    let offset = params.pagination.offset();

    let mut query = QueryBuilder::new(format!(
        "SELECT {PERMISSION_COLUMNS} FROM permissions WHERE 1=1"
    ));
    let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM permissions WHERE 1=1");

    for qb in [&mut query, &mut count_query] {
        if let Some(category) = &params.category {
            qb.push(" AND category = ").push_bind(category.clone());
        }
    }

    query
        .push(" ORDER BY category, name LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let permissions: Vec<Permission> = query.build_query_as().fetch_all(db).await?;
    let total: i64 = count_query.build_query_scalar().fetch_one(db).await?;

    let has_more = offset + (permissions.len() as i64) < total;
    Ok(PaginatedPermissionsResponse {
        data: permissions,
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
pub async fn get_permission_by_id(db: &PgPool, id: Uuid) -> Result<Permission, AppError> {
    sqlx::query_as(&format!(
        "SELECT {PERMISSION_COLUMNS} FROM permissions WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::not_found(anyhow!("Permission not found")))
}

#[instrument(skip(db))]
pub async fn get_permissions_by_ids(db: &PgPool, ids: &[Uuid]) -> Result<Vec<Permission>, AppError> {
    let permissions = sqlx::query_as(&format!(
        "SELECT {PERMISSION_COLUMNS} FROM permissions WHERE id = ANY($1)"
    ))
    .bind(ids)
    .fetch_all(db)
    .await?;

    Ok(permissions)
}

// ============ Roles ============

#[instrument(skip(db, dto), fields(name = %dto.name))]
pub async fn create_role(
    db: &PgPool,
    dto: CreateRoleDto,
    ctx: &RoleContext,
) -> Result<RoleWithPermissions, AppError> {
    let school_id = if ctx.is_global {
        dto.school_id
    } else {
        Some(ctx.effective_school_id(dto.school_id)?)
    };

    // A tenant-null role created by a global operator is a system role.
    let is_system_role = ctx.is_global && school_id.is_none();

    let role: Role = sqlx::query_as(&format!(
        r#"INSERT INTO roles (name, description, school_id, is_system_role)
        VALUES ($1, $2, $3, $4)
        RETURNING {ROLE_COLUMNS}"#
    ))
    .bind(&dto.name)
    .bind(&dto.description)
    .bind(school_id)
    .bind(is_system_role)
    .fetch_one(db)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::conflict(anyhow!("A role with this name already exists in this scope"))
        }
        _ => AppError::from(e),
    })?;

    let permissions = if let Some(permission_ids) = dto.permission_ids {
        grant_permissions(db, role.id, &permission_ids).await?
    } else {
        vec![]
    };

    Ok(RoleWithPermissions { role, permissions })
}

#[instrument(skip(db))]
pub async fn get_roles(
    db: &PgPool,
    params: RoleFilterParams,
    ctx: &RoleContext,
) -> Result<PaginatedRolesResponse, AppError> {
    let limit = params.pagination.limit();
    let offset = params.pagination.offset();

    let mut query = QueryBuilder::new(format!(
        "SELECT {ROLE_COLUMNS} FROM roles WHERE deleted_at IS NULL"
    ));
    let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM roles WHERE deleted_at IS NULL");

    for qb in [&mut query, &mut count_query] {
        if ctx.is_global {
            if let Some(school_id) = params.school_id {
                qb.push(" AND school_id = ").push_bind(school_id);
            }
            if let Some(is_system) = params.is_system_role {
                qb.push(" AND is_system_role = ").push_bind(is_system);
            }
        } else {
            let own = ctx.effective_school_id(params.school_id)?;
            qb.push(" AND school_id = ").push_bind(own);
        }
    }

    query
        .push(" ORDER BY name LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let roles: Vec<Role> = query.build_query_as().fetch_all(db).await?;
    let total: i64 = count_query.build_query_scalar().fetch_one(db).await?;

    let mut data = Vec::with_capacity(roles.len());
    for role in roles {
        let permissions = get_role_permissions(db, role.id).await?;
        data.push(RoleWithPermissions { role, permissions });
    }

    let has_more = offset + (data.len() as i64) < total;
    Ok(PaginatedRolesResponse {
        data,
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
pub async fn get_role_by_id(
    db: &PgPool,
    id: Uuid,
    ctx: &RoleContext,
) -> Result<RoleWithPermissions, AppError> {
    let role: Role = sqlx::query_as(&format!(
        "SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1 AND deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::not_found(anyhow!("Role not found")))?;

    if !ctx.is_global {
        if role.school_id.is_none() {
            return Err(AppError::forbidden(
                "Tenant administrators cannot access global roles",
            ));
        }
        let own = ctx.effective_school_id(None)?;
        if role.school_id != Some(own) {
            return Err(AppError::forbidden(
                "You can only access roles from your school",
            ));
        }
    }

    let permissions = get_role_permissions(db, role.id).await?;
    Ok(RoleWithPermissions { role, permissions })
}

#[instrument(skip(db, dto))]
pub async fn update_role(
    db: &PgPool,
    id: Uuid,
    dto: UpdateRoleDto,
    ctx: &RoleContext,
) -> Result<RoleWithPermissions, AppError> {
    let existing = get_role_by_id(db, id, ctx).await?;

    let name = dto.name.unwrap_or(existing.role.name);
    let description = dto.description.or(existing.role.description);
    let is_active = dto.is_active.unwrap_or(existing.role.is_active);

    let role: Role = sqlx::query_as(&format!(
        r#"UPDATE roles SET name = $1, description = $2, is_active = $3, updated_at = NOW()
        WHERE id = $4
        RETURNING {ROLE_COLUMNS}"#
    ))
    .bind(&name)
    .bind(&description)
    .bind(is_active)
    .bind(id)
    .fetch_one(db)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::conflict(anyhow!("A role with this name already exists in this scope"))
        }
        _ => AppError::from(e),
    })?;

    let permissions = get_role_permissions(db, role.id).await?;
    Ok(RoleWithPermissions { role, permissions })
}

/// Soft-deletes a role. Existing memberships through it stop resolving,
/// so the deletion takes effect on the next request.
#[instrument(skip(db))]
pub async fn delete_role(db: &PgPool, id: Uuid, ctx: &RoleContext) -> Result<(), AppError> {
    let existing = get_role_by_id(db, id, ctx).await?;

    if existing.role.is_system_role {
        return Err(AppError::forbidden("System roles cannot be deleted"));
    }

    sqlx::query("UPDATE roles SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;

    Ok(())
}

// ============ Role permissions ============

#[instrument(skip(db))]
pub async fn get_role_permissions(db: &PgPool, role_id: Uuid) -> Result<Vec<Permission>, AppError> {
    let permissions = sqlx::query_as(
        r#"
        SELECT p.id, p.name, p.description, p.category, p.is_active, p.created_at, p.updated_at
        FROM permissions p
        INNER JOIN role_permissions rp ON p.id = rp.permission_id
        WHERE rp.role_id = $1
        ORDER BY p.category, p.name
        "#,
    )
    .bind(role_id)
    .fetch_all(db)
    .await?;

    Ok(permissions)
}

async fn grant_permissions(
    db: &PgPool,
    role_id: Uuid,
    permission_ids: &[Uuid],
) -> Result<Vec<Permission>, AppError> {
    let existing = get_permissions_by_ids(db, permission_ids).await?;
    if existing.len() != permission_ids.len() {
        return Err(AppError::bad_request(anyhow!(
            "One or more permission IDs are invalid"
        )));
    }

    for permission_id in permission_ids {
        sqlx::query(
            r#"INSERT INTO role_permissions (role_id, permission_id)
            VALUES ($1, $2)
            ON CONFLICT (role_id, permission_id) DO NOTHING"#,
        )
        .bind(role_id)
        .bind(permission_id)
        .execute(db)
        .await?;
    }

    get_role_permissions(db, role_id).await
}

#[instrument(skip(db))]
pub async fn assign_permissions_to_role(
    db: &PgPool,
    role_id: Uuid,
    dto: AssignPermissionsDto,
    ctx: &RoleContext,
) -> Result<RoleWithPermissions, AppError> {
    let role = get_role_by_id(db, role_id, ctx).await?;
    let permissions = grant_permissions(db, role_id, &dto.permission_ids).await?;

    Ok(RoleWithPermissions {
        role: role.role,
        permissions,
    })
}

#[instrument(skip(db))]
pub async fn remove_permission_from_role(
    db: &PgPool,
    role_id: Uuid,
    permission_id: Uuid,
    ctx: &RoleContext,
) -> Result<RoleWithPermissions, AppError> {
    let role = get_role_by_id(db, role_id, ctx).await?;

    sqlx::query("DELETE FROM role_permissions WHERE role_id = $1 AND permission_id = $2")
        .bind(role_id)
        .bind(permission_id)
        .execute(db)
        .await?;

    let permissions = get_role_permissions(db, role_id).await?;
    Ok(RoleWithPermissions {
        role: role.role,
        permissions,
    })
}

// ============ Memberships ============

/// Invites an existing user into a school with a role.
///
/// The membership is created active but not validated; it starts resolving
/// once the user accepts. The notification email is best-effort.
#[instrument(skip(db, email_config, dto), fields(email = %dto.email))]
pub async fn invite_user(
    db: &PgPool,
    email_config: EmailConfig,
    dto: InviteUserDto,
    ctx: &RoleContext,
) -> Result<SchoolMembership, AppError> {
    let school_id = ctx.effective_school_id(dto.school_id)?;

    let invitee: Option<(Uuid, String)> =
        sqlx::query_as("SELECT id, first_name FROM users WHERE email = $1")
            .bind(dto.email.to_lowercase())
            .fetch_optional(db)
            .await?;
    let (invitee_id, invitee_name) =
        invitee.ok_or_else(|| AppError::not_found(anyhow!("No user with this email")))?;

    // The role must belong to the target school; only global callers may
    // hand out global roles.
    let role = get_role_by_id(db, dto.role_id, ctx).await?;
    if let Some(role_school) = role.role.school_id {
        if role_school != school_id {
            return Err(AppError::bad_request(anyhow!(
                "Role does not belong to the target school"
            )));
        }
    } else if !ctx.is_global {
        return Err(AppError::forbidden(
            "Tenant administrators cannot assign global roles",
        ));
    }

    let membership: SchoolMembership = sqlx::query_as(&format!(
        r#"INSERT INTO user_school_roles (user_id, school_id, role_id, invited_by)
        VALUES ($1, $2, $3, $4)
        RETURNING {MEMBERSHIP_COLUMNS}"#
    ))
    .bind(invitee_id)
    .bind(school_id)
    .bind(dto.role_id)
    .bind(ctx.user_id)
    .fetch_one(db)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::conflict(anyhow!("User already has a role in this school"))
        }
        _ => AppError::from(e),
    })?;

    let school_name: String = sqlx::query_scalar("SELECT name FROM schools WHERE id = $1")
        .bind(school_id)
        .fetch_one(db)
        .await?;

    let to_email = dto.email.to_lowercase();
    let role_name = role.role.name.clone();
    tokio::spawn(async move {
        let mailer = EmailService::new(email_config);
        if let Err(e) = mailer
            .send_membership_invitation(&to_email, &invitee_name, &school_name, &role_name)
            .await
        {
            warn!(error = %e.error, to = %to_email, "Failed to send invitation email");
        }
    });

    Ok(membership)
}

/// Marks the caller's pending invitation for a school as accepted.
#[instrument(skip(db))]
pub async fn accept_invitation(
    db: &PgPool,
    user_id: Uuid,
    school_id: Uuid,
) -> Result<SchoolMembership, AppError> {
    sqlx::query_as(&format!(
        r#"UPDATE user_school_roles
        SET is_validated = TRUE, accepted_at = NOW()
        WHERE user_id = $1 AND school_id = $2 AND is_validated = FALSE
        RETURNING {MEMBERSHIP_COLUMNS}"#
    ))
    .bind(user_id)
    .bind(school_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::not_found(anyhow!("No pending invitation for this school")))
}

/// Deactivates a user's membership in a school. The row is kept for the
/// invitation audit trail.
#[instrument(skip(db))]
pub async fn revoke_membership(
    db: &PgPool,
    user_id: Uuid,
    school_id: Option<Uuid>,
    ctx: &RoleContext,
) -> Result<(), AppError> {
    let school_id = ctx.effective_school_id(school_id)?;

    let result = sqlx::query(
        "UPDATE user_school_roles SET is_active = FALSE WHERE user_id = $1 AND school_id = $2",
    )
    .bind(user_id)
    .bind(school_id)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found(anyhow!(
            "User has no membership in this school"
        )));
    }

    Ok(())
}

#[instrument(skip(db))]
pub async fn get_user_memberships(
    db: &PgPool,
    user_id: Uuid,
    ctx: &RoleContext,
) -> Result<Vec<SchoolMembership>, AppError> {
    let mut query = QueryBuilder::new(format!(
        "SELECT {MEMBERSHIP_COLUMNS} FROM user_school_roles WHERE user_id = "
    ));
    query.push_bind(user_id);

    if !ctx.is_global && ctx.user_id != user_id {
        let own = ctx.effective_school_id(None)?;
        query.push(" AND school_id = ").push_bind(own);
    }

    query.push(" ORDER BY created_at");

    let memberships = query.build_query_as().fetch_all(db).await?;
    Ok(memberships)
}
