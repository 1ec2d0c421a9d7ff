//! Operator commands: schema migration, catalog seeding, system
//! administrator creation, and demo data generation.

pub mod demo;

use anyhow::{Context, Result, anyhow};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::permissions;
use crate::utils::password::hash_password;

/// Well-known id of the seeded global operator role. Must match the
/// system-roles migration.
pub const SYSTEM_ADMIN_ROLE_ID: Uuid = Uuid::from_u128(0x00000000_0000_0000_0000_000000000001);

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to run migrations")?;
    info!("Migrations applied");
    Ok(())
}

/// Re-asserts the permission catalog and the system role grants.
///
/// Idempotent: existing rows keep their ids, descriptions are refreshed,
/// and the system administrator role ends up granted every catalog entry.
pub async fn seed_catalog(pool: &PgPool) -> Result<()> {
    for (name, description, category) in permissions::CATALOG {
        sqlx::query(
            r#"INSERT INTO permissions (name, description, category)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO UPDATE
            SET description = EXCLUDED.description, category = EXCLUDED.category"#,
        )
        .bind(name)
        .bind(description)
        .bind(category)
        .execute(pool)
        .await?;
    }

    sqlx::query(
        r#"INSERT INTO role_permissions (role_id, permission_id)
        SELECT $1, p.id FROM permissions p
        ON CONFLICT (role_id, permission_id) DO NOTHING"#,
    )
    .bind(SYSTEM_ADMIN_ROLE_ID)
    .execute(pool)
    .await?;

    info!(count = permissions::CATALOG.len(), "Permission catalog seeded");
    Ok(())
}

/// Creates a user holding the global system administrator role.
pub async fn create_system_admin(
    pool: &PgPool,
    first_name: &str,
    last_name: &str,
    email: &str,
    password: &str,
) -> Result<Uuid> {
    let hashed = hash_password(password).map_err(|e| anyhow!(e.error))?;

    let user_id: Uuid = sqlx::query_scalar(
        r#"INSERT INTO users (first_name, last_name, email, password)
        VALUES ($1, $2, $3, $4)
        RETURNING id"#,
    )
    .bind(first_name)
    .bind(last_name)
    .bind(email.to_lowercase())
    .bind(&hashed)
    .fetch_one(pool)
    .await
    .context("Failed to create user (email may already exist)")?;

    // Global assignment: school NULL, pre-validated.
    sqlx::query(
        r#"INSERT INTO user_school_roles (user_id, school_id, role_id, is_validated, accepted_at)
        VALUES ($1, NULL, $2, TRUE, NOW())"#,
    )
    .bind(user_id)
    .bind(SYSTEM_ADMIN_ROLE_ID)
    .execute(pool)
    .await
    .context("Failed to assign system administrator role")?;

    info!(user_id = %user_id, email = %email, "System administrator created");
    Ok(user_id)
}
