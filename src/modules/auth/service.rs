use anyhow::anyhow;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::config::jwt::JwtConfig;
use crate::modules::users::service::get_user_by_id;
use crate::utils::errors::AppError;
use crate::utils::jwt::{create_access_token, create_refresh_token, verify_refresh_token};
use crate::utils::password::verify_password;

use super::model::{
    LoginRequest, LoginResponse, MembershipInfo, ProfileResponse, RefreshRequest, UserCredentials,
};

/// Pick the tenant a session acts in.
///
/// An explicit choice must be backed by a validated membership for that
/// school (or a global role). Without a choice: a global role wins, a
/// single membership is unambiguous, several require the caller to choose.
/// No memberships at all still logs in; every guarded route then rejects
/// with an authorization error.
#[instrument(skip(db))]
async fn resolve_login_school(
    db: &PgPool,
    user_id: Uuid,
    requested: Option<Uuid>,
) -> Result<Option<Uuid>, AppError> {
    let schools: Vec<Option<Uuid>> = sqlx::query_scalar(
        r#"
        SELECT usr.school_id
        FROM user_school_roles usr
        INNER JOIN roles r ON r.id = usr.role_id
        WHERE usr.user_id = $1
          AND usr.is_active = TRUE
          AND usr.is_validated = TRUE
          AND r.is_active = TRUE
          AND r.deleted_at IS NULL
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    let has_global = schools.iter().any(|s| s.is_none());

    match requested {
        Some(school) => {
            if has_global || schools.contains(&Some(school)) {
                Ok(Some(school))
            } else {
                Err(AppError::forbidden("You are not a member of this school"))
            }
        }
        None => {
            if has_global {
                Ok(None)
            } else {
                let mut members: Vec<Uuid> = schools.into_iter().flatten().collect();
                members.sort();
                members.dedup();
                match members.as_slice() {
                    [] => Ok(None),
                    [only] => Ok(Some(*only)),
                    _ => Err(AppError::bad_request(anyhow!(
                        "school_id is required: user belongs to multiple schools"
                    ))),
                }
            }
        }
    }
}

#[instrument(skip(db, dto, jwt_config), fields(email = %dto.email))]
pub async fn login(
    db: &PgPool,
    dto: LoginRequest,
    jwt_config: &JwtConfig,
) -> Result<LoginResponse, AppError> {
    let credentials: Option<UserCredentials> =
        sqlx::query_as("SELECT id, email, password FROM users WHERE email = $1")
            .bind(dto.email.to_lowercase())
            .fetch_optional(db)
            .await?;

    let credentials =
        credentials.ok_or_else(|| AppError::unauthorized("Invalid email or password"))?;

    if !verify_password(&dto.password, &credentials.password)? {
        return Err(AppError::unauthorized("Invalid email or password"));
    }

    let school_id = resolve_login_school(db, credentials.id, dto.school_id).await?;

    let access_token =
        create_access_token(credentials.id, &credentials.email, school_id, jwt_config)?;
    let refresh_token = create_refresh_token(credentials.id, school_id, jwt_config)?;
    let user = get_user_by_id(db, credentials.id).await?;

    Ok(LoginResponse {
        access_token,
        refresh_token,
        user,
        school_id,
    })
}

#[instrument(skip(db, dto, jwt_config))]
pub async fn refresh(
    db: &PgPool,
    dto: RefreshRequest,
    jwt_config: &JwtConfig,
) -> Result<LoginResponse, AppError> {
    let claims = verify_refresh_token(&dto.refresh_token, jwt_config)?;
    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::unauthorized("Invalid refresh token"))?;

    let user = get_user_by_id(db, user_id)
        .await
        .map_err(|_| AppError::unauthorized("Invalid refresh token"))?;

    // Re-check the membership: a revoked or invalidated assignment must
    // not be resurrected through a long-lived refresh token.
    let school_id = resolve_login_school(db, user_id, claims.school_id).await?;

    let access_token = create_access_token(user_id, &user.email, school_id, jwt_config)?;
    let refresh_token = create_refresh_token(user_id, school_id, jwt_config)?;

    Ok(LoginResponse {
        access_token,
        refresh_token,
        user,
        school_id,
    })
}

#[instrument(skip(db))]
pub async fn profile(
    db: &PgPool,
    user_id: Uuid,
    active_school_id: Option<Uuid>,
) -> Result<ProfileResponse, AppError> {
    let user = get_user_by_id(db, user_id).await?;

    let memberships: Vec<MembershipInfo> = sqlx::query_as(
        r#"
        SELECT usr.school_id, s.name AS school_name, usr.role_id, r.name AS role_name,
               usr.is_active, usr.is_validated
        FROM user_school_roles usr
        INNER JOIN roles r ON r.id = usr.role_id
        LEFT JOIN schools s ON s.id = usr.school_id
        WHERE usr.user_id = $1
        ORDER BY s.name NULLS FIRST
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    Ok(ProfileResponse {
        user,
        active_school_id,
        memberships,
    })
}
