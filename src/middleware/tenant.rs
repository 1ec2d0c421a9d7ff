//! Tenant-role resolution.
//!
//! After authentication, the caller's role within the active school is
//! looked up from `user_school_roles` and attached to the request as a
//! [`RoleContext`]. The permissions guard and the handlers both consume
//! this context; requests without a resolvable assignment simply carry no
//! context and fail at the first guarded route.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::state::AppState;
use crate::utils::errors::{AppError, AuthzError};

/// The caller's resolved role-in-school assignment for this request.
///
/// `school_id` is the active tenant from the access token (`None` for a
/// global operator session); `is_global` marks an assignment through a
/// tenant-null role, which applies across tenants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleContext {
    pub user_id: Uuid,
    pub school_id: Option<Uuid>,
    pub role_id: Uuid,
    pub is_global: bool,
}

impl RoleContext {
    /// Tenant-scoped callers may only touch rows of their own school.
    /// Global callers may name any school; `requested` wins when present.
    pub fn effective_school_id(&self, requested: Option<Uuid>) -> Result<Uuid, AppError> {
        if self.is_global {
            requested
                .or(self.school_id)
                .ok_or_else(|| AppError::bad_request(anyhow::anyhow!("school_id is required")))
        } else {
            let own = self
                .school_id
                .ok_or_else(|| AppError::forbidden("No active school for this session"))?;
            match requested {
                Some(school) if school != own => {
                    Err(AppError::forbidden("You can only access your own school"))
                }
                _ => Ok(own),
            }
        }
    }
}

impl<S> FromRequestParts<S> for RoleContext
where
    S: Send + Sync,
{
    type Rejection = AuthzError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RoleContext>()
            .cloned()
            .ok_or(AuthzError::IdentityUnresolved)
    }
}

#[derive(sqlx::FromRow)]
struct AssignmentRow {
    role_id: Uuid,
    is_global: bool,
}

/// Loads the caller's assignment for the given school.
///
/// A school-specific assignment wins over a global one. Only active,
/// validated memberships through live roles resolve; everything else is
/// treated as "no assignment".
#[instrument(skip(db))]
pub async fn load_assignment(
    db: &PgPool,
    user_id: Uuid,
    school_id: Option<Uuid>,
) -> Result<Option<RoleContext>, AppError> {
    let row: Option<AssignmentRow> = sqlx::query_as(
        r#"
        SELECT usr.role_id, (r.school_id IS NULL) AS is_global
        FROM user_school_roles usr
        INNER JOIN roles r ON r.id = usr.role_id
        WHERE usr.user_id = $1
          AND usr.is_active = TRUE
          AND usr.is_validated = TRUE
          AND r.is_active = TRUE
          AND r.deleted_at IS NULL
          AND (usr.school_id = $2 OR (usr.school_id IS NULL AND r.school_id IS NULL))
        ORDER BY usr.school_id NULLS LAST
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(school_id)
    .fetch_optional(db)
    .await?;

    Ok(row.map(|row| RoleContext {
        user_id,
        school_id,
        role_id: row.role_id,
        is_global: row.is_global,
    }))
}

/// Middleware that resolves and attaches the [`RoleContext`].
///
/// Unauthenticated requests and requests without an assignment pass
/// through untouched; guarded routes reject them downstream.
pub async fn resolve_role_context(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();

    if let Ok(auth_user) = AuthUser::from_request_parts(&mut parts, &state).await {
        let user_id = auth_user.user_id()?;
        match load_assignment(&state.db, user_id, auth_user.school_id()).await? {
            Some(ctx) => {
                parts.extensions.insert(ctx);
            }
            None => {
                debug!(user_id = %user_id, school_id = ?auth_user.school_id(), "No role assignment for caller");
            }
        }
    }

    let req = Request::from_parts(parts, body);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(school_id: Option<Uuid>, is_global: bool) -> RoleContext {
        RoleContext {
            user_id: Uuid::new_v4(),
            school_id,
            role_id: Uuid::new_v4(),
            is_global,
        }
    }

    #[test]
    fn scoped_caller_defaults_to_own_school() {
        let school = Uuid::new_v4();
        let ctx = ctx(Some(school), false);
        assert_eq!(ctx.effective_school_id(None).unwrap(), school);
        assert_eq!(ctx.effective_school_id(Some(school)).unwrap(), school);
    }

    #[test]
    fn scoped_caller_cannot_name_another_school() {
        let ctx = ctx(Some(Uuid::new_v4()), false);
        assert!(ctx.effective_school_id(Some(Uuid::new_v4())).is_err());
    }

    #[test]
    fn global_caller_may_name_any_school() {
        let requested = Uuid::new_v4();
        let ctx = ctx(None, true);
        assert_eq!(ctx.effective_school_id(Some(requested)).unwrap(), requested);
    }

    #[test]
    fn global_caller_without_school_must_name_one() {
        let ctx = ctx(None, true);
        assert!(ctx.effective_school_id(None).is_err());
    }
}
