//! Permission-gated request authorization.
//!
//! Routes declare the permission names they require; the guard decides per
//! request whether the caller's role-in-school assignment covers them.
//! Three pieces cooperate:
//!
//! 1. [`PermissionStore`]: the data-access capability "load the granted
//!    permission names for role id X", injected at construction time.
//! 2. [`PermissionsGuard`]: the check itself. An empty requirement passes,
//!    a missing [`RoleContext`] is `IdentityUnresolved`, an uncovered
//!    requirement is `InsufficientPermissions`.
//! 3. Route wiring: either the [`require_permissions`] layer closure on a
//!    router subtree, or a [`require_permission!`]-generated extractor on an
//!    individual handler.
//!
//! The check is read-only and evaluated independently per request; a store
//! failure propagates as a request-level error and is never folded into a
//! permission denial.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use sqlx::PgPool;
use tracing::{error, warn};
use uuid::Uuid;

use crate::middleware::tenant::RoleContext;
use crate::state::AppState;
use crate::utils::errors::AuthzError;

/// Data access needed by the guard: the granted permission names for one
/// role. Implementations decide what "granted" means; the Postgres store
/// only grants through live roles and active permissions.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    async fn permissions_for_role(&self, role_id: Uuid) -> anyhow::Result<HashSet<String>>;
}

/// Store backed by the `role_permissions` join table.
pub struct PgPermissionStore {
    pool: PgPool,
}

impl PgPermissionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionStore for PgPermissionStore {
    async fn permissions_for_role(&self, role_id: Uuid) -> anyhow::Result<HashSet<String>> {
        // Inactive and soft-deleted roles resolve to an empty grant set,
        // so they fail closed at the subset check.
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT p.name
            FROM permissions p
            INNER JOIN role_permissions rp ON rp.permission_id = p.id
            INNER JOIN roles r ON r.id = rp.role_id
            WHERE rp.role_id = $1
              AND p.is_active = TRUE
              AND r.is_active = TRUE
              AND r.deleted_at IS NULL
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(names.into_iter().collect())
    }
}

/// Failure modes of a guarded route.
///
/// Denials surface as 403 with a fixed message; store failures surface as
/// 500 so transient data-access problems are never mistaken for permission
/// failures.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error(transparent)]
    Denied(#[from] AuthzError),
    #[error("permission lookup failed")]
    Store(anyhow::Error),
}

impl IntoResponse for GuardError {
    fn into_response(self) -> Response {
        match self {
            GuardError::Denied(err) => err.into_response(),
            GuardError::Store(err) => {
                error!(error = %err, "Permission lookup failed");
                let body = Json(json!({ "error": "permission lookup failed" }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

/// The authorization check, constructed once at startup with its store.
#[derive(Clone)]
pub struct PermissionsGuard {
    store: Arc<dyn PermissionStore>,
}

impl std::fmt::Debug for PermissionsGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionsGuard").finish_non_exhaustive()
    }
}

impl PermissionsGuard {
    pub fn new(store: Arc<dyn PermissionStore>) -> Self {
        Self { store }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self::new(Arc::new(PgPermissionStore::new(pool)))
    }

    /// Decide whether a caller with `ctx` may proceed to a route requiring
    /// `required`.
    ///
    /// Read-only and deterministic for a given role/permission state. Both
    /// denial reasons are logged with the full required and granted sets;
    /// the response bodies never name them.
    pub async fn check(
        &self,
        required: &[&str],
        ctx: Option<&RoleContext>,
    ) -> Result<(), GuardError> {
        if required.is_empty() {
            return Ok(());
        }

        let Some(ctx) = ctx else {
            warn!(required = ?required, "Denied: no role assignment attached to request");
            return Err(AuthzError::IdentityUnresolved.into());
        };

        let granted = self
            .store
            .permissions_for_role(ctx.role_id)
            .await
            .map_err(GuardError::Store)?;

        if required.iter().all(|p| granted.contains(*p)) {
            Ok(())
        } else {
            warn!(
                user_id = %ctx.user_id,
                role_id = %ctx.role_id,
                school_id = ?ctx.school_id,
                required = ?required,
                granted = ?granted,
                "Denied: role does not cover required permissions"
            );
            Err(AuthzError::InsufficientPermissions.into())
        }
    }

    /// Run the check against a request's attached [`RoleContext`] and
    /// continue into `next` on success.
    pub async fn check_request(
        &self,
        req: Request,
        next: Next,
        required: &'static [&'static str],
    ) -> Result<Response, GuardError> {
        let ctx = req.extensions().get::<RoleContext>().cloned();
        self.check(required, ctx.as_ref()).await?;
        Ok(next.run(req).await)
    }
}

/// Subtree-level guard for use with `middleware::from_fn_with_state`:
///
/// ```rust,ignore
/// router.route_layer(middleware::from_fn_with_state(
///     state.clone(),
///     |state, req, next| require_permissions(state, req, next, &[permissions::ROLES_READ]),
/// ))
/// ```
pub async fn require_permissions(
    State(state): State<AppState>,
    req: Request,
    next: Next,
    required: &'static [&'static str],
) -> Result<Response, GuardError> {
    state.guard.check_request(req, next, required).await
}

/// Generates a handler-level extractor that enforces one or more
/// permissions. Handlers declare their requirement by taking the generated
/// type as an argument:
///
/// ```rust,ignore
/// pub async fn create_school(
///     _guard: RequireSchoolsCreate,
///     ctx: RoleContext,
///     ...
/// ) -> Result<Json<School>, AppError> { ... }
/// ```
#[macro_export]
macro_rules! require_permission {
    ($name:ident, $($permission:expr),+ $(,)?) => {
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl axum::extract::FromRequestParts<$crate::state::AppState> for $name {
            type Rejection = $crate::middleware::permissions::GuardError;

            async fn from_request_parts(
                parts: &mut axum::http::request::Parts,
                state: &$crate::state::AppState,
            ) -> Result<Self, Self::Rejection> {
                let ctx = parts
                    .extensions
                    .get::<$crate::middleware::tenant::RoleContext>()
                    .cloned();
                state.guard.check(&[$($permission),+], ctx.as_ref()).await?;
                Ok($name)
            }
        }
    };
}

// Handler-level extractors for the seeded catalog.

require_permission!(RequireSchoolsCreate, crate::permissions::SCHOOLS_CREATE);
require_permission!(RequireSchoolsRead, crate::permissions::SCHOOLS_READ);
require_permission!(RequireSchoolsUpdate, crate::permissions::SCHOOLS_UPDATE);
require_permission!(RequireSchoolsDelete, crate::permissions::SCHOOLS_DELETE);

require_permission!(RequireUsersCreate, crate::permissions::USERS_CREATE);
require_permission!(RequireUsersRead, crate::permissions::USERS_READ);
require_permission!(RequireUsersUpdate, crate::permissions::USERS_UPDATE);

require_permission!(RequireRolesCreate, crate::permissions::ROLES_CREATE);
require_permission!(RequireRolesUpdate, crate::permissions::ROLES_UPDATE);
require_permission!(RequireRolesDelete, crate::permissions::ROLES_DELETE);
require_permission!(RequireRolesAssign, crate::permissions::ROLES_ASSIGN);

require_permission!(RequireStudentsCreate, crate::permissions::STUDENTS_CREATE);
require_permission!(RequireStudentsRead, crate::permissions::STUDENTS_READ);
require_permission!(RequireStudentsUpdate, crate::permissions::STUDENTS_UPDATE);
require_permission!(RequireStudentsDelete, crate::permissions::STUDENTS_DELETE);

require_permission!(RequireParentsCreate, crate::permissions::PARENTS_CREATE);
require_permission!(RequireParentsRead, crate::permissions::PARENTS_READ);
require_permission!(RequireParentsUpdate, crate::permissions::PARENTS_UPDATE);
require_permission!(RequireParentsDelete, crate::permissions::PARENTS_DELETE);
require_permission!(RequireParentsLink, crate::permissions::PARENTS_LINK);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapStore {
        grants: HashMap<Uuid, HashSet<String>>,
    }

    #[async_trait]
    impl PermissionStore for MapStore {
        async fn permissions_for_role(&self, role_id: Uuid) -> anyhow::Result<HashSet<String>> {
            Ok(self.grants.get(&role_id).cloned().unwrap_or_default())
        }
    }

    fn guard_with(role_id: Uuid, granted: &[&str]) -> PermissionsGuard {
        let mut grants = HashMap::new();
        grants.insert(role_id, granted.iter().map(|s| s.to_string()).collect());
        PermissionsGuard::new(Arc::new(MapStore { grants }))
    }

    fn ctx(role_id: Uuid) -> RoleContext {
        RoleContext {
            user_id: Uuid::new_v4(),
            school_id: Some(Uuid::new_v4()),
            role_id,
            is_global: false,
        }
    }

    #[tokio::test]
    async fn empty_requirement_passes_without_context() {
        let guard = guard_with(Uuid::new_v4(), &[]);
        assert!(guard.check(&[], None).await.is_ok());
    }

    #[tokio::test]
    async fn missing_context_is_identity_unresolved() {
        let guard = guard_with(Uuid::new_v4(), &["grades.view"]);
        let err = guard.check(&["grades.view"], None).await.unwrap_err();
        assert!(matches!(
            err,
            GuardError::Denied(AuthzError::IdentityUnresolved)
        ));
    }

    #[tokio::test]
    async fn subset_of_grants_passes() {
        let role = Uuid::new_v4();
        let guard = guard_with(role, &["grades.view", "grades.edit"]);
        assert!(guard.check(&["grades.edit"], Some(&ctx(role))).await.is_ok());
    }

    #[tokio::test]
    async fn uncovered_requirement_is_insufficient() {
        let role = Uuid::new_v4();
        let guard = guard_with(role, &["grades.view", "grades.edit"]);
        let err = guard
            .check(&["grades.delete"], Some(&ctx(role)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GuardError::Denied(AuthzError::InsufficientPermissions)
        ));
    }

    #[tokio::test]
    async fn store_failure_is_not_a_denial() {
        struct FailingStore;

        #[async_trait]
        impl PermissionStore for FailingStore {
            async fn permissions_for_role(&self, _: Uuid) -> anyhow::Result<HashSet<String>> {
                Err(anyhow::anyhow!("connection reset"))
            }
        }

        let guard = PermissionsGuard::new(Arc::new(FailingStore));
        let err = guard
            .check(&["grades.view"], Some(&ctx(Uuid::new_v4())))
            .await
            .unwrap_err();
        assert!(matches!(err, GuardError::Store(_)));
    }
}
