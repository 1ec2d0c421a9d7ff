//! # Schoolyard API
//!
//! A multi-tenant school administration backend built with Axum and
//! PostgreSQL. Schools are the tenant unit; users gain capabilities through
//! role assignments scoped to a school, and every protected route declares
//! the permission names it requires.
//!
//! ## Architecture
//!
//! ```text
//! src/
//! ├── bin/              # Operator CLI (migrate, seed, create-sysadmin)
//! ├── cli/              # CLI command implementations
//! ├── config/           # Environment-driven configuration
//! ├── middleware/       # Authentication, tenant resolution, the guard
//! ├── modules/          # Feature modules
//! │   ├── auth/        # Login, refresh, profile
//! │   ├── schools/     # Tenant management
//! │   ├── users/       # User management
//! │   ├── roles/       # Roles, permission catalog, memberships
//! │   ├── students/    # Student records
//! │   └── parents/     # Parent records and student links
//! └── utils/           # Errors, JWT, password hashing, pagination, email
//! ```
//!
//! Each feature module follows the same structure: `model.rs` (entities and
//! DTOs), `service.rs` (business logic), `controller.rs` (HTTP handlers),
//! `router.rs` (route registration).
//!
//! ## Authorization
//!
//! Requests pass three stages:
//!
//! 1. [`middleware::auth::AuthUser`] validates the bearer JWT.
//! 2. [`middleware::tenant::resolve_role_context`] loads the caller's
//!    role-in-school assignment for the token's active school and attaches
//!    a [`middleware::tenant::RoleContext`].
//! 3. [`middleware::permissions::PermissionsGuard`] checks the permissions
//!    a route declares against the role's granted set. Routes declare
//!    requirements through per-route extractors or subtree layers; the
//!    granted set is loaded through a [`middleware::permissions::PermissionStore`].
//!
//! Roles are either scoped to one school or global (`school_id` null);
//! global roles apply across tenants. Both denial reasons map to HTTP 403
//! without naming the missing permissions; the full required and granted
//! sets are logged server-side.

pub mod cli;
pub mod config;
pub mod docs;
pub mod logging;
pub mod middleware;
pub mod modules;
pub mod permissions;
pub mod router;
pub mod state;
pub mod utils;
pub mod validator;
