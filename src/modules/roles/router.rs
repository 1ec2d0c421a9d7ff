use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::state::AppState;

use super::controller::{
    accept_invitation, assign_permissions, create_role, delete_role, get_permission_by_id,
    get_permissions, get_role_by_id, get_roles, get_user_memberships, invite_user,
    remove_permission, revoke_membership, update_role,
};

pub fn init_roles_router() -> Router<AppState> {
    Router::new()
        // Permission catalog
        .route("/permissions", get(get_permissions))
        .route("/permissions/{id}", get(get_permission_by_id))
        // Roles
        .route("/", post(create_role).get(get_roles))
        .route(
            "/{id}",
            get(get_role_by_id).put(update_role).delete(delete_role),
        )
        // Role permission management
        .route("/{id}/permissions", post(assign_permissions))
        .route(
            "/{id}/permissions/{permission_id}",
            delete(remove_permission),
        )
}

pub fn init_memberships_router() -> Router<AppState> {
    Router::new()
        .route("/", post(invite_user))
        .route("/accept", post(accept_invitation))
        .route("/{user_id}", delete(revoke_membership))
}

pub fn init_user_memberships_router() -> Router<AppState> {
    Router::new().route("/", get(get_user_memberships))
}
