use axum::{
    Router,
    routing::{get, put},
};

use crate::state::AppState;

use super::controller::{change_own_password, create_user, get_user, get_users, update_user};

pub fn init_users_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_users).post(create_user))
        .route("/me/password", put(change_own_password))
        .route("/{id}", get(get_user).put(update_user))
}
