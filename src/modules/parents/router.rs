use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::state::AppState;

use super::controller::{
    create_parent, delete_parent, get_parent, get_parents, link_student, unlink_student,
    update_parent,
};

pub fn init_parents_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_parents).post(create_parent))
        .route(
            "/{id}",
            get(get_parent).put(update_parent).delete(delete_parent),
        )
        .route("/{id}/students", post(link_student))
        .route("/{id}/students/{student_id}", delete(unlink_student))
}
