use axum::extract::{Request, State};
use axum::http::{HeaderValue, Method};
use axum::middleware::Next;
use axum::{Router, middleware};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable as _};
use utoipa_swagger_ui::SwaggerUi;

use crate::docs::ApiDoc;
use crate::logging::logging_middleware;
use crate::middleware::permissions::require_permissions;
use crate::middleware::tenant::resolve_role_context;
use crate::modules::auth::router::init_auth_router;
use crate::modules::parents::router::init_parents_router;
use crate::modules::roles::router::{
    init_memberships_router, init_roles_router, init_user_memberships_router,
};
use crate::modules::schools::router::init_schools_router;
use crate::modules::students::router::init_students_router;
use crate::modules::users::router::init_users_router;
use crate::permissions;
use crate::state::AppState;

pub fn init_router(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()))
        .nest(
            "/api",
            Router::new()
                .nest(
                    "/auth",
                    init_auth_router().layer(state.rate_limit_config.auth_layer()),
                )
                .nest("/users", init_users_router())
                .nest("/users/{id}/memberships", init_user_memberships_router())
                .nest("/schools", init_schools_router())
                .nest(
                    "/roles",
                    // Everything under /roles presumes catalog read access;
                    // mutations add their own permission on the handler.
                    init_roles_router().route_layer(middleware::from_fn_with_state(
                        state.clone(),
                        |state: State<AppState>, req: Request, next: Next| {
                            require_permissions(state, req, next, &[permissions::ROLES_READ])
                        },
                    )),
                )
                .nest("/memberships", init_memberships_router())
                .nest("/students", init_students_router())
                .nest("/parents", init_parents_router())
                // Attach the caller's role-in-school assignment before any
                // guard runs.
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    resolve_role_context,
                )),
        )
        .with_state(state.clone())
        .layer({
            let allowed_origins: Vec<HeaderValue> = state
                .cors_config
                .allowed_origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(allowed_origins)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::ACCEPT,
                ])
                .allow_credentials(true)
        })
        .layer(middleware::from_fn(logging_middleware))
}
