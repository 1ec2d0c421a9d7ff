//! The guard exercised through a real router: route-attached requirement
//! lists, pass-through for unguarded routes, and response bodies that never
//! name the missing permissions.

mod common;

use std::sync::Arc;

use axum::{
    Router,
    extract::Request,
    http::{Request as HttpRequest, StatusCode},
    middleware::{self, Next},
    routing::get,
};
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;

use common::{InMemoryStore, role_context};
use schoolyard::middleware::permissions::PermissionsGuard;
use schoolyard::middleware::tenant::RoleContext;

const EDIT_GRADES: &[&str] = &["grades.edit"];

/// Two routes behind one guard instance: `/grades` requires `grades.edit`,
/// `/ping` requires nothing. `ctx` simulates what the tenant middleware
/// attaches for an authenticated caller.
fn test_app(guard: PermissionsGuard, ctx: Option<RoleContext>) -> Router {
    let g = guard.clone();
    Router::new()
        .route("/grades", get(|| async { "graded" }))
        .route_layer(middleware::from_fn(move |req: Request, next: Next| {
            let g = g.clone();
            async move { g.check_request(req, next, EDIT_GRADES).await }
        }))
        .route("/ping", get(|| async { "pong" }))
        .layer(middleware::from_fn(move |mut req: Request, next: Next| {
            let ctx = ctx.clone();
            async move {
                if let Some(ctx) = ctx {
                    req.extensions_mut().insert(ctx);
                }
                next.run(req).await
            }
        }))
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn unguarded_route_passes_without_context() {
    let guard = PermissionsGuard::new(Arc::new(InMemoryStore::new()));
    let app = test_app(guard, None);

    let response = app
        .oneshot(HttpRequest::get("/ping").body(axum::body::Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn guarded_route_passes_with_covering_grant() {
    let store = Arc::new(InMemoryStore::new());
    let role_id = Uuid::new_v4();
    store.grant(role_id, &["grades.view", "grades.edit"]);
    let guard = PermissionsGuard::new(store);

    let ctx = role_context(Uuid::new_v4(), Some(Uuid::new_v4()), role_id);
    let app = test_app(guard, Some(ctx));

    let response = app
        .oneshot(HttpRequest::get("/grades").body(axum::body::Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn guarded_route_rejects_missing_context_as_unresolved() {
    let guard = PermissionsGuard::new(Arc::new(InMemoryStore::new()));
    let app = test_app(guard, None);

    let response = app
        .oneshot(HttpRequest::get("/grades").body(axum::body::Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_text(response).await;
    assert!(body.contains("caller identity unresolved"));
}

#[tokio::test]
async fn guarded_route_rejects_uncovered_grant_without_leaking_names() {
    let store = Arc::new(InMemoryStore::new());
    let role_id = Uuid::new_v4();
    store.grant(role_id, &["grades.view"]);
    let guard = PermissionsGuard::new(store);

    let ctx = role_context(Uuid::new_v4(), Some(Uuid::new_v4()), role_id);
    let app = test_app(guard, Some(ctx));

    let response = app
        .oneshot(HttpRequest::get("/grades").body(axum::body::Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_text(response).await;
    assert!(body.contains("insufficient permissions"));
    // The response must not reveal which permission was missing.
    assert!(!body.contains("grades.edit"));
    assert!(!body.contains("grades.view"));
}

#[tokio::test]
async fn store_failure_surfaces_as_server_error_not_denial() {
    use async_trait::async_trait;
    use schoolyard::middleware::permissions::PermissionStore;
    use std::collections::HashSet;

    struct FailingStore;

    #[async_trait]
    impl PermissionStore for FailingStore {
        async fn permissions_for_role(&self, _: Uuid) -> anyhow::Result<HashSet<String>> {
            Err(anyhow::anyhow!("timeout"))
        }
    }

    let guard = PermissionsGuard::new(Arc::new(FailingStore));
    let ctx = role_context(Uuid::new_v4(), Some(Uuid::new_v4()), Uuid::new_v4());
    let app = test_app(guard, Some(ctx));

    let response = app
        .oneshot(HttpRequest::get("/grades").body(axum::body::Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
