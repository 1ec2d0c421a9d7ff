use std::net::SocketAddr;

use dotenvy::dotenv;
use tracing::info;

use schoolyard::logging::init_tracing;
use schoolyard::router::init_router;
use schoolyard::state::init_app_state;

#[tokio::main]
async fn main() {
    dotenv().ok();

    let _log_guards = init_tracing();

    let state = init_app_state().await;
    let app = init_router(state.clone()).layer(state.rate_limit_config.general_layer());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .expect("Failed to bind listener");
    info!("Server running on http://localhost:{port}");
    info!("Swagger UI available at http://localhost:{port}/swagger-ui");
    info!("Scalar UI available at http://localhost:{port}/scalar");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}
