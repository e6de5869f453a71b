//! ContentForge HTTP API
//!
//! Thin axum handlers over `contentforge-core`: generation requests go out
//! to the configured provider, gallery requests go to the generation store.

pub mod api;
pub mod state;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use state::AppState;

/// Build the full router
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/generate-text", post(api::generate::generate_text))
        .route("/api/generate-image", post(api::generate::generate_image))
        .route(
            "/api/generations",
            get(api::generations::list_generations).post(api::generations::create_generation),
        )
        .route(
            "/api/generations/{id}",
            get(api::generations::get_generation).delete(api::generations::delete_generation),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth::require_user,
        ));

    let public = Router::new()
        .route("/health", get(api::health))
        .route("/api/templates", get(api::templates))
        .route("/api/auth/sign-in", post(api::auth::sign_in))
        .route("/api/auth/sign-up", post(api::auth::sign_up))
        .route("/api/auth/refresh", post(api::auth::refresh))
        .route("/api/auth/sign-out", post(api::auth::sign_out));

    let body_limit = state.body_limit;
    public
        .merge(protected)
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until ctrl-c
pub async fn serve(addr: &str, state: AppState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "ContentForge server listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
