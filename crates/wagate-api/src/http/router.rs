//! Axum router configuration with middleware.
//!
//! Single-session routes live under `/api/whatsapp` (implicit default
//! instance); multi-session routes under `/api/instances`.
//! Middleware: CORS, request tracing.

use axum::Router;
use axum::routing::{delete, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let whatsapp_routes = Router::new()
        .route("/connect", post(handlers::session::connect))
        .route("/connect-retry", post(handlers::session::connect_retry))
        .route("/disconnect", post(handlers::session::disconnect))
        .route("/clear-session", post(handlers::session::clear_session))
        .route("/restart", post(handlers::session::restart))
        .route("/qr", get(handlers::session::get_qr))
        .route("/status", get(handlers::session::get_status))
        .route("/send-message", post(handlers::session::send_message))
        .route("/webhook", post(handlers::session::set_webhook))
        .route("/test-webhook", post(handlers::session::test_webhook));

    let instance_routes = Router::new()
        .route(
            "/",
            post(handlers::instance::create_instance).get(handlers::instance::list_instances),
        )
        .route("/{id}/connect", post(handlers::instance::connect))
        .route("/{id}/disconnect", post(handlers::instance::disconnect))
        .route("/{id}/clear-session", post(handlers::instance::clear_session))
        .route("/{id}/restart", post(handlers::instance::restart))
        .route("/{id}/status", get(handlers::instance::get_status))
        .route("/{id}/qr", get(handlers::instance::get_qr))
        .route("/{id}/send-message", post(handlers::instance::send_message))
        .route("/{id}/webhook", post(handlers::instance::set_webhook))
        .route("/{id}", delete(handlers::instance::remove_instance));

    Router::new()
        .nest("/api/whatsapp", whatsapp_routes)
        .nest("/api/instances", instance_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
